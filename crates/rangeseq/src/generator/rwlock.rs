#[cfg(not(feature = "parking-lot"))]
pub(crate) use std::sync::{PoisonError, RwLock};

#[cfg(feature = "parking-lot")]
pub(crate) use parking_lot::RwLock;
