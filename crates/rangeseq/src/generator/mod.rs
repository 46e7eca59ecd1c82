mod atomic;
mod interface;
mod lock;
mod rwlock;

pub use atomic::*;
pub use interface::*;
pub use lock::*;
