#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg))]

mod assigner;
mod audit;
mod balancer;
mod client;
mod error;
mod generator;
mod range;
mod sequencer;

pub use crate::assigner::*;
pub use crate::audit::*;
pub use crate::balancer::*;
pub use crate::client::*;
pub use crate::error::*;
pub use crate::generator::*;
pub use crate::range::*;
pub use crate::sequencer::*;
