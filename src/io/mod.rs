//! Input/output helpers.
//!
//! - dataset load/save (`store`)

pub mod store;

pub use store::*;
