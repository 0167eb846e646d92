//! Calendar page extraction.
//!
//! - field parsing rules (`fields`)
//! - the per-day row cursor with its structural/script fallback (`rows`)
//! - detail table expansion and serialization (`detail`)

pub mod detail;
pub mod fields;
pub mod rows;

pub use detail::*;
pub use fields::*;
pub use rows::*;
