//! External site integration.

pub mod forexfactory;

pub use forexfactory::*;
