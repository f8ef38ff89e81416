//! Template interpolation and its error type, shared across the patchbay
//! crates.

pub mod error;
pub mod interp;

pub use error::{Error, Result};
