//! Route inbound requests to workflow bindings.
//!
//! Patterns come from configuration and are compiled once, at table build
//! time, into matchers anchored at both ends. Lookup walks the table in
//! declaration order and stops at the first hit, so earlier entries shadow
//! later ones.

pub mod error;
pub mod pattern;
pub mod table;

pub use {
    error::{Error, Result},
    pattern::RoutePattern,
    table::{RouteBinding, RouteTable},
};
