//! Command implementations

pub mod clone;
