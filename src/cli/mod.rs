//! Command line support for the `care-import` binary

pub mod commands;
pub mod error;
