//! Command line front end for the `landing` binary

pub mod commands;
pub mod error;
