//! User-facing front ends.

pub mod cli;
