//! CLI command implementations for move-stamp.
//!
//! Each module corresponds to a subcommand (`move-stamp <command>`).

pub mod inspect;
pub mod plan;
pub mod stamp;
