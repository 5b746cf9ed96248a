//! Common utilities shared by the CLI and the bootstrap stages

pub mod config;
pub mod error;
pub mod logging;
pub mod paths;

pub use error::{Error, Result};
