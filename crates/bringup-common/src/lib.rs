#![doc = "Common types shared across the RAM bring-up workspace."]

pub mod config;
pub mod error;

pub use config::*;
pub use error::*;
