//! # FCLab Common Library
//!
//! Shared code for the FCLab crowd-labeling services including:
//! - Database schema initialization and entity models
//! - Engine parameters (calibration and consensus tuning)
//! - Configuration loading and root folder resolution
//! - Species label helpers
//! - Utility functions

pub mod config;
pub mod db;
pub mod error;
pub mod labels;
pub mod params;
pub mod time;
pub mod uuid_utils;

pub use error::{Error, Result};
pub use params::EngineParams;
