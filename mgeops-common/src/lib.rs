//! # MGEOps Common Library
//!
//! Shared code for the MGEOps services including:
//! - Steam identity parsing and variant expansion
//! - String/set similarity scoring
//! - Database models and schema bootstrap
//! - Configuration loading
//! - Arena name canonicalization and activity histograms

pub mod activity;
pub mod arena;
pub mod config;
#[cfg(feature = "sqlx")]
pub mod db;
pub mod error;
pub mod similarity;
pub mod steamid;

pub use error::{Error, Result};
pub use steamid::SteamId64;
