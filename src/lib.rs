//! Gemini core: entity relations, set comparison and hierarchical feature
//! flags, with SQLite persistence and an HTTP admin API.

pub mod api;
pub mod compare;
pub mod config;
pub mod db;
pub mod error;
pub mod features;
pub mod models;
pub mod relation;

pub use error::{Error, Result};
