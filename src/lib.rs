//! Training log service: turns training-plan days into workout sessions and
//! tracks their set-by-set progression.

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod services;

pub use error::TrainingLogError;
