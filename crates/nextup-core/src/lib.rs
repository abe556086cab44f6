pub mod config;
pub mod engine;
pub mod error;
pub mod executor;
pub mod initializer;
pub mod io;
pub mod matcher;
pub mod missing;
pub mod paths;
pub mod repository;
pub mod resolver;
pub mod sonarr;
pub mod store;
pub mod types;
pub mod workflow;

pub use error::{NextupError, Result};
