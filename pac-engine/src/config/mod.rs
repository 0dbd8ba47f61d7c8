//! Configuration management for the PAC engine

pub mod loader;
pub mod schema;
pub mod validator;

pub use loader::ConfigLoader;
pub use schema::{Config, PacConfig, SandboxLimits};
pub use validator::ConfigValidator;
