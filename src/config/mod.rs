//! Configuration system for kompass
//!
//! YAML configuration loaded from a platform-appropriate directory with
//! per-field defaults, plus environment variable overrides.

pub mod loader;
pub mod paths;
pub mod schema;

pub use loader::ConfigLoader;
pub use schema::Settings;
