//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → NetguardConfig (validated, immutable)
//!     → scheduler::build_scheduler + Connection::configure_network_timeout
//! ```
//!
//! # Design Decisions
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - A timeout of 0 disables monitoring, matching the connection API

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::NetguardConfig;
pub use schema::ObservabilityConfig;
pub use schema::ProbeConfig;
pub use schema::SchedulerConfig;
pub use schema::SchedulerKind;
pub use schema::TimeoutConfig;
