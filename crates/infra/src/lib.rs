//! Infrastructure layer: storage backends, seeding, configuration.

pub mod config;
pub mod repository;
pub mod seed;


pub use config::{AppConfig, ConfigError, Environment};
pub use repository::InMemoryRepository;
pub use seed::{SeedError, SeedSummary, initialize_from_dir};
