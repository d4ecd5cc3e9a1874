//! Core data access for Personbook.
//! This crate owns the person model, the SQLite-backed store and the
//! person use-case service.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{load_dotenv, load_dotenv_from, AppConfig, ConfigError};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::person::{
    parse_person_id, NewPerson, Person, PersonId, PersonSummary, PersonValidationError,
};
pub use repo::person_repo::{
    DeleteSummary, PersonFilter, PersonQuery, PersonRepository, RepoError, RepoResult,
    SortOrder, SqlitePersonRepository,
};
pub use service::person_service::{
    sample_person, PersonService, AGE_TO_SET, FOOD_TO_ADD, FOOD_TO_SEARCH, NAME_TO_REMOVE,
    QUERY_CHAIN_LIMIT,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
