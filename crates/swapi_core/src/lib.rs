//! Data-access core for the people API.
//! Assembles people with their vehicles and starships, allocates identifiers
//! and shapes every outcome into a response envelope.

pub mod db;
pub mod envelope;
pub mod logging;
pub mod model;
pub mod repo;

pub use db::{open_db, open_db_in_memory, Database, DbError, DbResult, SqliteDatabase};
pub use envelope::Envelope;
pub use logging::{
    default_log_level, init_console_logging, init_logging, logging_status, LogSink,
};
pub use model::person::{Person, PersonDraft, PersonId};
pub use model::starship::Starship;
pub use model::vehicle::Vehicle;
pub use repo::person_repo::{PersonRepository, SqlPersonRepository};
pub use repo::starship_repo::StarshipRepository;
pub use repo::vehicle_repo::VehicleRepository;
pub use repo::{RepoError, RepoResult};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
