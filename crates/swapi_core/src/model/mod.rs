//! Domain model for people and the craft associated with them.
//!
//! # Responsibility
//! - Define the wire and domain shapes shared by repositories and handlers.
//!
//! # Invariants
//! - A person's `vehicles`/`starships` are a derived view rebuilt on every
//!   fetch, never stored on the person row.
//! - Vehicles and starships are read-only from the core's point of view.

pub mod person;
pub mod starship;
pub mod vehicle;
