//! Person domain model.
//!
//! # Invariants
//! - `id` is a positive integer allocated by the repository, never the client.
//! - `created` is fixed at insertion; `edited` moves on every update.

use super::starship::Starship;
use super::vehicle::Vehicle;
use serde::{Deserialize, Serialize};

/// Identifier of one person row.
pub type PersonId = i64;

/// Fully assembled person, including its associated collections.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Person {
    pub id: PersonId,
    pub name: String,
    pub height: i64,
    pub mass: i64,
    pub hair: String,
    pub skin: String,
    pub eye: String,
    pub birth_year: String,
    pub gender: String,
    /// Planet reference. Not checked against any planet table.
    pub homeworld: i64,
    /// Placeholder, never populated.
    pub films: String,
    /// Placeholder, never populated.
    pub species: String,
    pub vehicles: Vec<Vehicle>,
    pub starships: Vec<Starship>,
    /// ISO-8601 creation timestamp.
    #[serde(rename = "_created")]
    pub created: String,
    /// ISO-8601 last-edit timestamp.
    #[serde(rename = "_edited")]
    pub edited: String,
    pub url: String,
}

/// Client-supplied scalar fields accepted by create and update.
///
/// Missing keys fall back to empty/zero values. Keys the server owns
/// (`id`, `_created`, `_edited`) and the associated collections are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct PersonDraft {
    pub name: String,
    pub height: i64,
    pub mass: i64,
    pub hair: String,
    pub skin: String,
    pub eye: String,
    pub birth_year: String,
    pub gender: String,
    pub homeworld: i64,
    pub url: String,
}

impl PersonDraft {
    /// Creates a draft carrying only a name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}
