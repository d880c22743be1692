//! Starships reachable from a person through `people_starships`.

use crate::db::{Database, DbResult, ScannedRow};
use crate::model::person::PersonId;
use crate::model::starship::Starship;
use crate::repo::{collect_rows, RepoResult};
use rusqlite::types::Value;

const STARSHIPS_BY_PERSON_SQL: &str = "SELECT
    s.id,
    s.name,
    s.model,
    s.manufacturer,
    s.cost_in_credits,
    s.length,
    s.max_atmosphering_speed,
    s.crew,
    s.passengers,
    s.cargo_capacity,
    s.consumables,
    s.hyperdrive_rating,
    s.mglt,
    s.starship_class,
    s.created,
    s.edited,
    s.url
FROM people_starships ps
    INNER JOIN starships s ON ps.starships = s.id
WHERE ps.people = ?1;";

/// Read-only access to the starships associated with people.
pub struct StarshipRepository<'db> {
    db: &'db dyn Database,
}

impl<'db> StarshipRepository<'db> {
    pub fn new(db: &'db dyn Database) -> Self {
        Self { db }
    }

    /// Returns every starship linked to `person_id` in join order.
    pub fn all_by_person_id(&self, person_id: PersonId) -> RepoResult<Vec<Starship>> {
        collect_rows(
            self.db,
            STARSHIPS_BY_PERSON_SQL,
            &[Value::Integer(person_id)],
            parse_starship_row,
        )
    }
}

fn parse_starship_row(row: &ScannedRow) -> DbResult<Starship> {
    Ok(Starship {
        id: row.get(0)?,
        name: row.get(1)?,
        model: row.get(2)?,
        manufacturer: row.get(3)?,
        cost_in_credits: row.get(4)?,
        length: row.get(5)?,
        max_atmosphering_speed: row.get(6)?,
        crew: row.get(7)?,
        passengers: row.get(8)?,
        cargo_capacity: row.get(9)?,
        consumables: row.get(10)?,
        hyperdrive_rating: row.get(11)?,
        mglt: row.get(12)?,
        starship_class: row.get(13)?,
        pilots: String::new(),
        films: String::new(),
        created: row.get(14)?,
        edited: row.get(15)?,
        url: row.get(16)?,
    })
}
