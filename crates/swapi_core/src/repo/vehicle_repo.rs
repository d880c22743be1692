//! Vehicles reachable from a person through `people_vehicles`.
//!
//! # Invariants
//! - The full associated set is materialized; no limit, no pagination.
//! - Rows keep the join's natural order; no ORDER BY is applied.

use crate::db::{Database, DbResult, ScannedRow};
use crate::model::person::PersonId;
use crate::model::vehicle::Vehicle;
use crate::repo::{collect_rows, RepoResult};
use rusqlite::types::Value;

const VEHICLES_BY_PERSON_SQL: &str = "SELECT
    v.id,
    v.name,
    v.model,
    v.manufacturer,
    v.cost_in_credits,
    v.length,
    v.max_atmosphering_speed,
    v.crew,
    v.passengers,
    v.cargo_capacity,
    v.consumables,
    v.vehicle_class,
    v.created,
    v.edited,
    v.url
FROM people_vehicles pv
    INNER JOIN vehicles v ON pv.vehicles = v.id
WHERE pv.people = ?1;";

/// Read-only access to the vehicles associated with people.
pub struct VehicleRepository<'db> {
    db: &'db dyn Database,
}

impl<'db> VehicleRepository<'db> {
    pub fn new(db: &'db dyn Database) -> Self {
        Self { db }
    }

    /// Returns every vehicle linked to `person_id`, possibly none.
    pub fn all_by_person_id(&self, person_id: PersonId) -> RepoResult<Vec<Vehicle>> {
        collect_rows(
            self.db,
            VEHICLES_BY_PERSON_SQL,
            &[Value::Integer(person_id)],
            parse_vehicle_row,
        )
    }
}

fn parse_vehicle_row(row: &ScannedRow) -> DbResult<Vehicle> {
    Ok(Vehicle {
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
        vehicle_class: row.get(11)?,
        pilots: String::new(),
        films: String::new(),
        created: row.get(12)?,
        edited: row.get(13)?,
        url: row.get(14)?,
    })
}
