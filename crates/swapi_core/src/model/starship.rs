//! Starship domain model.
//!
//! Same shape as `Vehicle`, with hyperdrive rating and MGLT in place of the
//! vehicle class.

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Starship {
    pub id: i64,
    pub name: String,
    pub model: String,
    pub manufacturer: String,
    pub cost_in_credits: String,
    pub length: String,
    pub max_atmosphering_speed: String,
    pub crew: String,
    pub passengers: String,
    pub cargo_capacity: String,
    pub consumables: String,
    pub hyperdrive_rating: String,
    pub mglt: String,
    pub starship_class: String,
    pub pilots: String,
    pub films: String,
    #[serde(rename = "_created")]
    pub created: String,
    #[serde(rename = "_edited")]
    pub edited: String,
    pub url: String,
}
