//! Internal Diesel row structs for the plan collection.
//!
//! These types never leave the persistence layer; they exist to satisfy
//! Diesel's insert traits. Reads select the `document` column directly.

use diesel::prelude::*;

use super::schema::plans;

/// Insertable struct for new plan documents.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = plans)]
pub(crate) struct NewPlanRow<'a> {
    pub id: &'a str,
    pub document: serde_json::Value,
}
