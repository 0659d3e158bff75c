//! Diesel table definition for the plan collection.
//!
//! Must match `backend/migrations` exactly. The table carries one JSONB
//! document per plan; `id` duplicates the document's `_id` so the primary key
//! enforces name uniqueness.

diesel::table! {
    /// Plan documents keyed by plan name.
    plans (id) {
        /// Plan name, equal to `document->>'_id'`.
        id -> Text,
        /// The stored plan document.
        document -> Jsonb,
    }
}
