//! Body models and their declarative schemas.
//!
//! Each schema is the single source of truth for what a request body may
//! contain; the serde structs exist only for handlers that want typed access
//! to a body the walker has *already* validated.

use serde::{Deserialize, Serialize};

use crate::schema::{Field, FieldType, Schema};

#[derive(Debug, Serialize, Deserialize)]
pub struct Item {
    pub name: String,
    pub description: Option<String>,
    pub price: f64,
    pub tax: Option<f64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct User {
    pub username: String,
    pub full_name: Option<String>,
}

/// `{name, description?, price, tax?}` — the base item shape.
pub fn item_schema() -> Schema {
    Schema::new()
        .field(Field::str("name"))
        .field(Field::str("description").optional())
        .field(Field::float("price"))
        .field(Field::float("tax").optional())
}

/// `{username, full_name?}`.
pub fn user_schema() -> Schema {
    Schema::new()
        .field(Field::str("username"))
        .field(Field::str("full_name").optional())
}

/// Base item with field-level constraints: name length 3..15, price strictly
/// positive, description at most 300 characters.
pub fn constrained_item_schema() -> Schema {
    Schema::new()
        .field(Field::str("name").min_len(3).max_len(15))
        .field(Field::str("description").optional().max_len(300))
        .field(Field::float("price").gt(0.0))
        .field(Field::float("tax").optional())
}

/// Base item plus a deduplicated string-tag collection.
pub fn tagged_item_schema() -> Schema {
    Schema::new()
        .field(Field::str("name"))
        .field(Field::str("description").optional())
        .field(Field::float("price"))
        .field(Field::float("tax").optional())
        .field(Field::set("tags", FieldType::Str).optional())
}

/// `{url, name}` where the url must parse as an absolute URL.
pub fn image_schema() -> Schema {
    Schema::new()
        .field(Field::url("url"))
        .field(Field::str("name"))
}

/// Tagged item plus an optional nested list of images.
pub fn illustrated_item_schema() -> Schema {
    Schema::new()
        .field(Field::str("name"))
        .field(Field::str("description").optional())
        .field(Field::float("price"))
        .field(Field::float("tax").optional())
        .field(Field::set("tags", FieldType::Str).optional())
        .field(Field::list("images", FieldType::Object(image_schema())).optional())
}

/// An offer wrapping a nested list of illustrated items.
pub fn offer_schema() -> Schema {
    Schema::new()
        .field(Field::str("name"))
        .field(Field::str("description").optional())
        .field(Field::float("price"))
        .field(Field::list("items", FieldType::Object(illustrated_item_schema())))
}

/// Body of the scheduling endpoint: two datetimes, a duration offset, and an
/// optional time of day. All embedded fields.
pub fn schedule_fields() -> [(&'static str, FieldType, bool); 4] {
    [
        ("start_datetime", FieldType::DateTime, true),
        ("end_datetime", FieldType::DateTime, true),
        ("process_after", FieldType::Duration, true),
        ("repeat_at", FieldType::Time, false),
    ]
}
