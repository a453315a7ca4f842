//! Item endpoints: path/query constraints, body models, nested and repeated
//! sub-models, and the datetime arithmetic of the scheduling route.
//!
//! Handlers here never re-validate: every value they read from
//! [`Request::args`] already passed its declared constraints.

use serde_json::{json, Value};

use crate::error::HttpError;
use crate::request::Request;
use crate::schema::format_duration;

use super::models::{Item, User};

/// `GET /`
pub async fn root(_req: Request) -> Result<Value, HttpError> {
    Ok(json!({"message": "Hello, World!"}))
}

/// `PUT /items/{item_id}` — path + query constraints combined with two body
/// models and an embedded `importance` field.
pub async fn update_item(req: Request) -> Result<Value, HttpError> {
    let args = req.args();
    let item_id = args.int("item_id")?;
    let item: Item = args.model("item")?;
    let user: User = args.model("user")?;
    let importance = args.int("importance")?;

    let mut result = json!({
        "item_id": item_id,
        "item": item,
        "user": user,
        "importance": importance,
    });
    if let Some(q) = args.opt_str("q") {
        result["q"] = json!(q);
    }
    Ok(result)
}

/// `PUT /items/item2/{item_id}` — a single embedded item object.
pub async fn update_item_embedded(req: Request) -> Result<Value, HttpError> {
    let args = req.args();
    Ok(json!({
        "item_id": args.int("item_id")?,
        "item": args.json("item")?,
    }))
}

/// `PUT /items/item3/{item_id}`, `PUT /items/item4/{item_id}`,
/// `PUT /items/item5/{item_id}` — bare-body items whose interesting work
/// (field constraints, tag dedup, nested image validation) all happened in
/// the schema walker.
pub async fn update_item_bare(req: Request) -> Result<Value, HttpError> {
    let args = req.args();
    Ok(json!({
        "item_id": args.int("item_id")?,
        "item": args.json("item")?,
    }))
}

/// `POST /offers` — nested list of items inside the offer.
pub async fn create_offer(req: Request) -> Result<Value, HttpError> {
    req.args().json("offer")
}

/// `POST /images/multiple` — a bare list body. Empty list in, empty list out.
pub async fn create_images(req: Request) -> Result<Value, HttpError> {
    req.args().json("images")
}

/// `POST /index-weights/` — mapping from integer key to float value.
pub async fn create_index_weights(req: Request) -> Result<Value, HttpError> {
    req.args().json("weights")
}

const DATETIME_FMT: &str = "%Y-%m-%dT%H:%M:%S";

/// `PUT /items/item6/{item_id}` — UUID path parameter plus datetime
/// arithmetic: `start_process = start_datetime + process_after` and
/// `duration = end_datetime - start_process`.
pub async fn schedule_item(req: Request) -> Result<Value, HttpError> {
    let args = req.args();
    let item_id = args.uuid("item_id")?;
    let start_datetime = args.datetime("start_datetime")?;
    let end_datetime = args.datetime("end_datetime")?;
    let process_after = args.duration("process_after")?;
    let repeat_at = args.opt_time("repeat_at");

    let start_process = start_datetime + process_after;
    let duration = end_datetime - start_process;

    Ok(json!({
        "item_id": item_id,
        "start_datetime": start_datetime.format(DATETIME_FMT).to_string(),
        "end_datetime": end_datetime.format(DATETIME_FMT).to_string(),
        "process_after": format_duration(process_after),
        "repeat_at": repeat_at.map(|t| t.format("%H:%M:%S").to_string()),
        "start_process": start_process.format(DATETIME_FMT).to_string(),
        "duration": format_duration(duration),
    }))
}
