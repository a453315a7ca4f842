//! The demo service: every route, spec and policy entry in one place.
//!
//! [`router`] builds the complete configuration object `main` hands to the
//! server. Nothing in here is global or mutable — the returned [`Router`]
//! is the whole application state.

mod extras;
mod items;
mod models;
mod uploads;

use http::StatusCode;
use serde_json::json;

use crate::error::{DomainError, ErrorPolicy};
use crate::param::ParameterSpec;
use crate::response::Response;
use crate::router::{Route, Router};
use crate::schema::FieldType;

/// Build the application's route table and exception policy.
pub fn router() -> Router {
    let mut schedule = Route::put("/items/item6/{item_id}")
        .param(ParameterSpec::path("item_id", FieldType::Uuid));
    for (name, ty, required) in models::schedule_fields() {
        let spec = ParameterSpec::body_field(name, ty);
        schedule = schedule.param(if required { spec } else { spec.optional() });
    }

    Router::new()
        .error_policy(policy())
        .route(Route::get("/"), items::root)
        .route(
            Route::put("/items/{item_id}")
                .param(ParameterSpec::path("item_id", FieldType::Int).ge(0.0).le(1000.0))
                .param(ParameterSpec::query("q", FieldType::Str).optional().min_len(3).max_len(50))
                .param(ParameterSpec::body_field(
                    "item",
                    FieldType::Object(models::item_schema()),
                ))
                .param(ParameterSpec::body_field(
                    "user",
                    FieldType::Object(models::user_schema()),
                ))
                .param(ParameterSpec::body_field("importance", FieldType::Int).gt(0.0).lt(6.0)),
            items::update_item,
        )
        .route(
            Route::put("/items/item2/{item_id}")
                .param(ParameterSpec::path("item_id", FieldType::Int))
                .param(ParameterSpec::body_field(
                    "item",
                    FieldType::Object(models::item_schema()),
                )),
            items::update_item_embedded,
        )
        .route(
            Route::put("/items/item3/{item_id}")
                .param(ParameterSpec::path("item_id", FieldType::Int))
                .param(ParameterSpec::body(
                    "item",
                    FieldType::Object(models::constrained_item_schema()),
                )),
            items::update_item_bare,
        )
        .route(
            Route::put("/items/item4/{item_id}")
                .param(ParameterSpec::path("item_id", FieldType::Int))
                .param(ParameterSpec::body(
                    "item",
                    FieldType::Object(models::tagged_item_schema()),
                )),
            items::update_item_bare,
        )
        .route(
            Route::put("/items/item5/{item_id}")
                .param(ParameterSpec::path("item_id", FieldType::Int))
                .param(ParameterSpec::body(
                    "item",
                    FieldType::Object(models::illustrated_item_schema()),
                )),
            items::update_item_bare,
        )
        .route(
            Route::post("/offers").param(ParameterSpec::body(
                "offer",
                FieldType::Object(models::offer_schema()),
            )),
            items::create_offer,
        )
        .route(
            Route::post("/images/multiple").param(ParameterSpec::body(
                "images",
                FieldType::List(Box::new(FieldType::Object(models::image_schema()))),
            )),
            items::create_images,
        )
        .route(
            Route::post("/index-weights/").param(ParameterSpec::body(
                "weights",
                FieldType::Map(Box::new(FieldType::Int), Box::new(FieldType::Float)),
            )),
            items::create_index_weights,
        )
        .route(schedule, items::schedule_item)
        .route(
            Route::get("/items1/")
                .param(ParameterSpec::cookie("ads_id", FieldType::Str).optional()),
            extras::read_ads_cookie,
        )
        .route(
            Route::get("/items2/")
                .param(ParameterSpec::header("strange_header", FieldType::Str).optional()),
            extras::read_strange_header,
        )
        .route(
            Route::post("/files1/").param(ParameterSpec::body("file", FieldType::Bytes)),
            uploads::create_file,
        )
        .route(
            Route::post("/files2/").param(ParameterSpec::body("file", FieldType::Bytes)),
            uploads::create_file,
        )
        .route(
            Route::post("/uploadfile1/").param(ParameterSpec::file("file")),
            uploads::create_upload_file,
        )
        .route(
            Route::post("/uploadfile2/").param(ParameterSpec::file("file")),
            uploads::create_upload_file,
        )
        .route(
            Route::post("/files4")
                .param(ParameterSpec::file_bytes("file"))
                .param(ParameterSpec::file("fileb"))
                .param(ParameterSpec::form("token", FieldType::Str).alias("access_token")),
            uploads::create_combined,
        )
        .route(
            Route::get("/read_items6/{item_id}")
                .param(ParameterSpec::path("item_id", FieldType::Str)),
            extras::read_known_item,
        )
        .route(
            Route::get("/unicorns/{name}")
                .param(ParameterSpec::path("name", FieldType::Str)),
            extras::read_unicorn,
        )
        .route(
            Route::get("/items8/{item_id}")
                .param(ParameterSpec::path("item_id", FieldType::Int))
                .deprecated(),
            extras::read_item_legacy,
        )
}

/// One responder per domain-error kind. Registering a kind twice would
/// replace the earlier entry, so each kind appears exactly once.
fn policy() -> ErrorPolicy {
    ErrorPolicy::new()
        .on("item_missing", |e: &DomainError| {
            Response::builder()
                .status(StatusCode::NOT_FOUND)
                .header("x-error", "There goes my error")
                .json(body(json!({"detail": e.message})))
        })
        .on("unicorn", |e: &DomainError| {
            Response::builder()
                .status(StatusCode::IM_A_TEAPOT)
                .json(body(json!({"message": e.message})))
        })
        .on("unwanted_number", |e: &DomainError| {
            Response::builder()
                .status(StatusCode::IM_A_TEAPOT)
                .json(body(json!({"detail": e.message})))
        })
}

fn body(value: serde_json::Value) -> Vec<u8> {
    serde_json::to_vec(&value).unwrap_or_default()
}
