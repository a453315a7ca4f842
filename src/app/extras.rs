//! Cookie and header extraction, plus the endpoints that raise named domain
//! errors for the exception policy to map.

use serde_json::{json, Value};

use crate::error::HttpError;
use crate::request::Request;

/// `GET /items1/` — reads an optional named cookie.
pub async fn read_ads_cookie(req: Request) -> Result<Value, HttpError> {
    Ok(json!({"ads_id": req.args().opt_str("ads_id")}))
}

/// `GET /items2/` — reads an optional header; `strange_header` matches
/// `Strange-Header` on the wire.
pub async fn read_strange_header(req: Request) -> Result<Value, HttpError> {
    Ok(json!({"strange_header": req.args().opt_str("strange_header")}))
}

/// The item catalogue of the domain-error demo. `foo` is deliberately not
/// in it.
const KNOWN_ITEMS: [(&str, &str); 1] = [("plumbus", "The Plumbus")];

/// `GET /read_items6/{item_id}` — unknown ids answer 404 with a custom
/// header, via the `item_missing` policy entry.
pub async fn read_known_item(req: Request) -> Result<Value, HttpError> {
    let item_id = req.args().str("item_id")?;
    match KNOWN_ITEMS.iter().find(|(k, _)| *k == item_id) {
        Some((_, name)) => Ok(json!({"item": name})),
        None => Err(HttpError::domain("item_missing", "Item not found")),
    }
}

/// `GET /unicorns/{name}` — `yolo` trips the teapot via the `unicorn`
/// policy entry; everything else is a plain 200.
pub async fn read_unicorn(req: Request) -> Result<Value, HttpError> {
    let name = req.args().str("name")?;
    if name == "yolo" {
        return Err(HttpError::domain(
            "unicorn",
            format!("Oops! {name} did something. There goes a unicorn..."),
        ));
    }
    Ok(json!({"unicorn_name": name}))
}

/// `GET /items8/{item_id}` — deprecated route; 3 is refused with a 418.
pub async fn read_item_legacy(req: Request) -> Result<Value, HttpError> {
    let item_id = req.args().int("item_id")?;
    if item_id == 3 {
        return Err(HttpError::domain("unwanted_number", "Nope! I don't like 3."));
    }
    Ok(json!({"item_id": item_id}))
}
