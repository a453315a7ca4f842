//! Upload endpoints: raw byte bodies, multipart file parts, and the combined
//! form with an aliased text field.

use serde_json::{json, Value};

use crate::error::HttpError;
use crate::request::Request;

/// `POST /files1/`, `POST /files2/` — the raw request body as bytes; only
/// the size is reported back.
pub async fn create_file(req: Request) -> Result<Value, HttpError> {
    let file = req.args().bytes("file")?;
    Ok(json!({"file_size": file.len()}))
}

/// `POST /uploadfile1/`, `POST /uploadfile2/` — a multipart file part with
/// its metadata; the content comes back verbatim (lossy utf-8 for display).
pub async fn create_upload_file(req: Request) -> Result<Value, HttpError> {
    let file = req.args().file("file")?;
    Ok(json!({
        "filename": file.filename,
        "content_type": file.content_type,
        "size": file.data.len(),
        "content": String::from_utf8_lossy(&file.data),
    }))
}

/// `POST /files4` — raw bytes part + streamed file part + form text field.
/// The token is declared as `token` but read from the wire field
/// `access_token` (field aliasing).
pub async fn create_combined(req: Request) -> Result<Value, HttpError> {
    let args = req.args();
    let file = args.bytes("file")?;
    let fileb = args.file("fileb")?;
    let token = args.str("token")?;
    Ok(json!({
        "file_size": file.len(),
        "fileb_filename": fileb.filename,
        "fileb_content_type": fileb.content_type,
        "fileb_size": fileb.data.len(),
        "token": token,
    }))
}
