//! `multipart/form-data` wire decoding (RFC 7578).
//!
//! Just enough parser for upload endpoints: boundary detection from the
//! `content-type` header, part headers (`content-disposition` name/filename,
//! `content-type`), and the part bytes. No streaming to disk — parts are
//! ephemeral request state, dropped with the [`Request`](crate::Request).

/// One decoded part of a multipart body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadPart {
    /// The `name` from `content-disposition`.
    pub name: String,
    /// The `filename` from `content-disposition`, if the part is a file.
    pub filename: Option<String>,
    /// The part's own `content-type` header, if present.
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

/// Extract the boundary token from a `content-type: multipart/form-data`
/// header value. Returns `None` for any other content type.
pub(crate) fn boundary(content_type: &str) -> Option<String> {
    let mut parts = content_type.split(';');
    if !parts.next()?.trim().eq_ignore_ascii_case("multipart/form-data") {
        return None;
    }
    for param in parts {
        // Parameters without `=` carry no boundary; skip them.
        let Some((key, value)) = param.split_once('=') else { continue };
        if key.trim().eq_ignore_ascii_case("boundary") {
            return Some(value.trim().trim_matches('"').to_owned());
        }
    }
    None
}

/// Decode a multipart body into its parts.
///
/// Malformed framing is reported as an `Err(reason)` which the dispatch
/// layer turns into a validation failure on `body`.
pub(crate) fn parse(body: &[u8], boundary: &str) -> Result<Vec<UploadPart>, String> {
    let delimiter = format!("--{boundary}");
    let mut parts = Vec::new();
    let mut cursor = body;

    // Skip the preamble up to the first delimiter.
    cursor = match find(cursor, delimiter.as_bytes()) {
        Some(i) => &cursor[i + delimiter.len()..],
        None => return Err("multipart body has no boundary".into()),
    };

    loop {
        if cursor.starts_with(b"--") {
            break; // closing delimiter
        }
        cursor = cursor.strip_prefix(b"\r\n").unwrap_or(cursor);

        let header_end = find(cursor, b"\r\n\r\n")
            .ok_or_else(|| "multipart part has no header terminator".to_string())?;
        let headers = std::str::from_utf8(&cursor[..header_end])
            .map_err(|_| "multipart part headers are not utf-8".to_string())?;
        cursor = &cursor[header_end + 4..];

        let mut name = None;
        let mut filename = None;
        let mut content_type = None;
        for line in headers.split("\r\n") {
            let Some((key, value)) = line.split_once(':') else { continue };
            let value = value.trim();
            if key.eq_ignore_ascii_case("content-disposition") {
                name = disposition_param(value, "name");
                filename = disposition_param(value, "filename");
            } else if key.eq_ignore_ascii_case("content-type") {
                content_type = Some(value.to_owned());
            }
        }
        let name = name.ok_or_else(|| "multipart part has no field name".to_string())?;

        // Part data runs to the next delimiter, minus its leading CRLF.
        let next = format!("\r\n{delimiter}");
        let data_end = find(cursor, next.as_bytes())
            .ok_or_else(|| "multipart part is not terminated".to_string())?;
        parts.push(UploadPart {
            name,
            filename,
            content_type,
            data: cursor[..data_end].to_vec(),
        });
        cursor = &cursor[data_end + next.len()..];
    }

    Ok(parts)
}

fn disposition_param(value: &str, key: &str) -> Option<String> {
    for param in value.split(';') {
        let (k, v) = match param.split_once('=') {
            Some(kv) => kv,
            None => continue,
        };
        if k.trim().eq_ignore_ascii_case(key) {
            return Some(v.trim().trim_matches('"').to_owned());
        }
    }
    None
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(boundary: &str) -> Vec<u8> {
        let mut b = Vec::new();
        b.extend_from_slice(
            format!(
                "--{boundary}\r\n\
                 content-disposition: form-data; name=\"token\"\r\n\r\n\
                 s3cret\r\n\
                 --{boundary}\r\n\
                 content-disposition: form-data; name=\"fileb\"; filename=\"cat.png\"\r\n\
                 content-type: image/png\r\n\r\n"
            )
            .as_bytes(),
        );
        b.extend_from_slice(&[0x89, b'P', b'N', b'G']);
        b.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
        b
    }

    #[test]
    fn boundary_comes_from_the_content_type() {
        assert_eq!(
            boundary("multipart/form-data; boundary=xyz"),
            Some("xyz".to_owned())
        );
        assert_eq!(
            boundary("multipart/form-data; boundary=\"quoted\""),
            Some("quoted".to_owned())
        );
        assert_eq!(
            boundary("multipart/form-data; x; boundary=b"),
            Some("b".to_owned())
        );
        assert_eq!(boundary("application/json"), None);
    }

    #[test]
    fn parses_form_fields_and_file_parts() {
        let parts = parse(&body("xyz"), "xyz").unwrap();
        assert_eq!(parts.len(), 2);

        assert_eq!(parts[0].name, "token");
        assert_eq!(parts[0].filename, None);
        assert_eq!(parts[0].data, b"s3cret");

        assert_eq!(parts[1].name, "fileb");
        assert_eq!(parts[1].filename.as_deref(), Some("cat.png"));
        assert_eq!(parts[1].content_type.as_deref(), Some("image/png"));
        assert_eq!(parts[1].data, [0x89, b'P', b'N', b'G']);
    }

    #[test]
    fn binary_part_bytes_survive_untouched() {
        let parts = parse(&body("b"), "b").unwrap();
        assert_eq!(parts[1].data.len(), 4);
    }

    #[test]
    fn unterminated_part_is_rejected() {
        let raw = b"--xyz\r\ncontent-disposition: form-data; name=\"a\"\r\n\r\ndata";
        assert!(parse(raw, "xyz").is_err());
    }
}
