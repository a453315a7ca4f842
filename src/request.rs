//! Incoming HTTP request context.
//!
//! One [`Request`] lives exactly as long as one call: raw captures, decoded
//! query pairs, headers, cookies and body bytes on the way in; the coerced
//! [`Args`] after validation. Nothing here outlives the response.

use std::collections::HashMap;

use crate::method::Method;
use crate::param::Args;

/// An incoming HTTP request, plus (after validation) its coerced arguments.
pub struct Request {
    pub(crate) method: Method,
    pub(crate) path: String,
    pub(crate) query: Vec<(String, String)>,
    pub(crate) headers: Vec<(String, String)>,
    pub(crate) body: Vec<u8>,
    pub(crate) params: HashMap<String, String>,
    pub(crate) args: Args,
}

impl Request {
    pub(crate) fn new(
        method: Method,
        path: String,
        raw_query: Option<&str>,
        headers: Vec<(String, String)>,
        body: Vec<u8>,
        params: HashMap<String, String>,
    ) -> Self {
        let query = raw_query
            .map(|q| {
                url::form_urlencoded::parse(q.as_bytes())
                    .map(|(k, v)| (k.into_owned(), v.into_owned()))
                    .collect()
            })
            .unwrap_or_default();
        Self { method, path, query, headers, body, params, args: Args::default() }
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Case-insensitive header lookup. A `_` in `name` matches `-` on the
    /// wire, so `strange_header` finds `Strange-Header`.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| {
                k.len() == name.len()
                    && k.chars().zip(name.chars()).all(|(a, b)| {
                        a.eq_ignore_ascii_case(&b) || (b == '_' && a == '-')
                    })
            })
            .map(|(_, v)| v.as_str())
    }

    /// First query value for `key`, percent-decoded.
    pub fn query(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// A named cookie from the `cookie` header.
    pub fn cookie(&self, name: &str) -> Option<&str> {
        let header = self.header("cookie")?;
        header.split(';').find_map(|pair| {
            let (k, v) = pair.split_once('=')?;
            (k.trim() == name).then_some(v.trim())
        })
    }

    /// Returns a named raw path capture.
    ///
    /// For a route `/users/{id}`, `req.param("id")` on `/users/42` returns
    /// `Some("42")`. Prefer [`Request::args`] for the coerced value.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// The coerced, validated arguments declared by the matched route.
    pub fn args(&self) -> &Args {
        &self.args
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(headers: Vec<(String, String)>, raw_query: Option<&str>) -> Request {
        Request::new(Method::Get, "/".into(), raw_query, headers, Vec::new(), HashMap::new())
    }

    #[test]
    fn header_lookup_normalizes_underscores() {
        let req = request(vec![("Strange-Header".into(), "v".into())], None);
        assert_eq!(req.header("strange_header"), Some("v"));
        assert_eq!(req.header("strange-header"), Some("v"));
        assert_eq!(req.header("other"), None);
    }

    #[test]
    fn query_values_are_percent_decoded() {
        let req = request(Vec::new(), Some("q=a%20b&x=1"));
        assert_eq!(req.query("q"), Some("a b"));
        assert_eq!(req.query("x"), Some("1"));
        assert_eq!(req.query("missing"), None);
    }

    #[test]
    fn cookies_come_from_the_cookie_header() {
        let req = request(vec![("Cookie".into(), "ads_id=abc123; theme=dark".into())], None);
        assert_eq!(req.cookie("ads_id"), Some("abc123"));
        assert_eq!(req.cookie("theme"), Some("dark"));
        assert_eq!(req.cookie("nope"), None);
    }
}
