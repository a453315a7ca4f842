//! The route table: matching, validation, invocation.
//!
//! One radix tree per HTTP method — O(path-length) lookup via [`matchit`].
//! Build the [`Router`] once at startup (routes, error policy, validation
//! cap); it is immutable afterwards and shared read-only across request
//! tasks. [`Router::dispatch`] is the whole request boundary: routing miss,
//! validation failure, handler error and handler success all leave through
//! it as a [`Response`], never as a propagating error.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use matchit::Router as MatchitRouter;
use serde_json::Value;
use tracing::debug;

use crate::error::{ConfigError, ErrorPolicy, HttpError, ValidationError};
use crate::handler::{BoxedHandler, Handler};
use crate::method::Method;
use crate::multipart::{self, UploadPart};
use crate::param::{ArgValue, Args, ParameterSpec, Source};
use crate::request::Request;
use crate::response::Response;
use crate::schema::{validate_value, Collector, FieldType};

/// Violations reported per request before the batch is truncated.
const DEFAULT_MAX_VIOLATIONS: usize = 16;

/// Declares one route: method, path template, parameter specs.
///
/// ```rust
/// use vane::{Route, ParameterSpec};
/// use vane::schema::FieldType;
///
/// Route::put("/items/{item_id}")
///     .param(ParameterSpec::path("item_id", FieldType::Int).ge(0.0).le(1000.0))
///     .param(ParameterSpec::query("q", FieldType::Str).optional().min_len(3).max_len(50));
/// ```
pub struct Route {
    method: Method,
    template: String,
    specs: Vec<ParameterSpec>,
    deprecated: bool,
}

macro_rules! route_ctor {
    ($name:ident, $method:ident) => {
        pub fn $name(template: impl Into<String>) -> Self {
            Self {
                method: Method::$method,
                template: template.into(),
                specs: Vec::new(),
                deprecated: false,
            }
        }
    };
}

impl Route {
    route_ctor!(get, Get);
    route_ctor!(put, Put);
    route_ctor!(post, Post);
    route_ctor!(delete, Delete);
    route_ctor!(patch, Patch);

    pub fn param(mut self, spec: ParameterSpec) -> Self {
        self.specs.push(spec);
        self
    }

    /// Mark the route deprecated. Responses carry a `deprecation: true`
    /// header; behaviour is otherwise unchanged.
    pub fn deprecated(mut self) -> Self {
        self.deprecated = true;
        self
    }
}

/// A registered route: its specs, handler and flags. Immutable after startup.
struct RouteDefinition {
    specs: Arc<Vec<ParameterSpec>>,
    handler: BoxedHandler,
    deprecated: bool,
}

/// The application router: route table + exception policy + validation cap.
pub struct Router {
    routes: HashMap<Method, MatchitRouter<RouteDefinition>>,
    policy: ErrorPolicy,
    max_violations: usize,
}

impl Router {
    pub fn new() -> Self {
        Self {
            routes: HashMap::new(),
            policy: ErrorPolicy::new(),
            max_violations: DEFAULT_MAX_VIOLATIONS,
        }
    }

    /// Install the exception policy mapping handler errors to responses.
    pub fn error_policy(mut self, policy: ErrorPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Cap the number of violations reported in one validation response.
    pub fn max_violations(mut self, cap: usize) -> Self {
        self.max_violations = cap.max(1);
        self
    }

    /// Register a route. Returns `self` for chaining.
    ///
    /// # Panics
    ///
    /// Panics on a configuration error (malformed template, unbound path
    /// segment, unsatisfiable spec, conflicting registration) — these are
    /// startup-fatal by design. Use [`Router::try_route`] to handle them.
    pub fn route(self, route: Route, handler: impl Handler) -> Self {
        let template = route.template.clone();
        self.try_route(route, handler)
            .unwrap_or_else(|e| panic!("invalid route `{template}`: {e}"))
    }

    /// Fallible registration.
    pub fn try_route(mut self, route: Route, handler: impl Handler) -> Result<Self, ConfigError> {
        for segment in template_segments(&route.template)? {
            let bound = route.specs.iter().any(|s| {
                s.source == Source::Path && s.wire_name() == segment
            });
            if !bound {
                return Err(ConfigError::UnboundSegment {
                    template: route.template.clone(),
                    segment,
                });
            }
        }
        for spec in &route.specs {
            spec.check_satisfiable()?;
        }

        let definition = RouteDefinition {
            specs: Arc::new(route.specs),
            handler: handler.into_boxed_handler(),
            deprecated: route.deprecated,
        };
        self.routes
            .entry(route.method)
            .or_default()
            .insert(&route.template, definition)
            .map_err(|e| ConfigError::Conflict(e.to_string()))?;
        Ok(self)
    }

    /// Route one request end to end: match, validate, invoke, map errors.
    ///
    /// `target` is the request target (`/items/3?q=abc`); `headers` arrive
    /// unparsed; the body is raw bytes. Every failure mode leaves as a
    /// response — this function cannot fail.
    pub async fn dispatch(
        &self,
        method: Method,
        target: &str,
        headers: Vec<(String, String)>,
        body: Vec<u8>,
    ) -> Response {
        let (path, raw_query) = match target.split_once('?') {
            Some((p, q)) => (p, Some(q)),
            None => (target, None),
        };

        let (definition, params) = match self.lookup(method, path) {
            Ok(found) => found,
            Err(e) => {
                let resp = self.policy.respond(&e);
                debug!(%method, path, status = resp.status_code(), "dispatch (no route)");
                return resp;
            }
        };

        let mut req = Request::new(method, path.to_owned(), raw_query, headers, body, params);
        let mut resp = match validate(&definition.specs, &req, self.max_violations) {
            Ok(args) => {
                req.args = args;
                match definition.handler.call(req).await {
                    Ok(resp) => resp,
                    Err(e) => self.policy.respond(&e),
                }
            }
            Err(v) => self.policy.respond(&HttpError::Validation(v)),
        };
        if definition.deprecated {
            resp.add_header("deprecation", "true");
        }
        debug!(%method, path, status = resp.status_code(), "dispatch");
        resp
    }

    /// Find the route for `method` + `path`; distinguishes 404 (no method
    /// serves this path) from 405 (another method does).
    fn lookup(
        &self,
        method: Method,
        path: &str,
    ) -> Result<(&RouteDefinition, HashMap<String, String>), HttpError> {
        if let Some(tree) = self.routes.get(&method) {
            if let Ok(matched) = tree.at(path) {
                let params = matched
                    .params
                    .iter()
                    .map(|(k, v)| (k.to_owned(), v.to_owned()))
                    .collect();
                return Ok((matched.value, params));
            }
        }
        let other_method_matches = Method::ALL.iter().any(|m| {
            *m != method
                && self
                    .routes
                    .get(m)
                    .is_some_and(|tree| tree.at(path).is_ok())
        });
        if other_method_matches {
            Err(HttpError::MethodNotAllowed)
        } else {
            Err(HttpError::NotFound)
        }
    }

    /// Parse a method string and dispatch; unknown methods are 405.
    pub(crate) async fn dispatch_raw(
        &self,
        method: &str,
        target: &str,
        headers: Vec<(String, String)>,
        body: Vec<u8>,
    ) -> Response {
        match Method::from_str(method) {
            Ok(m) => self.dispatch(m, target, headers, body).await,
            Err(()) => self.policy.respond(&HttpError::MethodNotAllowed),
        }
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

/// Extract `{name}` segments of a path template, rejecting malformed ones.
fn template_segments(template: &str) -> Result<Vec<String>, ConfigError> {
    let malformed = |reason: &str| ConfigError::MalformedTemplate {
        template: template.to_owned(),
        reason: reason.to_owned(),
    };
    if !template.starts_with('/') {
        return Err(malformed("must start with `/`"));
    }
    let mut out = Vec::new();
    for segment in template.split('/') {
        match (segment.starts_with('{'), segment.ends_with('}')) {
            (true, true) => {
                let name = &segment[1..segment.len() - 1];
                if name.is_empty() {
                    return Err(malformed("empty `{}` segment"));
                }
                out.push(name.to_owned());
            }
            (false, false) => {
                if segment.contains('{') || segment.contains('}') {
                    return Err(malformed("stray brace in literal segment"));
                }
            }
            _ => return Err(malformed("unclosed `{` segment")),
        }
    }
    Ok(out)
}

// ── Validation ───────────────────────────────────────────────────────────────

/// Evaluate every [`ParameterSpec`] against the request, batching violations.
///
/// The JSON body is parsed at most once, the multipart body decoded at most
/// once, regardless of how many specs draw from them.
fn validate(
    specs: &[ParameterSpec],
    req: &Request,
    cap: usize,
) -> Result<Args, ValidationError> {
    let mut collector = Collector::new(cap);
    let mut args = Args::default();
    let mut body = LazyBody::new(req);

    for spec in specs {
        let label = format!("{}.{}", spec.source, spec.wire_name());
        match spec.source {
            Source::Path | Source::Query | Source::Header | Source::Cookie => {
                let raw = match spec.source {
                    Source::Path => req.param(spec.wire_name()),
                    Source::Query => req.query(spec.wire_name()),
                    Source::Header => req.header(spec.wire_name()),
                    Source::Cookie => req.cookie(spec.wire_name()),
                    _ => unreachable!(),
                };
                coerce_text(spec, raw, &label, &mut args, &mut collector);
            }
            Source::Form => {
                let parts = body.multipart(&mut collector);
                let raw = parts.and_then(|p| {
                    p.iter()
                        .find(|part| part.name == spec.wire_name())
                        .map(|part| String::from_utf8_lossy(&part.data).into_owned())
                });
                coerce_text(spec, raw.as_deref(), &label, &mut args, &mut collector);
            }
            Source::File => {
                let part = body
                    .multipart(&mut collector)
                    .and_then(|p| p.iter().find(|part| part.name == spec.wire_name()).cloned());
                match part {
                    Some(part) => {
                        let value = match spec.ty {
                            FieldType::Bytes => ArgValue::Bytes(part.data),
                            _ => ArgValue::File(part),
                        };
                        args.insert(spec.name, value);
                    }
                    None if spec.required => collector.push(&label, "file is required"),
                    None => {}
                }
            }
            Source::Body if matches!(spec.ty, FieldType::Bytes) => {
                if req.body().is_empty() && spec.required {
                    collector.push("body", "request body is required");
                } else {
                    args.insert(spec.name, ArgValue::Bytes(req.body().to_vec()));
                }
            }
            Source::Body => match body.json(&mut collector) {
                JsonBody::Parsed(parsed) => {
                    let parsed = parsed.clone();
                    coerce_json(spec, &parsed, "body", &mut args, &mut collector);
                }
                JsonBody::Absent if spec.required => {
                    collector.push("body", "request body is required");
                }
                JsonBody::Absent => apply_absent_default(spec, &mut args),
                JsonBody::Unusable => {}
            },
            Source::BodyField => {
                enum FieldState {
                    Unusable, // parse failure, reported once by LazyBody
                    NotObject,
                    Absent,
                    Present(Value),
                }
                let state = match body.json(&mut collector) {
                    JsonBody::Unusable => FieldState::Unusable,
                    // An absent body and an absent field are the same thing
                    // to a field spec.
                    JsonBody::Absent => FieldState::Absent,
                    JsonBody::Parsed(v) => match v.as_object() {
                        None => FieldState::NotObject,
                        Some(o) => match o.get(spec.wire_name()) {
                            Some(raw) => FieldState::Present(raw.clone()),
                            None => FieldState::Absent,
                        },
                    },
                };
                match state {
                    FieldState::Unusable => {}
                    FieldState::NotObject => collector.push(&label, "body is not an object"),
                    FieldState::Present(raw) => {
                        coerce_json(spec, &raw, &label, &mut args, &mut collector)
                    }
                    FieldState::Absent if spec.required => {
                        collector.push(&label, "field is required")
                    }
                    FieldState::Absent => apply_absent_default(spec, &mut args),
                }
            }
        }
    }

    if collector.is_empty() {
        Ok(args)
    } else {
        Err(collector.finish())
    }
}

/// Coerce a text-transport value (path/query/header/cookie/form).
fn coerce_text(
    spec: &ParameterSpec,
    raw: Option<&str>,
    label: &str,
    args: &mut Args,
    collector: &mut Collector,
) {
    match raw {
        Some(raw) => coerce_json(
            spec,
            &Value::String(raw.to_owned()),
            label,
            args,
            collector,
        ),
        None if spec.required => collector.push(label, "field is required"),
        None => apply_absent_default(spec, args),
    }
}

/// Validate one JSON value against the spec's type + constraints and store
/// the typed result.
fn coerce_json(
    spec: &ParameterSpec,
    raw: &Value,
    label: &str,
    args: &mut Args,
    collector: &mut Collector,
) {
    if raw.is_null() {
        if spec.required {
            collector.push(label, "field is required");
        } else {
            apply_absent_default(spec, args);
        }
        return;
    }
    if let Some(normalized) = validate_value(raw, &spec.ty, &spec.constraints, label, collector) {
        match ArgValue::from_normalized(normalized, &spec.ty) {
            Ok(value) => args.insert(spec.name, value),
            Err(reason) => collector.push(label, reason),
        }
    }
}

fn apply_absent_default(spec: &ParameterSpec, args: &mut Args) {
    let fallback = spec.default.clone().or_else(|| spec.ty.empty_value());
    if let Some(default) = fallback {
        if let Ok(value) = ArgValue::from_normalized(default, &spec.ty) {
            args.insert(spec.name, value);
        }
    }
}

/// Outcome of the one JSON parse a request gets.
enum JsonBody {
    /// No body bytes at all. Whether that is an error depends on the spec
    /// asking, so it is not a violation by itself.
    Absent,
    /// Body present but unparseable; reported once by [`LazyBody::json`].
    Unusable,
    Parsed(Value),
}

/// Parses the JSON body / multipart body at most once per request, reporting
/// a parse failure exactly once no matter how many specs ask for it.
struct LazyBody<'r> {
    req: &'r Request,
    json: Option<JsonBody>,
    parts: Option<Option<Vec<UploadPart>>>,
}

impl<'r> LazyBody<'r> {
    fn new(req: &'r Request) -> Self {
        Self { req, json: None, parts: None }
    }

    fn json(&mut self, collector: &mut Collector) -> &JsonBody {
        let req = self.req;
        self.json.get_or_insert_with(|| {
            if req.body().is_empty() {
                JsonBody::Absent
            } else {
                match serde_json::from_slice(req.body()) {
                    Ok(v) => JsonBody::Parsed(v),
                    Err(e) => {
                        collector.push("body", format!("invalid JSON: {e}"));
                        JsonBody::Unusable
                    }
                }
            }
        })
    }

    fn multipart(&mut self, collector: &mut Collector) -> Option<&Vec<UploadPart>> {
        if self.parts.is_none() {
            let decoded = match self
                .req
                .header("content-type")
                .and_then(multipart::boundary)
            {
                Some(boundary) => match multipart::parse(self.req.body(), &boundary) {
                    Ok(parts) => Some(parts),
                    Err(reason) => {
                        collector.push("body", reason);
                        None
                    }
                },
                None => {
                    collector.push("body", "expected a multipart/form-data body");
                    None
                }
            };
            self.parts = Some(decoded);
        }
        self.parts.as_ref().and_then(|v| v.as_ref())
    }
}
