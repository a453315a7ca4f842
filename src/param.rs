//! Parameter specs and the coerced argument map handlers read from.
//!
//! A [`ParameterSpec`] declares where one input comes from ([`Source`]), what
//! it coerces to ([`FieldType`]) and which constraints bound it. The route
//! table evaluates the specs before a handler ever runs; the handler then
//! reads *typed* values out of [`Args`] — no handler ever touches a raw
//! string it did not ask for.

use std::collections::HashMap;

use chrono::{NaiveDateTime, NaiveTime};
use serde_json::Value;
use uuid::Uuid;

use crate::error::{ConfigError, HttpError};
use crate::multipart::UploadPart;
use crate::schema::{parse_duration, Constraint, FieldType};

/// Where a parameter's raw value is extracted from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    /// A named `{segment}` of the path template.
    Path,
    /// A query-string value.
    Query,
    /// A request header. Lookup is case-insensitive and `_` in the declared
    /// name matches `-` on the wire.
    Header,
    /// A named cookie.
    Cookie,
    /// The entire request body (JSON, or raw bytes for [`FieldType::Bytes`]).
    Body,
    /// One named field of the JSON body — the "embed" convention.
    BodyField,
    /// A text field of a multipart form.
    Form,
    /// A multipart part: the bytes ([`FieldType::Bytes`]) or the full part
    /// with filename and content type ([`FieldType::File`]).
    File,
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Path => "path",
            Self::Query => "query",
            Self::Header => "header",
            Self::Cookie => "cookie",
            Self::Body => "body",
            Self::BodyField => "body",
            Self::Form => "form",
            Self::File => "file",
        })
    }
}

/// Declarative description of one input: source, type, constraints.
#[derive(Debug, Clone)]
pub struct ParameterSpec {
    pub name: &'static str,
    pub source: Source,
    pub ty: FieldType,
    pub required: bool,
    pub default: Option<Value>,
    /// Wire name, when it differs from the handler-facing `name`.
    pub alias: Option<&'static str>,
    pub constraints: Vec<Constraint>,
}

impl ParameterSpec {
    fn new(name: &'static str, source: Source, ty: FieldType) -> Self {
        Self { name, source, ty, required: true, default: None, alias: None, constraints: Vec::new() }
    }

    pub fn path(name: &'static str, ty: FieldType) -> Self {
        Self::new(name, Source::Path, ty)
    }

    pub fn query(name: &'static str, ty: FieldType) -> Self {
        Self::new(name, Source::Query, ty)
    }

    pub fn header(name: &'static str, ty: FieldType) -> Self {
        Self::new(name, Source::Header, ty)
    }

    pub fn cookie(name: &'static str, ty: FieldType) -> Self {
        Self::new(name, Source::Cookie, ty)
    }

    /// The bare request body, exposed to the handler under `name`.
    pub fn body(name: &'static str, ty: FieldType) -> Self {
        Self::new(name, Source::Body, ty)
    }

    /// An embedded body field: the value of `body[name]`.
    pub fn body_field(name: &'static str, ty: FieldType) -> Self {
        Self::new(name, Source::BodyField, ty)
    }

    pub fn form(name: &'static str, ty: FieldType) -> Self {
        Self::new(name, Source::Form, ty)
    }

    /// A multipart file part carrying filename + content type + bytes.
    pub fn file(name: &'static str) -> Self {
        Self::new(name, Source::File, FieldType::File)
    }

    /// A multipart part of which only the bytes matter.
    pub fn file_bytes(name: &'static str) -> Self {
        Self::new(name, Source::File, FieldType::Bytes)
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn default_value(mut self, v: Value) -> Self {
        self.default = Some(v);
        self.required = false;
        self
    }

    /// Read the value from `wire_name` instead of `name`.
    pub fn alias(mut self, wire_name: &'static str) -> Self {
        self.alias = Some(wire_name);
        self
    }

    /// The name this parameter has on the wire.
    pub fn wire_name(&self) -> &'static str {
        self.alias.unwrap_or(self.name)
    }

    pub fn min_len(mut self, n: usize) -> Self {
        self.constraints.push(Constraint::MinLen(n));
        self
    }

    pub fn max_len(mut self, n: usize) -> Self {
        self.constraints.push(Constraint::MaxLen(n));
        self
    }

    pub fn ge(mut self, n: f64) -> Self {
        self.constraints.push(Constraint::Ge(n));
        self
    }

    pub fn le(mut self, n: f64) -> Self {
        self.constraints.push(Constraint::Le(n));
        self
    }

    pub fn gt(mut self, n: f64) -> Self {
        self.constraints.push(Constraint::Gt(n));
        self
    }

    pub fn lt(mut self, n: f64) -> Self {
        self.constraints.push(Constraint::Lt(n));
        self
    }

    pub fn refine(mut self, check: fn(&Value) -> Result<(), String>) -> Self {
        self.constraints.push(Constraint::Refine(check));
        self
    }

    /// Source and type must be jointly satisfiable by the transport: path
    /// segments, query values, headers, cookies and form fields are text and
    /// can only carry scalars; raw bytes only come from the body or a
    /// multipart part; a [`FieldType::File`] only from a multipart part.
    pub(crate) fn check_satisfiable(&self) -> Result<(), ConfigError> {
        let ok = match self.source {
            Source::Path | Source::Query | Source::Header | Source::Cookie | Source::Form => {
                is_text_scalar(&self.ty)
            }
            Source::Body => !matches!(self.ty, FieldType::File),
            Source::BodyField => !matches!(self.ty, FieldType::File | FieldType::Bytes),
            Source::File => matches!(self.ty, FieldType::File | FieldType::Bytes),
        };
        if ok {
            Ok(())
        } else {
            Err(ConfigError::UnsatisfiableSource {
                name: self.name.to_owned(),
                location: self.source.to_string(),
                ty: self.ty.name().to_owned(),
            })
        }
    }
}

fn is_text_scalar(ty: &FieldType) -> bool {
    matches!(
        ty,
        FieldType::Str
            | FieldType::Int
            | FieldType::Float
            | FieldType::Bool
            | FieldType::Uuid
            | FieldType::DateTime
            | FieldType::Time
            | FieldType::Duration
            | FieldType::Url
    )
}

// ── Coerced arguments ────────────────────────────────────────────────────────

/// One coerced value, as typed as its [`FieldType`] allows.
#[derive(Debug, Clone)]
pub enum ArgValue {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Uuid(Uuid),
    DateTime(NaiveDateTime),
    Time(NaiveTime),
    Duration(chrono::Duration),
    Bytes(Vec<u8>),
    File(UploadPart),
    /// Validated, normalized JSON for object/list/map/any-typed parameters.
    Json(Value),
}

impl ArgValue {
    /// Lift a normalized JSON value (output of the validation walker) into
    /// the typed representation for `ty`.
    pub(crate) fn from_normalized(value: Value, ty: &FieldType) -> Result<Self, String> {
        match (ty, value) {
            (FieldType::Str | FieldType::Url, Value::String(s)) => Ok(Self::Str(s)),
            (FieldType::Int, v) => v
                .as_i64()
                .map(Self::Int)
                .ok_or_else(|| "normalized integer lost".into()),
            (FieldType::Float, v) => v
                .as_f64()
                .map(Self::Float)
                .ok_or_else(|| "normalized float lost".into()),
            (FieldType::Bool, Value::Bool(b)) => Ok(Self::Bool(b)),
            (FieldType::Uuid, Value::String(s)) => {
                s.parse().map(Self::Uuid).map_err(|_| "normalized uuid lost".into())
            }
            (FieldType::DateTime, Value::String(s)) => s
                .parse()
                .map(Self::DateTime)
                .map_err(|_| "normalized datetime lost".into()),
            (FieldType::Time, Value::String(s)) => {
                s.parse().map(Self::Time).map_err(|_| "normalized time lost".into())
            }
            (FieldType::Duration, Value::String(s)) => parse_duration(&s).map(Self::Duration),
            (_, v) => Ok(Self::Json(v)),
        }
    }
}

/// The coerced, validated parameters of one request, keyed by spec name.
///
/// Accessors come in two flavours: `x()` for parameters the route declares
/// required (present by construction once validation passed — a miss is an
/// internal error, surfaced as a 500, never a panic) and `opt_x()` for
/// optional ones.
#[derive(Debug, Default)]
pub struct Args {
    values: HashMap<&'static str, ArgValue>,
}

macro_rules! accessors {
    ($req:ident, $opt:ident, $variant:ident, $ty:ty) => {
        pub fn $req(&self, name: &str) -> Result<$ty, HttpError> {
            self.$opt(name)
                .ok_or_else(|| HttpError::Internal(format!("missing required argument `{name}`")))
        }

        pub fn $opt(&self, name: &str) -> Option<$ty> {
            match self.values.get(name) {
                Some(ArgValue::$variant(v)) => Some(v.clone()),
                _ => None,
            }
        }
    };
}

impl Args {
    pub(crate) fn insert(&mut self, name: &'static str, value: ArgValue) {
        self.values.insert(name, value);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    accessors!(str, opt_str, Str, String);
    accessors!(int, opt_int, Int, i64);
    accessors!(float, opt_float, Float, f64);
    accessors!(boolean, opt_boolean, Bool, bool);
    accessors!(uuid, opt_uuid, Uuid, Uuid);
    accessors!(datetime, opt_datetime, DateTime, NaiveDateTime);
    accessors!(time, opt_time, Time, NaiveTime);
    accessors!(duration, opt_duration, Duration, chrono::Duration);
    accessors!(bytes, opt_bytes, Bytes, Vec<u8>);
    accessors!(file, opt_file, File, UploadPart);
    accessors!(json, opt_json, Json, Value);

    /// Deserialize a validated JSON argument into a typed model.
    pub fn model<T: serde::de::DeserializeOwned>(&self, name: &str) -> Result<T, HttpError> {
        let value = self.json(name)?;
        serde_json::from_value(value)
            .map_err(|e| HttpError::Internal(format!("argument `{name}` does not fit model: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn text_sources_only_carry_scalars() {
        let spec = ParameterSpec::query("tags", FieldType::List(Box::new(FieldType::Str)));
        assert!(spec.check_satisfiable().is_err());
        assert!(ParameterSpec::query("q", FieldType::Str).check_satisfiable().is_ok());
        assert!(ParameterSpec::path("id", FieldType::Uuid).check_satisfiable().is_ok());
    }

    #[test]
    fn unsatisfiable_spec_names_its_source_and_type() {
        let err = ParameterSpec::query("tags", FieldType::List(Box::new(FieldType::Str)))
            .check_satisfiable()
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "parameter `tags` declares source query but type list cannot come from it"
        );
    }

    #[test]
    fn files_only_come_from_multipart_parts() {
        assert!(ParameterSpec::body("f", FieldType::File).check_satisfiable().is_err());
        assert!(ParameterSpec::file("f").check_satisfiable().is_ok());
        assert!(ParameterSpec::body("raw", FieldType::Bytes).check_satisfiable().is_ok());
    }

    #[test]
    fn normalized_values_lift_to_typed_args() {
        let v = ArgValue::from_normalized(json!(42), &FieldType::Int).unwrap();
        assert!(matches!(v, ArgValue::Int(42)));
        let v = ArgValue::from_normalized(json!("PT30M"), &FieldType::Duration).unwrap();
        match v {
            ArgValue::Duration(d) => assert_eq!(d, chrono::Duration::minutes(30)),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn alias_changes_the_wire_name_only() {
        let spec = ParameterSpec::form("token", FieldType::Str).alias("access_token");
        assert_eq!(spec.name, "token");
        assert_eq!(spec.wire_name(), "access_token");
    }
}
