//! Declarative body schemas.
//!
//! A [`Schema`] is an ordered list of [`Field`]s; each field carries a
//! [`FieldType`] and a list of [`Constraint`] descriptors. One generic walker
//! evaluates any schema against a parsed JSON body — there is no per-model
//! validation code and no reflection. Handlers deserialize the *already
//! validated* body into their serde structs afterwards.
//!
//! ```rust
//! use vane::schema::{Field, Schema};
//!
//! let item = Schema::new()
//!     .field(Field::str("name").min_len(3).max_len(15))
//!     .field(Field::float("price").gt(0.0))
//!     .field(Field::str("description").optional().max_len(300));
//! ```

mod coerce;
mod validate;

pub use coerce::{format_duration, parse_duration};
pub(crate) use validate::{validate_value, Collector};

/// The type a raw value is coerced into before constraints run.
///
/// Path segments, query values, headers, cookies and form fields arrive as
/// strings; body values arrive as JSON. Both are coerced through the same
/// vocabulary: an `Int` accepts `42` and `"42"` but rejects
/// `"4.2"`, a `Bool` accepts `true`/`false`/`1`/`0` case-insensitively, and
/// so on.
#[derive(Debug, Clone)]
pub enum FieldType {
    Str,
    Int,
    Float,
    Bool,
    Uuid,
    /// Naive ISO-8601 datetime, e.g. `2023-01-01T00:00:00`.
    DateTime,
    /// Time of day, e.g. `14:23:55`.
    Time,
    /// ISO-8601 duration, e.g. `PT30M`.
    Duration,
    /// A string that must parse as an absolute URL.
    Url,
    /// The raw request body, untouched.
    Bytes,
    /// A multipart file part (filename + content type + bytes).
    File,
    /// JSON array of `T`.
    List(Box<FieldType>),
    /// JSON array of `T`, deduplicated preserving first-seen order.
    Set(Box<FieldType>),
    /// JSON object whose keys coerce to `K` and values to `V`.
    Map(Box<FieldType>, Box<FieldType>),
    /// Nested object validated against its own schema.
    Object(Schema),
    /// Accepted verbatim.
    Any,
}

impl FieldType {
    /// Short name used in error messages and config diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Str => "string",
            Self::Int => "integer",
            Self::Float => "float",
            Self::Bool => "boolean",
            Self::Uuid => "uuid",
            Self::DateTime => "datetime",
            Self::Time => "time",
            Self::Duration => "duration",
            Self::Url => "url",
            Self::Bytes => "bytes",
            Self::File => "file",
            Self::List(_) => "list",
            Self::Set(_) => "set",
            Self::Map(..) => "map",
            Self::Object(_) => "object",
            Self::Any => "any",
        }
    }

    /// The "empty" value an optional container defaults to when absent.
    pub(crate) fn empty_value(&self) -> Option<serde_json::Value> {
        match self {
            Self::List(_) | Self::Set(_) => Some(serde_json::Value::Array(Vec::new())),
            Self::Map(..) => Some(serde_json::json!({})),
            _ => None,
        }
    }
}

/// One declarative rule attached to a field.
///
/// Evaluated after type coercion, in declaration order: length/bounds first,
/// refinements last.
#[derive(Clone)]
pub enum Constraint {
    /// Minimum length in characters (strings) or elements (containers).
    MinLen(usize),
    /// Maximum length in characters (strings) or elements (containers).
    MaxLen(usize),
    /// Numeric lower bound, inclusive.
    Ge(f64),
    /// Numeric upper bound, inclusive.
    Le(f64),
    /// Numeric lower bound, exclusive.
    Gt(f64),
    /// Numeric upper bound, exclusive.
    Lt(f64),
    /// Custom refinement over the coerced JSON value.
    Refine(fn(&serde_json::Value) -> Result<(), String>),
}

impl std::fmt::Debug for Constraint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MinLen(n) => write!(f, "MinLen({n})"),
            Self::MaxLen(n) => write!(f, "MaxLen({n})"),
            Self::Ge(n) => write!(f, "Ge({n})"),
            Self::Le(n) => write!(f, "Le({n})"),
            Self::Gt(n) => write!(f, "Gt({n})"),
            Self::Lt(n) => write!(f, "Lt({n})"),
            Self::Refine(_) => write!(f, "Refine(..)"),
        }
    }
}

/// One field of a [`Schema`].
#[derive(Debug, Clone)]
pub struct Field {
    pub name: &'static str,
    pub ty: FieldType,
    pub required: bool,
    pub default: Option<serde_json::Value>,
    pub constraints: Vec<Constraint>,
}

impl Field {
    pub fn new(name: &'static str, ty: FieldType) -> Self {
        Self { name, ty, required: true, default: None, constraints: Vec::new() }
    }

    pub fn str(name: &'static str) -> Self {
        Self::new(name, FieldType::Str)
    }

    pub fn int(name: &'static str) -> Self {
        Self::new(name, FieldType::Int)
    }

    pub fn float(name: &'static str) -> Self {
        Self::new(name, FieldType::Float)
    }

    pub fn boolean(name: &'static str) -> Self {
        Self::new(name, FieldType::Bool)
    }

    pub fn datetime(name: &'static str) -> Self {
        Self::new(name, FieldType::DateTime)
    }

    pub fn time(name: &'static str) -> Self {
        Self::new(name, FieldType::Time)
    }

    pub fn duration(name: &'static str) -> Self {
        Self::new(name, FieldType::Duration)
    }

    pub fn url(name: &'static str) -> Self {
        Self::new(name, FieldType::Url)
    }

    pub fn list(name: &'static str, elem: FieldType) -> Self {
        Self::new(name, FieldType::List(Box::new(elem)))
    }

    pub fn set(name: &'static str, elem: FieldType) -> Self {
        Self::new(name, FieldType::Set(Box::new(elem)))
    }

    pub fn map(name: &'static str, key: FieldType, value: FieldType) -> Self {
        Self::new(name, FieldType::Map(Box::new(key), Box::new(value)))
    }

    pub fn object(name: &'static str, schema: Schema) -> Self {
        Self::new(name, FieldType::Object(schema))
    }

    /// Mark the field optional. Absent optional containers default to empty;
    /// absent optional scalars default to [`Field::default_value`] or stay
    /// absent.
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Value substituted when an optional field is absent.
    pub fn default_value(mut self, v: serde_json::Value) -> Self {
        self.default = Some(v);
        self.required = false;
        self
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

    /// Attach a custom refinement, run after all bounds/length checks.
    pub fn refine(mut self, check: fn(&serde_json::Value) -> Result<(), String>) -> Self {
        self.constraints.push(Constraint::Refine(check));
        self
    }
}

/// An ordered collection of fields describing one JSON object.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    pub fields: Vec<Field>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }
}
