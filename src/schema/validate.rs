//! The generic validation walker.
//!
//! One function, [`validate_value`], evaluates any [`FieldType`] tree against
//! a parsed JSON value, pushing [`Violation`]s into a capped [`Collector`]
//! and returning the normalized value (set dedup applied, scalars coerced,
//! map keys canonicalized). Batch collection: a failing field never stops
//! its siblings from being checked.

use serde_json::Value;

use crate::error::{ValidationError, Violation};

use super::coerce::coerce_scalar;
use super::{Constraint, FieldType, Schema};

/// Accumulates violations up to a cap. Pushes past the cap are counted only
/// through the `truncated` flag.
pub(crate) struct Collector {
    err: ValidationError,
    cap: usize,
}

impl Collector {
    pub(crate) fn new(cap: usize) -> Self {
        Self { err: ValidationError::default(), cap }
    }

    pub(crate) fn push(&mut self, field: impl Into<String>, reason: impl Into<String>) {
        if self.err.violations.len() >= self.cap {
            self.err.truncated = true;
            return;
        }
        self.err.violations.push(Violation { field: field.into(), reason: reason.into() });
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.err.is_empty()
    }

    pub(crate) fn finish(self) -> ValidationError {
        self.err
    }
}

/// Validate `value` against `ty` + `constraints`, recording problems under
/// the dotted `path`. Returns the normalized value when the node itself was
/// type-correct (constraint failures are recorded but still return the
/// coerced value so sibling checks can proceed).
pub fn validate_value(
    value: &Value,
    ty: &FieldType,
    constraints: &[Constraint],
    path: &str,
    collector: &mut Collector,
) -> Option<Value> {
    let normalized = match ty {
        FieldType::List(elem) => validate_array(value, elem, path, collector, false)?,
        FieldType::Set(elem) => validate_array(value, elem, path, collector, true)?,
        FieldType::Map(key, val) => validate_map(value, key, val, path, collector)?,
        FieldType::Object(schema) => validate_object(value, schema, path, collector)?,
        FieldType::Bytes | FieldType::File => {
            collector.push(path, format!("{} values cannot appear in a JSON body", ty.name()));
            return None;
        }
        scalar => match coerce_scalar(value, scalar) {
            Ok(v) => v,
            Err(reason) => {
                collector.push(path, reason);
                return None;
            }
        },
    };
    check_constraints(&normalized, constraints, path, collector);
    Some(normalized)
}

fn validate_array(
    value: &Value,
    elem: &FieldType,
    path: &str,
    collector: &mut Collector,
    dedup: bool,
) -> Option<Value> {
    let items = match value.as_array() {
        Some(items) => items,
        None => {
            collector.push(path, "expected a list");
            return None;
        }
    };
    let mut out = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        if let Some(v) = validate_value(item, elem, &[], &format!("{path}[{i}]"), collector) {
            // First-seen order wins for sets; later duplicates vanish.
            if !dedup || !out.contains(&v) {
                out.push(v);
            }
        }
    }
    Some(Value::Array(out))
}

fn validate_map(
    value: &Value,
    key_ty: &FieldType,
    val_ty: &FieldType,
    path: &str,
    collector: &mut Collector,
) -> Option<Value> {
    let entries = match value.as_object() {
        Some(m) => m,
        None => {
            collector.push(path, "expected an object");
            return None;
        }
    };
    let mut out = serde_json::Map::with_capacity(entries.len());
    for (key, val) in entries {
        let entry_path = format!("{path}.{key}");
        // JSON object keys are strings on the wire; coerce them through the
        // declared key type and keep the canonical rendering.
        let canonical_key = match coerce_scalar(&Value::String(key.clone()), key_ty) {
            Ok(Value::String(s)) => s,
            Ok(other) => other.to_string(),
            Err(reason) => {
                collector.push(&entry_path, format!("invalid key: {reason}"));
                continue;
            }
        };
        if let Some(v) = validate_value(val, val_ty, &[], &entry_path, collector) {
            out.insert(canonical_key, v);
        }
    }
    Some(Value::Object(out))
}

fn validate_object(
    value: &Value,
    schema: &Schema,
    path: &str,
    collector: &mut Collector,
) -> Option<Value> {
    let entries = match value.as_object() {
        Some(m) => m,
        None => {
            collector.push(path, "expected an object");
            return None;
        }
    };
    let mut out = serde_json::Map::with_capacity(schema.fields.len());
    for field in &schema.fields {
        let field_path = format!("{path}.{}", field.name);
        match entries.get(field.name) {
            Some(Value::Null) | None => {
                if field.required {
                    collector.push(&field_path, "field is required");
                } else if let Some(default) = &field.default {
                    out.insert(field.name.to_owned(), default.clone());
                } else if let Some(empty) = field.ty.empty_value() {
                    out.insert(field.name.to_owned(), empty);
                } else if entries.contains_key(field.name) {
                    out.insert(field.name.to_owned(), Value::Null);
                }
            }
            Some(raw) => {
                if let Some(v) =
                    validate_value(raw, &field.ty, &field.constraints, &field_path, collector)
                {
                    out.insert(field.name.to_owned(), v);
                }
            }
        }
    }
    // Unknown keys pass through untouched so handlers can opt in to them.
    for (key, val) in entries {
        if !out.contains_key(key) && !schema.fields.iter().any(|f| f.name == key) {
            out.insert(key.clone(), val.clone());
        }
    }
    Some(Value::Object(out))
}

/// Apply constraint descriptors to a normalized value: length and numeric
/// bounds first, refinements after.
pub(crate) fn check_constraints(
    value: &Value,
    constraints: &[Constraint],
    path: &str,
    collector: &mut Collector,
) {
    let mut refinements = Vec::new();
    for constraint in constraints {
        match constraint {
            Constraint::MinLen(n) => {
                if let Some(len) = length_of(value) {
                    if len < *n {
                        collector.push(path, format!("length must be at least {n}"));
                    }
                }
            }
            Constraint::MaxLen(n) => {
                if let Some(len) = length_of(value) {
                    if len > *n {
                        collector.push(path, format!("length must be at most {n}"));
                    }
                }
            }
            Constraint::Ge(n) => bound(value, path, collector, |v| v >= *n, || {
                format!("must be greater than or equal to {n}")
            }),
            Constraint::Le(n) => bound(value, path, collector, |v| v <= *n, || {
                format!("must be less than or equal to {n}")
            }),
            Constraint::Gt(n) => bound(value, path, collector, |v| v > *n, || {
                format!("must be greater than {n}")
            }),
            Constraint::Lt(n) => bound(value, path, collector, |v| v < *n, || {
                format!("must be less than {n}")
            }),
            Constraint::Refine(check) => refinements.push(check),
        }
    }
    for check in refinements {
        if let Err(reason) = check(value) {
            collector.push(path, reason);
        }
    }
}

fn length_of(value: &Value) -> Option<usize> {
    match value {
        Value::String(s) => Some(s.chars().count()),
        Value::Array(a) => Some(a.len()),
        Value::Object(m) => Some(m.len()),
        _ => None,
    }
}

fn bound(
    value: &Value,
    path: &str,
    collector: &mut Collector,
    ok: impl Fn(f64) -> bool,
    reason: impl Fn() -> String,
) {
    if let Some(n) = value.as_f64() {
        if !ok(n) {
            collector.push(path, reason());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Field;
    use serde_json::json;

    fn run(value: &Value, ty: &FieldType) -> (Option<Value>, ValidationError) {
        let mut c = Collector::new(16);
        let out = validate_value(value, ty, &[], "body", &mut c);
        (out, c.finish())
    }

    #[test]
    fn set_dedups_preserving_first_seen_order() {
        let ty = FieldType::Set(Box::new(FieldType::Str));
        let (out, err) = run(&json!(["rock", "metal", "rock", "jazz", "metal"]), &ty);
        assert!(err.is_empty());
        assert_eq!(out.unwrap(), json!(["rock", "metal", "jazz"]));
    }

    #[test]
    fn map_keys_round_trip_through_the_key_type() {
        let ty = FieldType::Map(Box::new(FieldType::Int), Box::new(FieldType::Float));
        let (out, err) = run(&json!({"1": 2.5, "2": "3"}), &ty);
        assert!(err.is_empty());
        assert_eq!(out.unwrap(), json!({"1": 2.5, "2": 3.0}));

        let (_, err) = run(&json!({"one": 2.5}), &ty);
        assert_eq!(err.violations[0].field, "body.one");
    }

    #[test]
    fn nested_paths_point_at_the_failing_field() {
        let image = Schema::new()
            .field(Field::url("url"))
            .field(Field::str("name"));
        let ty = FieldType::Object(
            Schema::new().field(Field::list("images", FieldType::Object(image))),
        );
        let (_, err) = run(
            &json!({"images": [{"url": "https://ok.example/a.png", "name": "a"},
                               {"url": "nope", "name": "b"}]}),
            &ty,
        );
        assert_eq!(err.violations.len(), 1);
        assert_eq!(err.violations[0].field, "body.images[1].url");
    }

    #[test]
    fn missing_required_field_is_reported_and_siblings_still_checked() {
        let ty = FieldType::Object(
            Schema::new()
                .field(Field::str("name").min_len(3))
                .field(Field::float("price").gt(0.0)),
        );
        let (_, err) = run(&json!({"price": -1}), &ty);
        let fields: Vec<_> = err.violations.iter().map(|v| v.field.as_str()).collect();
        assert_eq!(fields, vec!["body.name", "body.price"]);
    }

    #[test]
    fn optional_container_defaults_to_empty() {
        let ty = FieldType::Object(
            Schema::new()
                .field(Field::str("name"))
                .field(Field::set("tags", FieldType::Str).optional()),
        );
        let (out, err) = run(&json!({"name": "x"}), &ty);
        assert!(err.is_empty());
        assert_eq!(out.unwrap()["tags"], json!([]));
    }

    #[test]
    fn declared_default_is_substituted_when_absent() {
        let ty = FieldType::Object(
            Schema::new().field(Field::float("tax").default_value(json!(0.0))),
        );
        let (out, _) = run(&json!({}), &ty);
        assert_eq!(out.unwrap()["tax"], json!(0.0));
    }

    #[test]
    fn violations_are_batched_and_capped() {
        let mut c = Collector::new(2);
        let ty = FieldType::List(Box::new(FieldType::Int));
        validate_value(&json!(["a", "b", "c", "d"]), &ty, &[], "body", &mut c);
        let err = c.finish();
        assert_eq!(err.violations.len(), 2);
        assert!(err.truncated);
    }

    #[test]
    fn bounds_run_in_declared_order_before_refinements() {
        let field = Field::int("n").ge(1.0).refine(|v| {
            if v.as_i64() == Some(13) {
                Err("unlucky".into())
            } else {
                Ok(())
            }
        });
        let ty = FieldType::Object(Schema::new().field(field));
        let (_, err) = run(&json!({"n": 13}), &ty);
        assert_eq!(err.violations[0].reason, "unlucky");
        let (_, err) = run(&json!({"n": 0}), &ty);
        assert_eq!(err.violations[0].reason, "must be greater than or equal to 1");
    }
}
