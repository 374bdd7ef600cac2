//! Numeric normalization for payloads read back from storage.
//!
//! Durable stores and transport encodings tend to widen numbers into
//! fixed-point or floating forms: a worker that reported `3` can come
//! back as `3.0` after a round trip. Feeding that drift back into the
//! planner conversation makes history diverge between activations, so
//! every payload is normalized exactly once at the read boundary,
//! before it re-enters the conversation.
//!
//! Rules: a float whose value is whole (and fits `i64`) becomes an
//! integer; every other number is left alone; arrays and objects are
//! normalized recursively. The function is idempotent.

use serde_json::{Number, Value};

/// Recursively normalize numbers in a JSON value.
#[must_use]
pub fn normalize_numbers(value: Value) -> Value {
    match value {
        Value::Number(n) => Value::Number(normalize_number(n)),
        Value::Array(items) => {
            Value::Array(items.into_iter().map(normalize_numbers).collect())
        }
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (k, normalize_numbers(v)))
                .collect(),
        ),
        other @ (Value::Null | Value::Bool(_) | Value::String(_)) => other,
    }
}

fn normalize_number(n: Number) -> Number {
    if n.is_f64() {
        if let Some(f) = n.as_f64() {
            // `as` truncation is safe inside the i64-representable range.
            #[allow(clippy::cast_possible_truncation)]
            if f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64 {
                return Number::from(f as i64);
            }
        }
    }
    n
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn whole_float_becomes_integer() {
        let out = normalize_numbers(json!(3.0));
        assert_eq!(out, json!(3));
        assert!(out.is_i64());
    }

    #[test]
    fn fractional_float_stays_float() {
        let out = normalize_numbers(json!(2.5));
        assert_eq!(out, json!(2.5));
        assert!(out.is_f64());
    }

    #[test]
    fn integers_unchanged() {
        assert_eq!(normalize_numbers(json!(42)), json!(42));
        assert_eq!(normalize_numbers(json!(-7)), json!(-7));
    }

    #[test]
    fn recurses_into_objects_and_arrays() {
        let out = normalize_numbers(json!({
            "count": 4.0,
            "price": 9.99,
            "items": [1.0, 2.5, {"qty": 12.0}],
        }));
        assert_eq!(
            out,
            json!({
                "count": 4,
                "price": 9.99,
                "items": [1, 2.5, {"qty": 12}],
            })
        );
        assert!(out["count"].is_i64());
        assert!(out["items"][2]["qty"].is_i64());
    }

    #[test]
    fn non_numbers_untouched() {
        let input = json!({"s": "3.0", "b": true, "n": null});
        assert_eq!(normalize_numbers(input.clone()), input);
    }

    #[test]
    fn idempotent() {
        let input = json!({"a": 3.0, "b": [1.5, 2.0], "c": {"d": -4.0}});
        let once = normalize_numbers(input);
        let twice = normalize_numbers(once.clone());
        assert_eq!(twice, once);
    }

    #[test]
    fn huge_float_left_alone() {
        let huge = 1e300;
        let out = normalize_numbers(json!(huge));
        assert_eq!(out, json!(huge));
    }
}
