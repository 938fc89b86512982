//! Canonical JSON serialization for fingerprint preimages.
//!
//! The digest in [`super`] must be stable across processes and releases,
//! so the byte form of the preimage is pinned here rather than left to
//! whatever a serializer happens to emit:
//!
//! - object keys sorted lexicographically (by unicode scalar) at every depth
//! - no insignificant whitespace
//! - strings escaped per RFC 8259, UTF-8 encoded
//! - numbers in serde_json's shortest round-trip form
//! - `null`, `true`, `false` lowercase
//!
//! Array element order is preserved; it is significant (e.g. `stop`
//! sequences and chat message order).

use serde_json::Value;

use crate::Result;

/// Serialize a JSON value into its canonical byte form.
pub fn canonical_json(value: &Value) -> Result<String> {
    let mut out = String::new();
    write_value(&mut out, value)?;
    Ok(out)
}

fn write_value(out: &mut String, value: &Value) -> Result<()> {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(true) => out.push_str("true"),
        Value::Bool(false) => out.push_str("false"),
        // serde_json renders integers exactly and floats via ryu, which
        // is the shortest representation that round-trips.
        Value::Number(n) => out.push_str(&n.to_string()),
        Value::String(s) => out.push_str(&serde_json::to_string(s)?),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_value(out, item)?;
            }
            out.push(']');
        }
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort_unstable();
            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&serde_json::to_string(key)?);
                out.push(':');
                write_value(out, &map[key.as_str()])?;
            }
            out.push('}');
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn keys_sort_at_every_depth() {
        let value = json!({"b": {"z": 1, "a": 2}, "a": [{"role": "user", "content": "x"}]});
        assert_eq!(
            canonical_json(&value).unwrap(),
            r#"{"a":[{"content":"x","role":"user"}],"b":{"a":2,"z":1}}"#
        );
    }

    #[test]
    fn no_whitespace_and_lowercase_literals() {
        let value = json!({"flag": true, "missing": null, "off": false});
        assert_eq!(
            canonical_json(&value).unwrap(),
            r#"{"flag":true,"missing":null,"off":false}"#
        );
    }

    #[test]
    fn numbers_round_trip_shortest() {
        let value = json!({"t": 0.0, "k": 10, "p": 0.95});
        assert_eq!(canonical_json(&value).unwrap(), r#"{"k":10,"p":0.95,"t":0.0}"#);
    }

    #[test]
    fn integers_and_floats_stay_distinct() {
        let int = canonical_json(&json!({"v": 1})).unwrap();
        let float = canonical_json(&json!({"v": 1.0})).unwrap();
        assert_ne!(int, float);
    }

    #[test]
    fn string_escaping_is_json_standard() {
        let value = json!({"s": "line\nbreak \"quoted\""});
        assert_eq!(
            canonical_json(&value).unwrap(),
            r#"{"s":"line\nbreak \"quoted\""}"#
        );
    }

    #[test]
    fn array_order_is_preserved() {
        let a = canonical_json(&json!(["x", "y"])).unwrap();
        let b = canonical_json(&json!(["y", "x"])).unwrap();
        assert_ne!(a, b);
    }
}
