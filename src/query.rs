use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::{Serializer, Value};

/// Partition keys listed under `rows.discourse_part`.
pub fn discourse_parts(query: &Value) -> Result<Vec<Value>> {
    let rows = query
        .get("rows")
        .ok_or_else(|| anyhow!("query has no `rows` section"))?;
    rows.get("discourse_part")
        .and_then(Value::as_array)
        .cloned()
        .ok_or_else(|| anyhow!("query has no `rows.discourse_part` list to split on"))
}

/// Copy of `query` restricted to a single discourse part.
pub fn with_single_part(query: &Value, part: &Value) -> Result<Value> {
    let mut narrowed = query.clone();
    let rows = narrowed
        .get_mut("rows")
        .and_then(Value::as_object_mut)
        .ok_or_else(|| anyhow!("query has no `rows` section"))?;
    rows.insert(
        "discourse_part".to_string(),
        Value::Array(vec![part.clone()]),
    );
    Ok(narrowed)
}

/// Pretty JSON with four-space indentation.
pub fn render_query(query: &Value) -> Result<String> {
    let mut buf = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut serializer = Serializer::with_formatter(&mut buf, formatter);
    query
        .serialize(&mut serializer)
        .context("failed to render query")?;
    String::from_utf8(buf).context("rendered query is not UTF-8")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn query() -> Value {
        json!({
            "database": "discoursedb_ext_cmu",
            "rows": {
                "discourse_part": [{"dpid": 1}, {"dpid": 2}],
                "annotations": ["topic"]
            },
            "columns": {"text": true}
        })
    }

    #[test]
    fn discourse_parts_in_query_order() {
        let parts = discourse_parts(&query()).unwrap();
        assert_eq!(parts, vec![json!({"dpid": 1}), json!({"dpid": 2})]);
    }

    #[test]
    fn discourse_parts_requires_a_list() {
        assert!(discourse_parts(&json!({"rows": {}})).is_err());
        assert!(discourse_parts(&json!({"rows": {"discourse_part": "x"}})).is_err());
        assert!(discourse_parts(&json!({})).is_err());
    }

    #[test]
    fn with_single_part_touches_only_discourse_part() {
        let original = query();
        let narrowed = with_single_part(&original, &json!({"dpid": 2})).unwrap();

        assert_eq!(narrowed["rows"]["discourse_part"], json!([{"dpid": 2}]));
        assert_eq!(narrowed["rows"]["annotations"], original["rows"]["annotations"]);
        assert_eq!(narrowed["columns"], original["columns"]);
        assert_eq!(narrowed["database"], original["database"]);
        assert_eq!(original["rows"]["discourse_part"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn render_query_uses_four_spaces() {
        let rendered = render_query(&json!({"rows": {"a": 1}})).unwrap();
        assert_eq!(rendered, "{\n    \"rows\": {\n        \"a\": 1\n    }\n}");
    }
}
