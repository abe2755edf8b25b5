use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::http::{parse_json, Payload};

/// A named selection saved through the browser UI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedQuery {
    #[serde(rename = "propName")]
    pub name: String,
    /// The query definition, itself JSON-encoded
    #[serde(rename = "propValue")]
    pub literal: String,
}

impl SavedQuery {
    /// Database named inside the encoded definition, if it decodes.
    pub fn database(&self) -> Option<String> {
        let value: Value = serde_json::from_str(&self.literal).ok()?;
        value.get("database")?.as_str().map(str::to_string)
    }
}

/// Decodes a `prop_list` body; anything that is not a list of entries comes back raw.
pub fn parse_catalog(body: String) -> Payload<Vec<SavedQuery>> {
    parse_json(body)
}

/// Names visible under `scope`, in catalog order.
pub fn filter_names(entries: &[SavedQuery], scope: Option<&str>) -> Vec<String> {
    entries
        .iter()
        .filter(|entry| match scope {
            None => true,
            Some(scope) => match entry.database() {
                Some(database) => database == scope,
                None => {
                    debug!(query = %entry.name, "saved query has no readable database");
                    false
                }
            },
        })
        .map(|entry| entry.name.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const CATALOG: &str = r#"[{"propName":"q1","propValue":"{\"database\":\"db1\",\"rows\":{}}"}, {"propName":"q2","propValue":"{\"database\":\"db2\",\"rows\":{}}"}]"#;

    fn entries() -> Vec<SavedQuery> {
        match parse_catalog(CATALOG.to_string()) {
            Payload::Parsed(entries) => entries,
            Payload::Raw(body) => panic!("catalog did not parse: {body}"),
        }
    }

    #[test]
    fn scope_selects_matching_database() {
        assert_eq!(filter_names(&entries(), Some("db1")), vec!["q1"]);
        assert_eq!(filter_names(&entries(), Some("db2")), vec!["q2"]);
        assert!(filter_names(&entries(), Some("db3")).is_empty());
    }

    #[test]
    fn no_scope_lists_everything_in_order() {
        assert_eq!(filter_names(&entries(), None), vec!["q1", "q2"]);
    }

    #[test]
    fn unreadable_metadata_is_skipped_only_when_scoped() {
        let mut entries = entries();
        entries.insert(
            0,
            SavedQuery {
                name: "broken".into(),
                literal: "not json".into(),
            },
        );
        assert_eq!(filter_names(&entries, Some("db1")), vec!["q1"]);
        assert_eq!(filter_names(&entries, None), vec!["broken", "q1", "q2"]);
    }

    #[test]
    fn html_error_page_comes_back_raw() {
        let body = "<html>Service Unavailable</html>".to_string();
        assert_eq!(parse_catalog(body.clone()), Payload::Raw(body));
    }

    #[test]
    fn json_of_the_wrong_shape_comes_back_raw() {
        let body = r#"{"error":"denied"}"#.to_string();
        assert_eq!(parse_catalog(body.clone()), Payload::Raw(body));
    }

    #[test]
    fn database_reads_encoded_definition() {
        let entry = &entries()[1];
        assert_eq!(entry.database().as_deref(), Some("db2"));
    }
}
