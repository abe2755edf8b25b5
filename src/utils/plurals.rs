pub fn pluralize(count: usize, singular: &str, plural: Option<&str>) -> String {
    if count == 1 {
        return singular.to_string();
    }

    match plural {
        Some(p) => p.to_string(),
        None => format!("{singular}s"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pluralizes_everything_but_one() {
        assert_eq!(pluralize(0, "row", None), "rows");
        assert_eq!(pluralize(1, "row", None), "row");
        assert_eq!(pluralize(2, "query", Some("queries")), "queries");
    }
}
