//! PostgREST query-string builder.

use std::fmt::Display;

use reqwest::Url;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Query {
    params: Vec<(String, String)>,
}

impl Default for Query {
    fn default() -> Self {
        Self::new()
    }
}

impl Query {
    /// `select=*`
    pub fn new() -> Self {
        Self::select("*")
    }

    pub fn select(columns: &str) -> Self {
        Self {
            params: vec![("select".into(), columns.into())],
        }
    }

    /// Filters only; used for PATCH and DELETE.
    pub fn filter() -> Self {
        Self { params: Vec::new() }
    }

    pub fn eq(self, column: &str, value: impl Display) -> Self {
        self.push(column, format!("eq.{value}"))
    }

    pub fn lte(self, column: &str, value: impl Display) -> Self {
        self.push(column, format!("lte.{value}"))
    }

    pub fn gte(self, column: &str, value: impl Display) -> Self {
        self.push(column, format!("gte.{value}"))
    }

    pub fn order(self, column: &str, ascending: bool) -> Self {
        let direction = if ascending { "asc" } else { "desc" };
        self.push("order", format!("{column}.{direction}"))
    }

    pub fn limit(self, n: usize) -> Self {
        self.push("limit", n.to_string())
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.params
    }

    pub fn apply(&self, url: &mut Url) {
        if self.params.is_empty() {
            return;
        }
        let mut pairs = url.query_pairs_mut();
        for (key, value) in &self.params {
            pairs.append_pair(key, value);
        }
    }

    fn push(mut self, key: &str, value: String) -> Self {
        self.params.push((key.into(), value));
        self
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Utc};

    use super::*;

    #[test]
    fn test_active_flash_event_query() {
        let now: DateTime<Utc> = "2024-05-01T12:00:00Z".parse().unwrap();
        let query = Query::new()
            .eq("is_active", true)
            .lte("started_at", now.to_rfc3339())
            .gte("ends_at", now.to_rfc3339());

        assert_eq!(
            query.pairs(),
            &[
                ("select".to_string(), "*".to_string()),
                ("is_active".to_string(), "eq.true".to_string()),
                ("started_at".to_string(), "lte.2024-05-01T12:00:00+00:00".to_string()),
                ("ends_at".to_string(), "gte.2024-05-01T12:00:00+00:00".to_string()),
            ]
        );
    }

    #[test]
    fn test_apply_encodes_values() {
        let mut url = Url::parse("https://example.test/rest/v1/tags").unwrap();
        Query::new()
            .order("created_at", false)
            .limit(50)
            .lte("created_at", "2024-05-01T12:00:00+00:00")
            .apply(&mut url);

        assert_eq!(
            url.query(),
            Some("select=*&order=created_at.desc&limit=50&created_at=lte.2024-05-01T12%3A00%3A00%2B00%3A00")
        );
    }

    #[test]
    fn test_filter_has_no_select() {
        let query = Query::filter().eq("id", "p1");
        assert_eq!(query.pairs(), &[("id".to_string(), "eq.p1".to_string())]);
    }
}
