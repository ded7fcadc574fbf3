//! In-memory page source.
//!
//! Holds raw store documents and evaluates [`Query`] values over them with the
//! same filter semantics as the remote store. Loads from the NDJSON format
//! produced by a dataset export (one document per line).

use std::collections::HashSet;
use std::path::Path;

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::error::{SourceError, SourceErrorKind};
use crate::query::Query;
use crate::source::PageSource;

const BACKEND: &str = "Memory";

/// In-memory document set.
#[derive(Clone, Debug, Default)]
pub struct MemorySource {
    documents: Vec<Value>,
}

impl MemorySource {
    /// Create an empty source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a source over the given documents.
    #[must_use]
    pub fn from_documents(documents: Vec<Value>) -> Self {
        Self { documents }
    }

    /// Add a document.
    #[must_use]
    pub fn with_document(mut self, document: Value) -> Self {
        self.documents.push(document);
        self
    }

    /// Load a dataset export file.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the file cannot be read or a line is not a
    /// JSON object.
    pub fn from_ndjson(path: &Path) -> Result<Self, SourceError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| SourceError::io(e).with_backend(BACKEND))?;
        let source = Self::parse_ndjson(&content)?;
        tracing::debug!(
            path = %path.display(),
            documents = source.documents.len(),
            "Loaded dataset export"
        );
        Ok(source)
    }

    /// Parse NDJSON content. Blank lines are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if a line is not a JSON object.
    pub fn parse_ndjson(content: &str) -> Result<Self, SourceError> {
        let mut documents = Vec::new();
        for (index, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let document: Value = serde_json::from_str(line).map_err(|e| {
                SourceError::new(SourceErrorKind::Other)
                    .with_backend(BACKEND)
                    .with_query(format!("line {}", index + 1))
                    .with_source(e)
            })?;
            if !document.is_object() {
                return Err(SourceError::invalid_query(format!(
                    "line {} is not a document object",
                    index + 1
                ))
                .with_backend(BACKEND));
            }
            documents.push(document);
        }
        Ok(Self { documents })
    }

    /// Number of documents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Whether the source holds no documents.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Evaluate a query synchronously.
    #[must_use]
    pub fn evaluate(&self, query: &Query) -> Vec<Value> {
        match query {
            Query::Root { document_type } => self
                .documents
                .iter()
                .filter(|doc| str_field(doc, "_type") == Some(document_type.as_str()))
                .map(|doc| {
                    json!({
                        "_id": doc.get("_id").cloned().unwrap_or(Value::Null),
                        "roots": doc.get("roots").cloned().unwrap_or(Value::Null),
                    })
                })
                .collect(),
            Query::PagesById { ids, projection } => {
                let ids: HashSet<&str> = ids.iter().map(String::as_str).collect();
                self.documents
                    .iter()
                    .filter(|doc| str_field(doc, "_id").is_some_and(|id| ids.contains(id)))
                    .map(|doc| projection.apply(doc))
                    .collect()
            }
            Query::PagesBySlug {
                slugs,
                types,
                projection,
            } => {
                let slugs: HashSet<String> = slugs.iter().map(|s| s.to_lowercase()).collect();
                self.documents
                    .iter()
                    .filter(|doc| {
                        types.is_empty()
                            || str_field(doc, "_type").is_some_and(|t| types.iter().any(|x| x == t))
                    })
                    .filter(|doc| {
                        doc.get("slug")
                            .and_then(|slug| slug.get("current"))
                            .and_then(Value::as_str)
                            .is_some_and(|slug| slugs.contains(&slug.to_lowercase()))
                    })
                    .map(|doc| projection.apply(doc))
                    .collect()
            }
        }
    }
}

fn str_field<'a>(document: &'a Value, name: &str) -> Option<&'a str> {
    document.get(name).and_then(Value::as_str)
}

#[async_trait]
impl PageSource for MemorySource {
    async fn fetch(&self, query: &Query) -> Result<Vec<Value>, SourceError> {
        let records = self.evaluate(query);
        tracing::debug!(query = query.name(), records = records.len(), "Evaluated query");
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::query::Projection;

    fn source() -> MemorySource {
        MemorySource::new()
            .with_document(json!({"_id": "sitemap", "_type": "sitemap", "roots": []}))
            .with_document(json!({"_id": "home", "_type": "page", "title": "Home", "slug": {"current": ""}}))
            .with_document(json!({"_id": "about", "_type": "page", "title": "About", "slug": {"current": "about"}}))
            .with_document(json!({"_id": "hello", "_type": "post", "title": "Hello", "slug": {"current": "hello"}}))
    }

    #[tokio::test]
    async fn test_fetch_root() {
        let records = source()
            .fetch(&Query::Root {
                document_type: "sitemap".to_owned(),
            })
            .await
            .unwrap();

        assert_eq!(records, vec![json!({"_id": "sitemap", "roots": []})]);
    }

    #[tokio::test]
    async fn test_fetch_by_id_returns_store_order_and_skips_missing() {
        let records = source()
            .fetch(&Query::PagesById {
                ids: vec!["hello".to_owned(), "nope".to_owned(), "home".to_owned()],
                projection: Projection::base(),
            })
            .await
            .unwrap();

        let ids: Vec<&str> = records.iter().filter_map(|r| r["id"].as_str()).collect();
        assert_eq!(ids, vec!["home", "hello"]);
    }

    #[test]
    fn test_slug_query_filters_types() {
        let source = source();
        let query = |types: Vec<String>| Query::PagesBySlug {
            slugs: vec!["about".to_owned(), "hello".to_owned()],
            types,
            projection: Projection::base(),
        };

        assert_eq!(source.evaluate(&query(Vec::new())).len(), 2);

        let records = source.evaluate(&query(vec!["post".to_owned()]));
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["id"], "hello");
    }

    #[test]
    fn test_slug_query_ignores_case() {
        let source = source().with_document(json!({
            "_id": "team", "_type": "page", "title": "Team", "slug": {"current": "Our-Team"}
        }));
        let query = |slug: &str| Query::PagesBySlug {
            slugs: vec![slug.to_owned()],
            types: Vec::new(),
            projection: Projection::base(),
        };

        assert_eq!(source.evaluate(&query("About"))[0]["id"], "about");
        assert_eq!(source.evaluate(&query("our-team"))[0]["id"], "team");
        assert_eq!(source.evaluate(&query("OUR-TEAM"))[0]["id"], "team");
        assert!(source.evaluate(&query("our")).is_empty());
    }

    #[test]
    fn test_from_ndjson() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"_id": "a", "_type": "page"}}"#).unwrap();
        writeln!(file).unwrap();
        writeln!(file, r#"{{"_id": "b", "_type": "page"}}"#).unwrap();

        let source = MemorySource::from_ndjson(file.path()).unwrap();
        assert_eq!(source.len(), 2);
    }

    #[test]
    fn test_from_ndjson_missing_file() {
        let err = MemorySource::from_ndjson(Path::new("/nonexistent/export.ndjson")).unwrap_err();
        assert_eq!(err.kind, SourceErrorKind::NotFound);
        assert_eq!(err.backend, Some("Memory"));
    }

    #[test]
    fn test_parse_ndjson_rejects_non_objects() {
        let err = MemorySource::parse_ndjson("{\"_id\": \"a\"}\n[1, 2]\n").unwrap_err();
        assert_eq!(err.kind, SourceErrorKind::InvalidQuery);

        let err = MemorySource::parse_ndjson("{not json").unwrap_err();
        assert!(err.downcast_source::<serde_json::Error>().is_some());
    }
}
