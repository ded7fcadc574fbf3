//! Queries issued against a page source.
//!
//! Page queries always project the same four fields, plus any extra top-level
//! fields the caller declared:
//!
//! ```text
//! { "id": _id, "type": _type, "slug": slug.current, title, <extra...> }
//! ```

use std::collections::BTreeSet;

use serde_json::{Value, json};

use crate::error::SourceError;

/// Output keys every page projection produces.
const BASE_FIELDS: [&str; 4] = ["id", "type", "slug", "title"];

/// Extra top-level document fields to include in page records.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Projection {
    fields: Vec<String>,
}

impl Projection {
    /// Projection of the base fields only.
    #[must_use]
    pub fn base() -> Self {
        Self::default()
    }

    /// Projection with extra top-level fields.
    ///
    /// Duplicates are dropped.
    ///
    /// # Errors
    ///
    /// Returns an invalid query error if a name is not a plain identifier or
    /// collides with one of the base output keys.
    pub fn new<I, S>(fields: I) -> Result<Self, SourceError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut projection = Self::default();
        for field in fields {
            let field = field.into();
            if !is_identifier(&field) {
                return Err(SourceError::invalid_query(format!(
                    "projection field {field:?} is not an identifier"
                )));
            }
            if BASE_FIELDS.contains(&field.as_str()) {
                return Err(SourceError::invalid_query(format!(
                    "projection field {field:?} is always included"
                )));
            }
            if !projection.fields.contains(&field) {
                projection.fields.push(field);
            }
        }
        Ok(projection)
    }

    /// Extra fields in declaration order.
    #[must_use]
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Render the GROQ projection block.
    #[must_use]
    pub fn groq(&self) -> String {
        let mut out = String::from(r#"{ "id": _id, "type": _type, "slug": slug.current, title"#);
        for field in &self.fields {
            out.push_str(", ");
            out.push_str(field);
        }
        out.push_str(" }");
        out
    }

    /// Project a raw document into a page record.
    ///
    /// Missing fields project as `null`.
    #[must_use]
    pub fn apply(&self, document: &Value) -> Value {
        let field = |name: &str| document.get(name).cloned().unwrap_or(Value::Null);
        let slug = document
            .get("slug")
            .and_then(|slug| slug.get("current"))
            .cloned()
            .unwrap_or(Value::Null);

        let mut record = serde_json::Map::new();
        record.insert("id".to_owned(), field("_id"));
        record.insert("type".to_owned(), field("_type"));
        record.insert("slug".to_owned(), slug);
        record.insert("title".to_owned(), field("title"));
        for name in &self.fields {
            record.insert(name.clone(), field(name));
        }
        Value::Object(record)
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// A query understood by every [`PageSource`](crate::PageSource).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Query {
    /// Sitemap root documents of a type, projected as `{ _id, roots }`.
    Root {
        /// Sitemap document type.
        document_type: String,
    },
    /// Pages by document id.
    PagesById {
        /// Requested ids.
        ids: Vec<String>,
        /// Fields to project.
        projection: Projection,
    },
    /// Pages whose slug equals one of `slugs` ignoring case, optionally
    /// restricted to content types.
    PagesBySlug {
        /// Requested slugs.
        slugs: Vec<String>,
        /// Allowed content types; empty means any type.
        types: Vec<String>,
        /// Fields to project.
        projection: Projection,
    },
}

impl Query {
    /// Render the query as a GROQ string and its parameters.
    #[must_use]
    pub fn groq(&self) -> (String, Value) {
        match self {
            Self::Root { document_type } => (
                "*[_type == $type]{ _id, roots }".to_owned(),
                json!({ "type": document_type }),
            ),
            Self::PagesById { ids, projection } => (
                format!("*[_id in $ids]{}", projection.groq()),
                json!({ "ids": ids }),
            ),
            Self::PagesBySlug {
                slugs,
                types,
                projection,
            } => {
                let slugs: BTreeSet<String> = slugs.iter().map(|s| s.to_lowercase()).collect();
                if types.is_empty() {
                    (
                        format!("*[lower(slug.current) in $slugs]{}", projection.groq()),
                        json!({ "slugs": slugs }),
                    )
                } else {
                    (
                        format!(
                            "*[_type in $types && lower(slug.current) in $slugs]{}",
                            projection.groq()
                        ),
                        json!({ "slugs": slugs, "types": types }),
                    )
                }
            }
        }
    }

    /// Short name for log fields.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Root { .. } => "root",
            Self::PagesById { .. } => "pages_by_id",
            Self::PagesBySlug { .. } => "pages_by_slug",
        }
    }
}
