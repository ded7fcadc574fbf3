//! Page records as projected by the page source.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use sitemap_tree::PageId;

/// Default extra-field payload: every non-base field of the record.
pub type ExtraFields = serde_json::Map<String, serde_json::Value>;

/// Caller-declared extra fields carried by a [`Page`].
///
/// Blanket-implemented for every owned deserializable type that can be
/// shared across threads.
pub trait PageFields: DeserializeOwned + Send + Sync + 'static {}

impl<T: DeserializeOwned + Send + Sync + 'static> PageFields for T {}

/// Denormalized projection of a content document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Page<E = ExtraFields> {
    /// Document id.
    pub id: PageId,
    /// Content type.
    #[serde(rename = "type", default, deserialize_with = "null_as_empty")]
    pub page_type: String,
    /// URL slug. The home page usually has an empty slug.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub slug: String,
    /// Display title.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub title: String,
    /// Additional projected fields.
    #[serde(flatten)]
    pub extra: E,
}

fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

impl<E> Page<E> {
    /// Whether the slug matches `segment`, ignoring case.
    #[must_use]
    pub fn slug_matches(&self, segment: &str) -> bool {
        self.slug.to_lowercase() == segment.to_lowercase()
    }
}
