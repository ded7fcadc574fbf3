//! URL construction from slug chains.

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};

/// Characters left unescaped in a path segment: A-Z a-z 0-9 - _ . ! ~ * ' ( )
const SEGMENT_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Build a URL path from slugs, root-first.
///
/// Each slug is percent-encoded as a whole, so a `/` inside a slug does not
/// add a level. No slugs yields `/`.
pub fn build_url<I, S>(slugs: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut url = String::new();
    for slug in slugs {
        url.push('/');
        url.extend(utf8_percent_encode(slug.as_ref(), SEGMENT_ENCODE_SET));
    }
    if url.is_empty() {
        url.push('/');
    }
    url
}

/// Split a URL path into decoded segments, ignoring empty ones.
#[must_use]
pub fn split_url(path: &str) -> Vec<String> {
    path.split('/')
        .filter(|segment| !segment.is_empty())
        .map(|segment| percent_decode_str(segment).decode_utf8_lossy().into_owned())
        .collect()
}
