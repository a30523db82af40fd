//! Map embed URL construction for selected locations.

use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};

use crate::places::LocationEntry;

const EMBED_BASE_URL: &str = "https://www.google.com/maps/embed/v1/place";

/// Build the embeddable map URL centred on `location`.
///
/// Returns `None` when no key is configured; callers show coordinates only.
#[must_use]
pub fn embed_url(api_key: Option<&str>, location: &LocationEntry) -> Option<String> {
    let key = api_key.filter(|k| !k.is_empty())?;
    Some(format!(
        "{EMBED_BASE_URL}?key={}&q={},{}",
        utf8_percent_encode(key, NON_ALPHANUMERIC),
        location.latitude(),
        location.longitude()
    ))
}
