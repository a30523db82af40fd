//! Best-effort extraction of places from model output.
//!
//! The reply is unstructured text that usually follows the requested
//! `Name:` / `Location:` block format. Extraction is tolerant: labels may sit
//! anywhere in a line, coordinates may be wrapped in prose, and blocks that do
//! not yield a coordinate pair are dropped instead of failing the whole reply.

use std::sync::LazyLock;

use regex::Regex;
use tripdash_core::{LocationEntry, PlaceCandidate};

/// Separator line between place blocks.
pub const BLOCK_DELIMITER: &str = "---";

const NAME_LABEL: &str = "Name:";
const LOCATION_LABEL: &str = "Location:";

/// First decimal number, then the next decimal number later on the line.
/// Signs are not captured.
static COORDINATE_PAIR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([0-9]+\.[0-9]+).*?([0-9]+\.[0-9]+)").expect("valid coordinate regex")
});

/// Extract every place with a usable coordinate pair, in block order.
///
/// Never fails. An empty result means "no locations found".
#[must_use]
pub fn extract_locations(text: &str) -> Vec<LocationEntry> {
    text.split(BLOCK_DELIMITER)
        .enumerate()
        .filter_map(|(index, block)| {
            let Some(candidate) = parse_block(block) else {
                if !block.trim().is_empty() {
                    tracing::debug!(block = index, "no coordinate pair in place block");
                }
                return None;
            };
            match LocationEntry::try_from(candidate) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    tracing::debug!(block = index, error = %e, "dropping place block");
                    None
                }
            }
        })
        .collect()
}

/// Parse one block into a candidate. `None` when the block has no
/// `Location:` line or that line holds no decimal pair.
///
/// Only the first line carrying each label is consulted.
#[must_use]
pub fn parse_block(block: &str) -> Option<PlaceCandidate> {
    let name = block
        .lines()
        .find(|line| line.contains(NAME_LABEL))
        .and_then(|line| line.split(NAME_LABEL).nth(1))
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string);

    let location_line = block.lines().find(|line| line.contains(LOCATION_LABEL))?;
    let caps = COORDINATE_PAIR_RE.captures(location_line)?;
    let latitude: f64 = caps[1].parse().ok()?;
    let longitude: f64 = caps[2].parse().ok()?;

    Some(PlaceCandidate {
        name,
        latitude,
        longitude,
    })
}

#[cfg(test)]
#[path = "parse_test.rs"]
mod tests;
