//! Legacy thumbnail migration.
//!
//! Older versions kept every thumbnail in one settings key
//! ([`LEGACY_THUMBNAILS_KEY`](crate::platform::LEGACY_THUMBNAILS_KEY)) as a
//! map of `{ tabId, url, dataUrl, capturedAt }` entries. This module decodes
//! that blob; the store re-inserts the entries as records.

// ============================================================================
// Imports
// ============================================================================

use base64::Engine;
use base64::engine::general_purpose::STANDARD as Base64Standard;
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use crate::error::{Error, Result};
use crate::identifiers::TabId;

// ============================================================================
// LegacyEntry
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawLegacyEntry {
    #[serde(default)]
    tab_id: Option<i64>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    data_url: Option<String>,
    #[serde(default)]
    captured_at: Option<f64>,
}

/// A decoded legacy thumbnail.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct LegacyEntry {
    pub tab_id: TabId,
    pub url: String,
    pub mime_type: String,
    pub image: Vec<u8>,
    pub captured_at: Option<i64>,
}

// ============================================================================
// Decoding
// ============================================================================

/// Decodes the legacy map. Unusable entries are skipped with a warning.
///
/// # Errors
///
/// Returns [`Error::Storage`] if the value is not a JSON object.
pub(crate) fn parse_legacy(value: Value) -> Result<Vec<LegacyEntry>> {
    let Value::Object(map) = value else {
        return Err(Error::storage("migrate", "legacy thumbnails are not an object"));
    };

    let mut entries = Vec::with_capacity(map.len());
    for (key, raw) in map {
        match decode_entry(raw) {
            Ok(Some(entry)) => entries.push(entry),
            Ok(None) => {}
            Err(e) => warn!(key = %key, error = %e, "Skipping legacy thumbnail"),
        }
    }
    Ok(entries)
}

fn decode_entry(raw: Value) -> Result<Option<LegacyEntry>> {
    let raw: RawLegacyEntry = serde_json::from_value(raw)?;

    let Some(data_url) = raw.data_url.filter(|d| !d.is_empty()) else {
        return Ok(None);
    };
    let url = raw
        .url
        .filter(|u| !u.is_empty())
        .ok_or_else(|| Error::storage("migrate", "entry without url"))?;
    let tab_id = raw
        .tab_id
        .and_then(TabId::from_raw)
        .ok_or_else(|| Error::storage("migrate", "entry without valid tab id"))?;

    let (mime_type, image) = decode_data_url(&data_url)?;

    Ok(Some(LegacyEntry {
        tab_id,
        url,
        mime_type,
        image,
        captured_at: raw
            .captured_at
            .filter(|t| t.is_finite() && *t > 0.0)
            .map(|t| t as i64),
    }))
}

/// Splits a base64 `data:` URL into MIME type and bytes.
///
/// # Errors
///
/// Returns [`Error::InvalidDataUrl`] for a malformed URL and
/// [`Error::Base64`] for a bad payload.
pub(crate) fn decode_data_url(data_url: &str) -> Result<(String, Vec<u8>)> {
    let rest = data_url
        .strip_prefix("data:")
        .ok_or_else(|| Error::invalid_data_url("missing data: scheme"))?;
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| Error::invalid_data_url("missing payload separator"))?;
    let mime = header
        .strip_suffix(";base64")
        .ok_or_else(|| Error::invalid_data_url("payload is not base64"))?;

    let mime = if mime.is_empty() {
        "application/octet-stream"
    } else {
        mime
    };

    Ok((mime.to_string(), Base64Standard.decode(payload.trim())?))
}

// ============================================================================
// Tests
// ============================================================================
