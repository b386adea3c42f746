//! Persisted thumbnail records.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as Base64Standard;
use serde::Serialize;

use crate::capture::CaptureKind;
use crate::identifiers::{RecordId, TabId, WindowId};

// ============================================================================
// ThumbnailRecord
// ============================================================================

/// A normalized capture as stored. Records are never mutated after insert.
#[derive(Clone, PartialEq)]
pub struct ThumbnailRecord {
    /// Auto-assigned identity.
    pub id: RecordId,
    /// Captured tab.
    pub tab_id: TabId,
    /// Window the tab was captured in ([`WindowId::NONE`] for migrated data).
    pub window_id: WindowId,
    /// Page URL.
    pub url: String,
    /// Capture kind.
    pub kind: CaptureKind,
    /// Encoded image.
    pub image: Vec<u8>,
    /// MIME type of `image`.
    pub mime_type: String,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Device pixel ratio.
    pub dpr: f32,
    /// Capture time, epoch milliseconds.
    pub captured_at: i64,
}

impl ThumbnailRecord {
    /// Encodes the image as a `data:` URL for direct use in an `<img>`.
    #[must_use]
    pub fn to_data_url(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.mime_type,
            Base64Standard.encode(&self.image)
        )
    }

    /// Returns the image payload size in bytes.
    #[inline]
    #[must_use]
    pub fn size(&self) -> usize {
        self.image.len()
    }
}

impl fmt::Debug for ThumbnailRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThumbnailRecord")
            .field("id", &self.id)
            .field("tab_id", &self.tab_id)
            .field("window_id", &self.window_id)
            .field("url", &self.url)
            .field("kind", &self.kind)
            .field("image_len", &self.image.len())
            .field("mime_type", &self.mime_type)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("captured_at", &self.captured_at)
            .finish()
    }
}

// ============================================================================
// NewThumbnail
// ============================================================================

/// A record about to be inserted.
#[derive(Debug, Clone)]
pub(crate) struct NewThumbnail {
    pub tab_id: TabId,
    pub window_id: WindowId,
    pub url: String,
    pub kind: CaptureKind,
    pub image: Vec<u8>,
    pub mime_type: String,
    pub width: u32,
    pub height: u32,
    pub dpr: f32,
    pub captured_at: i64,
}

impl NewThumbnail {
    pub fn into_record(self, id: RecordId) -> ThumbnailRecord {
        ThumbnailRecord {
            id,
            tab_id: self.tab_id,
            window_id: self.window_id,
            url: self.url,
            kind: self.kind,
            image: self.image,
            mime_type: self.mime_type,
            width: self.width,
            height: self.height,
            dpr: self.dpr,
            captured_at: self.captured_at,
        }
    }
}

// ============================================================================
// StoreStats
// ============================================================================

/// Store usage summary for the cache management UI.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreStats {
    /// Number of persisted records.
    pub count: u64,
    /// Sum of stored image sizes in bytes.
    pub total_bytes: u64,
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_url() {
        let record = NewThumbnail {
            tab_id: TabId::new(1),
            window_id: WindowId::NONE,
            url: "https://example.com".to_string(),
            kind: CaptureKind::Final,
            image: vec![0xff, 0xd8, 0xff],
            mime_type: "image/jpeg".to_string(),
            width: 800,
            height: 500,
            dpr: 1.0,
            captured_at: 1,
        }
        .into_record(RecordId::new(3));

        assert_eq!(record.to_data_url(), "data:image/jpeg;base64,/9j/");
        assert_eq!(record.size(), 3);
    }

    #[test]
    fn test_stats_serialize_camel_case() {
        let stats = StoreStats {
            count: 2,
            total_bytes: 10,
        };
        let json = serde_json::to_string(&stats).expect("serialize");
        assert_eq!(json, r#"{"count":2,"totalBytes":10}"#);
    }
}
