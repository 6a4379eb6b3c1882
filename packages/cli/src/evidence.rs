//! Loading defect photographs from disk.
//!
//! The CLI stands in for a device camera: a photograph is a file path. A
//! path that cannot be read, or that is not an image, counts as a
//! cancelled capture and leaves the form untouched.

use std::path::Path;

use roadworthy_inspection_models::EvidenceImage;

/// MIME type for an image file, judged by extension. `None` if the
/// extension is missing or not a supported image format.
#[must_use]
pub fn mime_type_for(path: &Path) -> Option<&'static str> {
    match path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("jpg" | "jpeg") => Some("image/jpeg"),
        Some("png") => Some("image/png"),
        Some("webp") => Some("image/webp"),
        Some("gif") => Some("image/gif"),
        _ => None,
    }
}

/// Reads a photograph, or returns `None` (with a warning) if it is not a
/// supported image type, cannot be read, or is empty.
#[must_use]
pub fn load_evidence(path: &Path) -> Option<EvidenceImage> {
    let Some(mime_type) = mime_type_for(path) else {
        log::warn!("Ignoring {}: not a jpg/png/webp/gif image", path.display());
        return None;
    };

    match std::fs::read(path) {
        Ok(bytes) if bytes.is_empty() => {
            log::warn!("Ignoring empty photograph {}", path.display());
            None
        }
        Ok(bytes) => {
            log::debug!("Loaded {} byte photograph {}", bytes.len(), path.display());
            Some(EvidenceImage::new(mime_type, bytes))
        }
        Err(e) => {
            log::warn!("Could not read photograph {}: {e}", path.display());
            None
        }
    }
}
