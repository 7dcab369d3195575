//! Species label helpers
//!
//! Labels are short upper-case species codes. The engine itself treats labels
//! as opaque strings; the known codes are only used at ingestion time to decide
//! whether a file name carries a calibration ground truth.

use std::path::Path;

/// Species codes recognised in ingested file names
pub const KNOWN_SPECIES: [&str; 8] = ["ABL", "ALA", "ANG", "BAF", "BRE", "CHE", "HOT", "SIL"];

/// Image file extensions accepted by ingestion (lower-case)
pub const IMAGE_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

/// Whether `label` is one of the known species codes
pub fn is_known_species(label: &str) -> bool {
    KNOWN_SPECIES.contains(&label)
}

/// Whether the path has an accepted image extension (case-insensitive)
pub fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Extract a calibration label from a file name
///
/// The candidate is the upper-cased stem prefix before the first `_`
/// (`abl_0042.jpg` → `ABL`). Returns `None` unless it is a known species code.
pub fn label_from_filename(path: &Path) -> Option<String> {
    let stem = path.file_stem()?.to_str()?;
    let candidate = stem.split('_').next()?.to_ascii_uppercase();
    is_known_species(&candidate).then_some(candidate)
}

/// Normalize a submitted label, rejecting blank input
pub fn normalize_label(label: &str) -> Option<String> {
    let trimmed = label.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
