use chrono::{DateTime, Utc};
use std::path::Path;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d-%H%M%S";

/// Build a staging object name that is unlikely to collide with earlier uploads.
///
/// `dir/name.ext` becomes `name-YYYY-MM-DD-HHMMSS.ext` for the given UTC time.
/// Only the final path component is used. Two uploads of the same file within
/// one second produce the same name.
pub fn object_name(path: &Path, now: DateTime<Utc>) -> String {
    let stamp = now.format(TIMESTAMP_FORMAT);
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    match path.extension() {
        Some(ext) => format!("{}-{}.{}", stem, stamp, ext.to_string_lossy()),
        None => format!("{}-{}", stem, stamp),
    }
}
