//! Still-image snapshots of the current source frame.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::{Result, VideoError};
use crate::video::types::Frame;

/// Placeholder replaced by the image index in a save pattern.
pub const INDEX_PLACEHOLDER: &str = "{}";

/// First path in `dir` named by `pattern` that does not exist yet,
/// probing indices 0, 1, 2, ... in order.
pub fn next_free_path<P: AsRef<Path>>(dir: P, pattern: &str) -> PathBuf {
    let dir = dir.as_ref();
    (0u64..)
        .map(|i| dir.join(pattern.replacen(INDEX_PLACEHOLDER, &i.to_string(), 1)))
        .find(|path| !path.exists())
        .unwrap_or_else(|| dir.join(pattern))
}

/// Write `frame` as a PNG under the lowest unused index. Never overwrites.
pub fn save_next<P: AsRef<Path>>(frame: &Frame, dir: P, pattern: &str) -> Result<PathBuf> {
    let path = next_free_path(dir, pattern);
    frame.save_png(&path).map_err(|e| VideoError::SaveFailed {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;

    info!("[IMAGE] Saved image: {}", path.display());
    Ok(path)
}
