use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::processing::{CatFaceProcessor, ProcessedImages};

/// File extensions picked up when scanning a directory
pub const IMAGE_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "bmp", "gif"];

pub fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            IMAGE_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

/// List the image files directly inside `dir`, sorted by file name
pub fn scan_directory(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("Could not read image directory {}", dir.display()))?;

    let mut images = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if path.is_file() && is_image_file(&path) {
            images.push(path);
        }
    }
    images.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

    debug!(dir = %dir.display(), count = images.len(), "Scanned image directory");
    Ok(images)
}

/// Outcome for one gallery entry
pub struct GalleryEntry {
    pub path: PathBuf,
    pub outcome: Result<ProcessedImages>,
}

/// Process every image in `dir`, handing each entry to `on_entry` before
/// the next image is decoded. Failures are logged and passed on; they never
/// stop the run. Returns the number of images visited.
pub fn process_directory<F>(
    processor: &mut CatFaceProcessor,
    dir: &Path,
    mut on_entry: F,
) -> Result<usize>
where
    F: FnMut(GalleryEntry),
{
    let paths = scan_directory(dir)?;
    let count = paths.len();
    for path in paths {
        let outcome = processor.process_file(&path);
        if let Err(e) = &outcome {
            warn!(path = %path.display(), error = %e, "Failed to process image");
        }
        on_entry(GalleryEntry { path, outcome });
    }
    Ok(count)
}
