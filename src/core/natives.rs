// ─── Native Extractor ───
// Unpacks platform native archives into `versions/<id>/natives`.

use std::io::Read;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::core::error::{io_err, LauncherResult};

/// `<root>/versions/<id>/natives`
pub fn natives_dir(root: &Path, version_id: &str) -> PathBuf {
    root.join("versions").join(version_id).join("natives")
}

/// Extract every entry of `archive` into `dest` except those whose name starts
/// with one of `exclude`. Entries that would land outside `dest` are skipped.
/// Returns the number of files written.
pub fn extract_natives(archive: &Path, dest: &Path, exclude: &[String]) -> LauncherResult<usize> {
    std::fs::create_dir_all(dest).map_err(io_err(dest))?;

    let file = std::fs::File::open(archive).map_err(io_err(archive))?;
    let mut zip = zip::ZipArchive::new(file)?;
    let mut written = 0;

    for i in 0..zip.len() {
        let mut entry = zip.by_index(i)?;
        let name = entry.name().to_string();
        if exclude.iter().any(|prefix| name.starts_with(prefix.as_str())) {
            continue;
        }

        let Some(relative) = entry.enclosed_name() else {
            warn!("Skipping unsafe native entry {:?} in {:?}", name, archive);
            continue;
        };
        let target = dest.join(relative);

        if entry.is_dir() {
            std::fs::create_dir_all(&target).map_err(io_err(&target))?;
            continue;
        }
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent).map_err(io_err(parent))?;
        }

        let mut bytes = Vec::with_capacity(entry.size() as usize);
        entry.read_to_end(&mut bytes)?;
        std::fs::write(&target, bytes).map_err(io_err(&target))?;
        written += 1;
    }

    debug!("Extracted {} native files from {:?}", written, archive);
    Ok(written)
}
