// ─── Overrides ───
// Copies the archive's `overrides/` and `client-overrides/` trees into the
// package directory and registers bundled resource packs in `options.txt`.

use std::io::{Read, Seek};
use std::path::Path;

use tracing::debug;

use crate::core::error::{io_err, LauncherResult};
use crate::core::paths::ensure_inside;

const OVERRIDE_DIRS: [&str; 2] = ["overrides/", "client-overrides/"];
const RESOURCE_PACKS_KEY: &str = "resourcePacks:";

/// Extract override entries in archive order. Empty entries and directories
/// are skipped, as are `protected` file names that already exist on disk.
/// Returns the number of files written.
pub fn extract_overrides<R: Read + Seek>(
    archive: &mut zip::ZipArchive<R>,
    prefix: &str,
    dest: &Path,
    protected: &[String],
) -> LauncherResult<usize> {
    let mut written = 0;
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        if entry.is_dir() || entry.size() == 0 {
            continue;
        }
        let name = entry.name().to_string();
        let Some(relative) = name
            .strip_prefix(prefix)
            .and_then(|rest| OVERRIDE_DIRS.iter().find_map(|dir| rest.strip_prefix(dir)))
            .filter(|rest| !rest.is_empty())
        else {
            continue;
        };

        let target = ensure_inside(dest, &dest.join(relative))?;
        let is_protected = target
            .file_name()
            .is_some_and(|file| protected.iter().any(|p| file.to_string_lossy() == p.as_str()));
        if is_protected && target.exists() {
            debug!("Keeping user copy of {:?}", target);
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
    Ok(written)
}

/// Resource pack zips shipped directly under `overrides/resourcepacks/`.
pub fn bundled_resource_packs<R: Read + Seek>(archive: &zip::ZipArchive<R>, prefix: &str) -> Vec<String> {
    let dir = format!("{}overrides/resourcepacks/", prefix);
    archive
        .file_names()
        .filter_map(|name| name.strip_prefix(dir.as_str()))
        .filter(|pack| pack.ends_with(".zip") && !pack.contains('/'))
        .map(str::to_string)
        .collect()
}

/// Add `file/<pack>` for every pack to the `resourcePacks` line of
/// `options.txt`, keeping existing entries first and dropping duplicates.
/// Creates the file or the line when missing.
pub fn merge_resource_packs(options_path: &Path, packs: &[String]) -> LauncherResult<()> {
    if packs.is_empty() {
        return Ok(());
    }

    let existing = match std::fs::read_to_string(options_path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(io_err(options_path)(e)),
    };

    let mut lines: Vec<String> = existing.lines().map(str::to_string).collect();
    let position = lines.iter().position(|l| l.starts_with(RESOURCE_PACKS_KEY));

    let mut merged = position
        .map(|i| parse_pack_list(&lines[i][RESOURCE_PACKS_KEY.len()..]))
        .unwrap_or_default();
    for pack in packs {
        let entry = format!("file/{}", pack);
        if !merged.contains(&entry) {
            merged.push(entry);
        }
    }

    let line = format!("{}{}", RESOURCE_PACKS_KEY, serde_json::to_string(&merged)?);
    match position {
        Some(i) => lines[i] = line,
        None => lines.push(line),
    }

    let mut text = lines.join("\n");
    text.push('\n');
    std::fs::write(options_path, text).map_err(io_err(options_path))
}

fn parse_pack_list(raw: &str) -> Vec<String> {
    let raw = raw.trim();
    if let Ok(list) = serde_json::from_str::<Vec<String>>(raw) {
        return list;
    }
    raw.trim_start_matches('[')
        .trim_end_matches(']')
        .split(',')
        .map(|p| p.trim().trim_matches('"').to_string())
        .filter(|p| !p.is_empty())
        .collect()
}
