// ─── Classpath Builder ───
// Joins every rule-included library (and its native jar) followed by the
// version jar.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::core::error::LauncherResult;
use crate::core::version::{jar_path, Platform, VersionManifest};

/// Platform-specific Java classpath separator.
pub fn classpath_separator() -> &'static str {
    if cfg!(target_os = "windows") {
        ";"
    } else {
        ":"
    }
}

/// Classpath entries in launch order.
pub fn classpath_entries(
    manifest: &VersionManifest,
    root: &Path,
    platform: &Platform,
) -> LauncherResult<Vec<PathBuf>> {
    let libs_dir = root.join("libraries");
    let mut entries = Vec::new();

    for lib in manifest.allowed_libraries(platform) {
        entries.push(lib.artifact_path(&libs_dir)?);
        if let Some(native) = lib.native_path(&libs_dir, platform)? {
            entries.push(native);
        }
    }
    entries.push(jar_path(root, manifest.jar_name()));

    debug!("Classpath for {} has {} entries", manifest.id, entries.len());
    Ok(entries)
}

pub fn build_classpath(manifest: &VersionManifest, root: &Path, platform: &Platform) -> LauncherResult<String> {
    Ok(classpath_entries(manifest, root, platform)?
        .iter()
        .map(|p| safe_path_str(p))
        .collect::<Vec<_>>()
        .join(classpath_separator()))
}

/// Path as a launch argument. Java rejects Windows extended-length paths
/// (`\\?\C:\...`) on the classpath, so that prefix is stripped.
pub fn safe_path_str(path: &Path) -> String {
    let text = path.to_string_lossy();
    match text.strip_prefix(r"\\?\") {
        Some(stripped) => stripped.to_string(),
        None => text.into_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linux() -> Platform {
        Platform {
            os: "linux",
            is_32bit: false,
            os_version: String::new(),
        }
    }

    #[test]
    fn libraries_natives_then_version_jar() {
        let manifest: VersionManifest = serde_json::from_value(serde_json::json!({
            "id": "fabric-loader-0.15.7-1.20.1",
            "jar": "1.20.1",
            "libraries": [
                {"name": "net.fabricmc:fabric-loader:0.15.7"},
                {
                    "name": "org.lwjgl:lwjgl:3.3.1",
                    "natives": {"linux": "natives-linux"},
                    "downloads": {"classifiers": {"natives-linux": {
                        "path": "org/lwjgl/lwjgl/3.3.1/lwjgl-3.3.1-natives-linux.jar",
                        "url": "https://example.invalid/n.jar"
                    }}}
                },
                {
                    "name": "ca.weblite:java-objc-bridge:1.1",
                    "rules": [{"action": "allow", "os": {"name": "osx"}}]
                }
            ]
        }))
        .unwrap();

        let root = Path::new("/mc");
        let entries = classpath_entries(&manifest, root, &linux()).unwrap();
        assert_eq!(
            entries,
            vec![
                root.join("libraries/net/fabricmc/fabric-loader/0.15.7/fabric-loader-0.15.7.jar"),
                root.join("libraries/org/lwjgl/lwjgl/3.3.1/lwjgl-3.3.1.jar"),
                root.join("libraries/org/lwjgl/lwjgl/3.3.1/lwjgl-3.3.1-natives-linux.jar"),
                root.join("versions/1.20.1/1.20.1.jar"),
            ]
        );

        let joined = build_classpath(&manifest, root, &linux()).unwrap();
        assert_eq!(joined.matches(classpath_separator()).count(), 3);
    }

    #[test]
    fn extended_length_prefix_is_stripped() {
        assert_eq!(safe_path_str(Path::new(r"\\?\C:\mc\a.jar")), r"C:\mc\a.jar");
        assert_eq!(safe_path_str(Path::new("/mc/a.jar")), "/mc/a.jar");
    }
}
