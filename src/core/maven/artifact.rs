use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::core::error::{LauncherError, LauncherResult};

/// A parsed Maven coordinate as used in library names and Forge processor
/// arguments.
///
/// Accepted forms:
///   `group:artifact:version`
///   `group:artifact:version:classifier`
///   any of the above with an `@extension` suffix
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct MavenArtifact {
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
    pub classifier: Option<String>,
    /// File extension. Defaults to `"jar"`.
    pub extension: String,
}

impl MavenArtifact {
    pub fn parse(coord: &str) -> LauncherResult<Self> {
        let coord = coord.trim();
        let (coord_part, extension) = match coord.rfind('@') {
            Some(idx) => (&coord[..idx], &coord[idx + 1..]),
            None => (coord, "jar"),
        };

        let parts: Vec<&str> = coord_part.split(':').collect();
        if parts.len() < 3 || parts.len() > 4 || parts.iter().any(|p| p.is_empty()) {
            return Err(LauncherError::InvalidMavenCoordinate(coord.to_string()));
        }

        Ok(Self {
            group_id: parts[0].to_string(),
            artifact_id: parts[1].to_string(),
            version: parts[2].to_string(),
            classifier: parts.get(3).map(|c| c.to_string()),
            extension: extension.to_string(),
        })
    }

    /// `net/sf/jopt-simple`
    pub fn group_path(&self) -> String {
        self.group_id.replace('.', "/")
    }

    /// `artifact-version[-classifier].extension`
    pub fn filename(&self) -> String {
        match &self.classifier {
            Some(c) => format!(
                "{}-{}-{}.{}",
                self.artifact_id, self.version, c, self.extension
            ),
            None => format!("{}-{}.{}", self.artifact_id, self.version, self.extension),
        }
    }

    /// Full URL of this artifact under a repository base.
    pub fn url(&self, repo_base: &str) -> String {
        let base = repo_base.trim_end_matches('/');
        format!(
            "{}/{}/{}/{}/{}",
            base,
            self.group_path(),
            self.artifact_id,
            self.version,
            self.filename()
        )
    }

    /// Path relative to a libraries directory.
    pub fn local_path(&self) -> PathBuf {
        let mut path = PathBuf::new();
        for segment in self.group_id.split('.') {
            path.push(segment);
        }
        path.join(&self.artifact_id)
            .join(&self.version)
            .join(self.filename())
    }

    /// Absolute path under `libraries_dir`.
    pub fn path_in(&self, libraries_dir: &Path) -> PathBuf {
        libraries_dir.join(self.local_path())
    }
}

impl fmt::Display for MavenArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.group_id, self.artifact_id, self.version)?;
        if let Some(c) = &self.classifier {
            write!(f, ":{}", c)?;
        }
        if self.extension != "jar" {
            write!(f, "@{}", self.extension)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_simple_coordinate() {
        let a = MavenArtifact::parse("net.sf.jopt-simple:jopt-simple:5.0.4").unwrap();
        assert_eq!(a.group_id, "net.sf.jopt-simple");
        assert_eq!(a.artifact_id, "jopt-simple");
        assert_eq!(a.version, "5.0.4");
        assert_eq!(a.classifier, None);
        assert_eq!(a.extension, "jar");
    }

    #[test]
    fn parse_processor_output_coordinate() {
        let a = MavenArtifact::parse("net.minecraft:client:1.20.1-20230612.114412:mappings@txt").unwrap();
        assert_eq!(a.classifier.as_deref(), Some("mappings"));
        assert_eq!(a.extension, "txt");
        assert_eq!(a.filename(), "client-1.20.1-20230612.114412-mappings.txt");
        assert_eq!(a.to_string(), "net.minecraft:client:1.20.1-20230612.114412:mappings@txt");
    }

    #[test]
    fn rejects_short_coordinates() {
        assert!(matches!(
            MavenArtifact::parse("just-a-name"),
            Err(LauncherError::InvalidMavenCoordinate(_))
        ));
        assert!(MavenArtifact::parse("a::1.0").is_err());
    }

    #[test]
    fn url_construction() {
        let a = MavenArtifact::parse("net.fabricmc:fabric-installer:1.0.1").unwrap();
        assert_eq!(
            a.url("https://maven.fabricmc.net/"),
            "https://maven.fabricmc.net/net/fabricmc/fabric-installer/1.0.1/fabric-installer-1.0.1.jar"
        );
    }

    #[test]
    fn local_path_construction() {
        let a = MavenArtifact::parse("org.lwjgl:lwjgl:3.3.3:natives-windows").unwrap();
        assert_eq!(
            a.path_in(Path::new("/root/libraries")),
            PathBuf::from("/root/libraries/org/lwjgl/lwjgl/3.3.3/lwjgl-3.3.3-natives-windows.jar")
        );
    }
}
