use quick_xml::de::from_str;
use serde::Deserialize;

use crate::core::error::{LauncherError, LauncherResult};
use crate::core::http::ResponseCache;

/// `maven-metadata.xml` of an artifact directory.
#[derive(Debug, Clone, Default)]
pub struct MavenMetadata {
    pub release: Option<String>,
    pub latest: Option<String>,
    pub versions: Vec<String>,
}

#[derive(Debug, Deserialize, Default)]
struct MetadataDocument {
    #[serde(default)]
    versioning: Versioning,
}

#[derive(Debug, Deserialize, Default)]
struct Versioning {
    #[serde(default)]
    release: Option<String>,
    #[serde(default)]
    latest: Option<String>,
    #[serde(default)]
    versions: VersionList,
}

#[derive(Debug, Deserialize, Default)]
struct VersionList {
    #[serde(default, rename = "version")]
    items: Vec<String>,
}

impl MavenMetadata {
    pub fn parse(xml: &str) -> LauncherResult<Self> {
        let doc: MetadataDocument = from_str(xml)?;
        Ok(Self {
            release: doc.versioning.release,
            latest: doc.versioning.latest,
            versions: doc.versioning.versions.items,
        })
    }

    pub async fn fetch(cache: &ResponseCache, url: &str) -> LauncherResult<Self> {
        let body = cache.get_text(url).await?;
        Self::parse(&body)
    }

    /// `latest`, falling back to `release`, then the last listed version.
    pub fn newest(&self) -> LauncherResult<&str> {
        self.latest
            .as_deref()
            .or(self.release.as_deref())
            .or(self.versions.last().map(String::as_str))
            .ok_or_else(|| LauncherError::LoaderApi("maven-metadata.xml lists no versions".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<metadata>
  <groupId>net.fabricmc</groupId>
  <artifactId>fabric-installer</artifactId>
  <versioning>
    <latest>1.0.1</latest>
    <release>1.0.1</release>
    <versions>
      <version>0.11.2</version>
      <version>1.0.0</version>
      <version>1.0.1</version>
    </versions>
    <lastUpdated>20240401000000</lastUpdated>
  </versioning>
</metadata>"#;

    #[test]
    fn parses_release_latest_and_versions() {
        let meta = MavenMetadata::parse(SAMPLE).unwrap();
        assert_eq!(meta.release.as_deref(), Some("1.0.1"));
        assert_eq!(meta.versions, vec!["0.11.2", "1.0.0", "1.0.1"]);
        assert_eq!(meta.newest().unwrap(), "1.0.1");
    }

    #[test]
    fn empty_metadata_has_no_newest() {
        let meta = MavenMetadata::parse("<metadata><versioning></versioning></metadata>").unwrap();
        assert!(meta.newest().is_err());
    }
}
