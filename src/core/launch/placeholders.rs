use std::collections::HashMap;

/// Every `${name}` the command builder knows. Anything else is left verbatim.
pub const KEYS: &[&str] = &[
    "natives_directory",
    "launcher_name",
    "launcher_version",
    "classpath",
    "classpath_separator",
    "library_directory",
    "auth_player_name",
    "auth_uuid",
    "auth_access_token",
    "auth_session",
    "auth_xuid",
    "clientid",
    "user_type",
    "user_properties",
    "version_name",
    "version_type",
    "game_directory",
    "assets_root",
    "assets_index_name",
    "game_assets",
    "resolution_width",
    "resolution_height",
    "quickPlayPath",
    "quickPlaySingleplayer",
    "quickPlayMultiplayer",
    "quickPlayRealms",
];

/// Closed substitution table, applied in a single left-to-right pass so a
/// substituted value is never expanded again.
#[derive(Debug, Default, Clone)]
pub struct Placeholders {
    values: HashMap<&'static str, String>,
}

impl Placeholders {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `key`. Keys outside [`KEYS`] are ignored.
    pub fn set(&mut self, key: &str, value: impl Into<String>) -> &mut Self {
        if let Some(known) = KEYS.iter().find(|k| **k == key) {
            self.values.insert(*known, value.into());
        }
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn apply(&self, template: &str) -> String {
        let mut out = String::with_capacity(template.len());
        let mut rest = template;

        while let Some(start) = rest.find("${") {
            out.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            match after.find('}') {
                Some(end) => {
                    let key = &after[..end];
                    match self.values.get(key) {
                        Some(value) => out.push_str(value),
                        None => out.push_str(&rest[start..start + 2 + end + 1]),
                    }
                    rest = &after[end + 1..];
                }
                None => {
                    out.push_str(&rest[start..]);
                    rest = "";
                }
            }
        }
        out.push_str(rest);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitutes_known_keys_once() {
        let mut table = Placeholders::new();
        table
            .set("auth_player_name", "${version_name}")
            .set("version_name", "1.20.1");

        assert_eq!(
            table.apply("--username ${auth_player_name} --version ${version_name}"),
            "--username ${version_name} --version 1.20.1"
        );
    }

    #[test]
    fn unknown_and_unterminated_placeholders_stay() {
        let mut table = Placeholders::new();
        table.set("not_a_key", "x").set("game_directory", "/mc");

        assert!(table.get("not_a_key").is_none());
        assert_eq!(table.apply("${mystery}:${game_directory}"), "${mystery}:/mc");
        assert_eq!(table.apply("-Dpath=${game_directory"), "-Dpath=${game_directory");
    }
}
