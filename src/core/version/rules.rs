// ─── Rule Evaluation ───
// Decides which libraries and conditional arguments apply on this machine.

use std::collections::BTreeMap;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RuleAction {
    Allow,
    Disallow,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct OsRule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Rule {
    pub action: RuleAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os: Option<OsRule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub features: Option<BTreeMap<String, bool>>,
}

/// The machine rules are evaluated against.
#[derive(Debug, Clone)]
pub struct Platform {
    /// `windows`, `osx` or `linux`.
    pub os: &'static str,
    pub is_32bit: bool,
    pub os_version: String,
}

impl Platform {
    pub fn current() -> Self {
        let os = current_os_name();
        let os_version = match os {
            "windows" => sysinfo::System::os_version().unwrap_or_default(),
            // Java reports nothing useful here either.
            "osx" => String::new(),
            _ => sysinfo::System::kernel_version().unwrap_or_default(),
        };

        Self {
            os,
            is_32bit: cfg!(target_pointer_width = "32"),
            os_version,
        }
    }

    /// Value substituted for `${arch}` in native classifiers.
    pub fn arch_bits(&self) -> &'static str {
        if self.is_32bit {
            "32"
        } else {
            "64"
        }
    }
}

/// Named launch features a rule can require.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeatureSet {
    pub custom_resolution: bool,
    pub demo_user: bool,
    pub quick_play_path: bool,
    pub quick_play_singleplayer: bool,
    pub quick_play_multiplayer: bool,
    pub quick_play_realms: bool,
}

impl FeatureSet {
    fn has(&self, feature: &str) -> bool {
        match feature {
            "has_custom_resolution" => self.custom_resolution,
            "is_demo_user" => self.demo_user,
            "has_quick_plays_support" => self.quick_play_path,
            "is_quick_play_singleplayer" => self.quick_play_singleplayer,
            "is_quick_play_multiplayer" => self.quick_play_multiplayer,
            "is_quick_play_realms" => self.quick_play_realms,
            // Unknown features never block a rule.
            _ => true,
        }
    }
}

/// Mojang OS name for the current platform.
pub fn current_os_name() -> &'static str {
    if cfg!(target_os = "windows") {
        "windows"
    } else if cfg!(target_os = "macos") {
        "osx"
    } else {
        "linux"
    }
}

impl Rule {
    /// Evaluate one rule. A rule whose predicates do not match yields the
    /// opposite of its action.
    pub fn evaluate(&self, platform: &Platform, features: &FeatureSet) -> bool {
        let allow = self.action == RuleAction::Allow;
        if self.matches(platform, features) {
            allow
        } else {
            !allow
        }
    }

    fn matches(&self, platform: &Platform, features: &FeatureSet) -> bool {
        if let Some(os) = &self.os {
            if let Some(name) = &os.name {
                if name != platform.os {
                    return false;
                }
            }
            if os.arch.as_deref() == Some("x86") && !platform.is_32bit {
                return false;
            }
            if let Some(pattern) = &os.version {
                match Regex::new(pattern) {
                    // Anchored at the start only, like Java's lookingAt.
                    Ok(re) => {
                        if !re.find(&platform.os_version).is_some_and(|m| m.start() == 0) {
                            return false;
                        }
                    }
                    Err(e) => {
                        warn!("Ignoring rule with invalid os.version pattern {:?}: {}", pattern, e);
                        return false;
                    }
                }
            }
        }

        if let Some(required) = &self.features {
            for feature in required.keys() {
                if !features.has(feature) {
                    return false;
                }
            }
        }

        true
    }
}

/// AND across every rule. An empty list allows.
pub fn rules_allow(rules: &[Rule], platform: &Platform, features: &FeatureSet) -> bool {
    rules.iter().all(|rule| rule.evaluate(platform, features))
}
