use serde::{Deserialize, Serialize};

const OFFLINE_UUID: &str = "00000000-0000-0000-0000-000000000000";
const OFFLINE_TOKEN: &str = "offline_access_token";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AccountMode {
    Offline,
    Microsoft,
}

/// Who the game is launched as. Produced by whatever signs the user in; the
/// engine only substitutes these values into the command line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LaunchIdentity {
    pub mode: AccountMode,
    pub username: String,
    pub uuid: String,
    pub access_token: String,
    pub user_type: String,
}

impl Default for LaunchIdentity {
    fn default() -> Self {
        Self::offline("Player")
    }
}

impl LaunchIdentity {
    pub fn offline(username: &str) -> Self {
        Self {
            mode: AccountMode::Offline,
            username: username.trim().to_string(),
            uuid: OFFLINE_UUID.into(),
            access_token: OFFLINE_TOKEN.into(),
            user_type: "legacy".into(),
        }
    }

    pub fn microsoft(username: &str, uuid: &str, access_token: &str) -> Self {
        Self {
            mode: AccountMode::Microsoft,
            username: username.trim().to_string(),
            uuid: uuid.trim().to_string(),
            access_token: access_token.trim().to_string(),
            user_type: "msa".into(),
        }
    }

    /// Fill blank fields so no placeholder ends up empty.
    pub fn sanitized(mut self) -> Self {
        if self.username.trim().is_empty() {
            self.username = "Player".into();
        }
        if self.uuid.trim().is_empty() {
            self.uuid = OFFLINE_UUID.into();
        }
        if self.access_token.trim().is_empty() {
            self.access_token = OFFLINE_TOKEN.into();
        }
        if self.user_type.trim().is_empty() {
            self.user_type = match self.mode {
                AccountMode::Offline => "legacy".into(),
                AccountMode::Microsoft => "msa".into(),
            };
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_fields_are_filled() {
        let identity = LaunchIdentity::microsoft("  ", "", "").sanitized();
        assert_eq!(identity.username, "Player");
        assert_eq!(identity.uuid, OFFLINE_UUID);
        assert_eq!(identity.user_type, "msa");
    }
}
