//! Current-user profile model.

use serde::{Deserialize, Serialize};

/// The signed-in user's record from the identity endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct UserProfile {
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    /// Present on backends that expose the staff flag in the profile body
    #[serde(default)]
    pub is_staff: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_deserializes_with_and_without_staff_flag() {
        let json = r#"{"id": 4, "username": "alice", "email": "alice@example.com", "is_staff": true}"#;
        let profile: UserProfile = serde_json::from_str(json).expect("profile should parse");
        assert_eq!(profile.username, "alice");
        assert_eq!(profile.is_staff, Some(true));

        let json = r#"{"id": 5, "username": "bob"}"#;
        let profile: UserProfile = serde_json::from_str(json).expect("profile should parse");
        assert_eq!(profile.is_staff, None);
        assert_eq!(profile.email, None);
    }
}
