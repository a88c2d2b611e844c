use serde::{Deserialize, Serialize};

/// Account profile as the exchange returns it. The client stores and renders
/// this verbatim; it never validates or normalizes server-owned fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "isAdmin", default)]
    pub is_admin: bool,
    #[serde(rename = "isEmployee", default)]
    pub is_employee: bool,
    #[serde(rename = "isContractor", default)]
    pub is_contractor: bool,
    #[serde(rename = "profileImage")]
    pub profile_image: Option<String>,
    #[serde(rename = "hasTwoFactorAuth", default)]
    pub has_two_factor_auth: bool,
}

impl User {
    /// Highest-privilege role for display purposes.
    pub fn role_display(&self) -> &'static str {
        if self.is_admin {
            "Admin"
        } else if self.is_employee {
            "Employee"
        } else if self.is_contractor {
            "Contractor"
        } else {
            "Customer"
        }
    }

    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            &self.email
        } else {
            &self.name
        }
    }
}

/// Response envelope shared by the auth endpoints
/// (login, register, reset-password).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthEnvelope {
    #[serde(default)]
    pub success: bool,
    pub token: Option<String>,
    pub user: Option<User>,
    pub message: Option<String>,
}

/// Envelope for GET /api/user. A missing `user` field means the token was
/// rejected even though the request itself succeeded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileResponse {
    pub user: Option<User>,
}

/// Non-secret settings persisted as the `user_preferences` record in the
/// plain store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPreferences {
    #[serde(default = "default_notifications")]
    pub notifications_enabled: bool,
}

fn default_notifications() -> bool {
    true
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            notifications_enabled: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_parses_wire_shape() {
        let json = r#"{"id":"u1","email":"ada@example.com","name":"Ada","isAdmin":false,"isEmployee":true,"isContractor":false,"hasTwoFactorAuth":true}"#;
        let user: User = serde_json::from_str(json).expect("Failed to parse user JSON");
        assert_eq!(user.id, "u1");
        assert!(user.is_employee);
        assert!(user.has_two_factor_auth);
        assert_eq!(user.profile_image, None);
        assert_eq!(user.role_display(), "Employee");
    }

    #[test]
    fn test_user_missing_role_flags_default_to_customer() {
        let json = r#"{"id":"u2","email":"bob@example.com"}"#;
        let user: User = serde_json::from_str(json).expect("Failed to parse minimal user");
        assert_eq!(user.role_display(), "Customer");
        assert_eq!(user.display_name(), "bob@example.com");
    }

    #[test]
    fn test_auth_envelope_failure_shape() {
        let json = r#"{"success":false,"message":"bad credentials"}"#;
        let envelope: AuthEnvelope = serde_json::from_str(json).expect("Failed to parse envelope");
        assert!(!envelope.success);
        assert_eq!(envelope.message.as_deref(), Some("bad credentials"));
        assert!(envelope.token.is_none());
        assert!(envelope.user.is_none());
    }

    #[test]
    fn test_preferences_default_to_notifications_on() {
        let preferences: UserPreferences =
            serde_json::from_str("{}").expect("Failed to parse empty preferences");
        assert!(preferences.notifications_enabled);
        assert_eq!(preferences, UserPreferences::default());
    }
}
