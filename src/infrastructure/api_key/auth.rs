//! API key validation and role classification

use subtle::ConstantTimeEq;
use tracing::warn;

use crate::domain::DomainError;

/// Role granted by a validated API key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Admin => write!(f, "admin"),
        }
    }
}

/// API key authentication with role-based access
///
/// User keys and the admin key come from the environment; comparisons are
/// constant-time.
#[derive(Debug)]
pub struct ApiKeyAuth {
    user_keys: Vec<String>,
    admin_key: Option<String>,
}

impl ApiKeyAuth {
    pub fn new(user_keys: Vec<String>, admin_key: Option<String>) -> Self {
        if user_keys.is_empty() && admin_key.is_none() {
            warn!("No API keys configured - all authenticated routes will reject");
        }

        Self {
            user_keys,
            admin_key,
        }
    }

    /// Parses a comma-separated key list (the `SENTINEL_USER_KEYS` format).
    pub fn parse_key_list(raw: &str) -> Vec<String> {
        raw.split(',')
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(String::from)
            .collect()
    }

    /// Validates a presented credential. Admin key is checked first.
    pub fn validate(&self, api_key: &str) -> Result<Role, DomainError> {
        if let Some(admin) = &self.admin_key {
            if constant_time_eq(api_key, admin) {
                return Ok(Role::Admin);
            }
        }

        for key in &self.user_keys {
            if constant_time_eq(api_key, key) {
                return Ok(Role::User);
            }
        }

        Err(DomainError::AuthInvalid)
    }
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

/// First 8 characters of a key, for log lines.
pub fn key_prefix(api_key: &str) -> String {
    api_key.chars().take(8).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn auth() -> ApiKeyAuth {
        ApiKeyAuth::new(
            vec!["sk-user-one".to_string(), "sk-user-two".to_string()],
            Some("sk-admin".to_string()),
        )
    }

    #[test]
    fn test_admin_key_classifies_admin() {
        assert_eq!(auth().validate("sk-admin").unwrap(), Role::Admin);
    }

    #[test]
    fn test_user_key_classifies_user() {
        assert_eq!(auth().validate("sk-user-two").unwrap(), Role::User);
    }

    #[test]
    fn test_unknown_key_rejected() {
        assert!(matches!(
            auth().validate("sk-unknown"),
            Err(DomainError::AuthInvalid)
        ));
    }

    #[test]
    fn test_prefix_of_valid_key_rejected() {
        assert!(auth().validate("sk-user").is_err());
        assert!(auth().validate("sk-user-onex").is_err());
    }

    #[test]
    fn test_no_keys_configured_rejects_everything() {
        let auth = ApiKeyAuth::new(vec![], None);
        assert!(auth.validate("anything").is_err());
    }

    #[test]
    fn test_parse_key_list() {
        let keys = ApiKeyAuth::parse_key_list(" a , b ,, c ");
        assert_eq!(keys, vec!["a", "b", "c"]);
        assert!(ApiKeyAuth::parse_key_list("").is_empty());
    }

    #[test]
    fn test_key_prefix_truncates() {
        assert_eq!(key_prefix("sk-1234567890"), "sk-12345");
        assert_eq!(key_prefix("short"), "short");
    }
}
