use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Prefix of public keys using the legacy RSA/SHA-1 signature algorithm
pub const LEGACY_KEY_PREFIX: &str = "ssh-rsa";

/// Response of `GET /organization/{vcs}/{org}/settings`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProjectSettings {
    pub projects: Vec<Project>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Project {
    pub vcs_url: String,
    pub followers: Vec<Value>,
}

impl Project {
    /// Trailing two path segments of the VCS URL as `(org, name)`
    pub fn org_and_name(&self) -> Option<(&str, &str)> {
        let mut segments = self.vcs_url.trim_end_matches('/').rsplit('/');
        let name = segments.next().filter(|s| !s.is_empty())?;
        let org = segments.next().filter(|s| !s.is_empty())?;
        Some((org, name))
    }

    /// Unfollowed projects have no checkout keys
    pub fn has_followers(&self) -> bool {
        !self.followers.is_empty()
    }
}

/// Response of `GET /project/{vcs}/{org}/{project}/checkout-key`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CheckoutKeyList {
    pub items: Vec<CheckoutKey>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CheckoutKey {
    #[serde(rename = "type")]
    pub key_type: String,
    pub public_key: String,
    pub preferred: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl CheckoutKey {
    pub fn is_legacy_rsa(&self) -> bool {
        self.public_key.starts_with(LEGACY_KEY_PREFIX)
    }
}

/// Key type accepted by the checkout-key creation endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum NewKeyType {
    UserKey,
    DeployKey,
}

impl NewKeyType {
    /// A `github-user-key` is replaced by a user key, anything else by a deploy key
    pub fn replacing(old_type: &str) -> Self {
        if old_type == "github-user-key" {
            NewKeyType::UserKey
        } else {
            NewKeyType::DeployKey
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NewKeyType::UserKey => "user-key",
            NewKeyType::DeployKey => "deploy-key",
        }
    }
}

/// Body of `POST /project/{vcs}/{org}/{project}/checkout-key`
#[derive(Debug, Clone, Serialize)]
pub struct CreateCheckoutKeyRequest {
    #[serde(rename = "type")]
    pub key_type: NewKeyType,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn project(vcs_url: &str, followers: usize) -> Project {
        Project {
            vcs_url: vcs_url.to_string(),
            followers: (0..followers).map(|i| json!({"login": format!("user{i}")})).collect(),
        }
    }

    #[test]
    fn test_org_and_name_from_vcs_url() {
        let p = project("https://github.com/acme/widgets", 1);
        assert_eq!(p.org_and_name(), Some(("acme", "widgets")));

        let p = project("https://bitbucket.org/acme/widgets/", 1);
        assert_eq!(p.org_and_name(), Some(("acme", "widgets")));

        let p = project("widgets", 1);
        assert_eq!(p.org_and_name(), None);
    }

    #[test]
    fn test_has_followers() {
        assert!(!project("https://github.com/acme/a", 0).has_followers());
        assert!(project("https://github.com/acme/a", 2).has_followers());
    }

    #[test]
    fn test_project_settings_fixture() {
        let content = std::fs::read_to_string("test_data/project_settings.json").unwrap();
        let settings: ProjectSettings = serde_json::from_str(&content).unwrap();
        assert_eq!(settings.projects.len(), 4);
        assert_eq!(settings.projects[0].org_and_name(), Some(("acme", "widgets")));
    }

    #[test]
    fn test_checkout_key_requires_fields() {
        let missing_type = json!({"public_key": "ssh-rsa AAAA", "preferred": true});
        assert!(serde_json::from_value::<CheckoutKey>(missing_type).is_err());

        let key: CheckoutKey = serde_json::from_value(json!({
            "type": "deploy-key",
            "public_key": "ssh-rsa AAAAB3NzaC1yc2E",
            "preferred": true
        }))
        .unwrap();
        assert_eq!(key.key_type, "deploy-key");
        assert!(key.is_legacy_rsa());
        assert!(key.fingerprint.is_none());
    }

    #[test]
    fn test_legacy_detection() {
        let key = |public_key: &str| CheckoutKey {
            key_type: "deploy-key".to_string(),
            public_key: public_key.to_string(),
            preferred: true,
            fingerprint: None,
            created_at: None,
        };

        assert!(key("ssh-rsa AAAAB3NzaC1yc2E").is_legacy_rsa());
        assert!(!key("ssh-ed25519 AAAAC3NzaC1lZDI1NTE5").is_legacy_rsa());
        assert!(!key("ecdsa-sha2-nistp256 AAAAE2VjZHNh").is_legacy_rsa());
    }

    #[test]
    fn test_new_key_type_mapping() {
        assert_eq!(NewKeyType::replacing("github-user-key"), NewKeyType::UserKey);
        assert_eq!(NewKeyType::replacing("deploy-key"), NewKeyType::DeployKey);
        assert_eq!(NewKeyType::replacing("bitbucket-user-key"), NewKeyType::DeployKey);

        let body = serde_json::to_value(CreateCheckoutKeyRequest {
            key_type: NewKeyType::UserKey,
        })
        .unwrap();
        assert_eq!(body, json!({"type": "user-key"}));
        assert_eq!(NewKeyType::DeployKey.as_str(), "deploy-key");
    }
}
