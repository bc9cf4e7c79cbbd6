//! Opaque provisioned-profile payload.
//!
//! The provisioner owns the format. The only thing read from it here is the
//! external resource key, which the provisioner serializes as `email`.

use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    #[error("profile blob is malformed: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("profile blob carries an empty resource key")]
    EmptyKey,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct ProfileBlob(String);

#[derive(Deserialize)]
struct KeyedProfile {
    #[serde(rename = "email")]
    key: String,
}

impl ProfileBlob {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Serialize a provisioner response into a blob.
    pub fn from_json(value: &serde_json::Value) -> Self {
        Self(value.to_string())
    }

    /// Recover the key the provisioner needs to delete this resource.
    pub fn resource_key(&self) -> Result<String, ProfileError> {
        let profile: KeyedProfile = serde_json::from_str(&self.0)?;
        if profile.key.trim().is_empty() {
            return Err(ProfileError::EmptyKey);
        }
        Ok(profile.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extracts_key() {
        let blob = ProfileBlob::from_json(&json!({"email": "user-42", "id": "abc", "port": 443}));
        assert_eq!(blob.resource_key().unwrap(), "user-42");
    }

    #[test]
    fn test_garbage_is_malformed() {
        let blob = ProfileBlob::new("{not json");
        assert!(matches!(blob.resource_key(), Err(ProfileError::Malformed(_))));
    }

    #[test]
    fn test_missing_key_is_malformed() {
        let blob = ProfileBlob::from_json(&json!({"id": "abc"}));
        assert!(matches!(blob.resource_key(), Err(ProfileError::Malformed(_))));
    }

    #[test]
    fn test_blank_key_is_rejected() {
        let blob = ProfileBlob::from_json(&json!({"email": "  "}));
        assert!(matches!(blob.resource_key(), Err(ProfileError::EmptyKey)));
    }
}
