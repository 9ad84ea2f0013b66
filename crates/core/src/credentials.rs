//! Stored ServiceNow credential blobs.
//!
//! Credentials persist as a JSONB tagged union whose `type` tag always
//! matches the instance's `auth_type` column. Secret members (password,
//! client secret) hold vault ciphertext, never plaintext.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::vault::CredentialVault;

/// Supported ServiceNow authentication schemes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthType {
    Basic,
    Oauth,
}

impl AuthType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthType::Basic => "basic",
            AuthType::Oauth => "oauth",
        }
    }
}

impl std::fmt::Display for AuthType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AuthType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "basic" => Ok(AuthType::Basic),
            "oauth" => Ok(AuthType::Oauth),
            other => Err(CoreError::Validation(format!(
                "Unsupported auth type: {other}"
            ))),
        }
    }
}

/// Encrypted credential blob stored on a ServiceNow instance row.
///
/// The JSON keys match the stored blob: `{"type": "basic", "username": ...,
/// "password": <ciphertext>}` or `{"type": "oauth", "client_id": ...,
/// "client_secret": <ciphertext>}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Credentials {
    Basic {
        username: String,
        #[serde(rename = "password")]
        encrypted_password: String,
    },
    Oauth {
        client_id: String,
        #[serde(rename = "client_secret")]
        encrypted_client_secret: String,
    },
}

impl Credentials {
    pub fn auth_type(&self) -> AuthType {
        match self {
            Credentials::Basic { .. } => AuthType::Basic,
            Credentials::Oauth { .. } => AuthType::Oauth,
        }
    }
}

/// Plaintext credential fields supplied on create/update requests.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CredentialInput {
    pub username: Option<String>,
    pub password: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
}

impl CredentialInput {
    /// True when no credential field was supplied at all.
    pub fn is_empty(&self) -> bool {
        self.username.is_none()
            && self.password.is_none()
            && self.client_id.is_none()
            && self.client_secret.is_none()
    }
}

/// Validate that the fields required by `auth_type` are present.
///
/// Runs before any row is persisted: basic auth requires a username, OAuth
/// requires a client id. Secrets may be empty (they encrypt to the empty
/// string and fail later at request time if actually needed).
pub fn validate_for_create(auth_type: AuthType, input: &CredentialInput) -> Result<(), CoreError> {
    match auth_type {
        AuthType::Basic => {
            if input.username.as_deref().unwrap_or("").is_empty() {
                return Err(CoreError::Validation(
                    "Username required for basic auth".to_string(),
                ));
            }
        }
        AuthType::Oauth => {
            if input.client_id.as_deref().unwrap_or("").is_empty() {
                return Err(CoreError::Validation(
                    "Client ID required for OAuth".to_string(),
                ));
            }
        }
    }
    Ok(())
}

/// Build an encrypted blob from plaintext input.
pub fn encrypt_credentials(
    vault: &CredentialVault,
    auth_type: AuthType,
    input: &CredentialInput,
) -> Result<Credentials, CoreError> {
    match auth_type {
        AuthType::Basic => Ok(Credentials::Basic {
            username: input.username.clone().unwrap_or_default(),
            encrypted_password: vault.encrypt(input.password.as_deref().unwrap_or(""))?,
        }),
        AuthType::Oauth => Ok(Credentials::Oauth {
            client_id: input.client_id.clone().unwrap_or_default(),
            encrypted_client_secret: vault.encrypt(input.client_secret.as_deref().unwrap_or(""))?,
        }),
    }
}

/// Merge a partial credential update into an existing blob.
///
/// Only supplied fields change: identity fields fall back to the stored
/// value, secrets are re-encrypted only when new plaintext was supplied
/// and otherwise keep their existing ciphertext. The auth type of the
/// blob never changes here.
pub fn merge_credentials(
    vault: &CredentialVault,
    existing: &Credentials,
    input: &CredentialInput,
) -> Result<Credentials, CoreError> {
    match existing {
        Credentials::Basic {
            username,
            encrypted_password,
        } => Ok(Credentials::Basic {
            username: input.username.clone().unwrap_or_else(|| username.clone()),
            encrypted_password: match input.password.as_deref() {
                Some(password) => vault.encrypt(password)?,
                None => encrypted_password.clone(),
            },
        }),
        Credentials::Oauth {
            client_id,
            encrypted_client_secret,
        } => Ok(Credentials::Oauth {
            client_id: input.client_id.clone().unwrap_or_else(|| client_id.clone()),
            encrypted_client_secret: match input.client_secret.as_deref() {
                Some(secret) => vault.encrypt(secret)?,
                None => encrypted_client_secret.clone(),
            },
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_vault() -> CredentialVault {
        CredentialVault::new("unit-test-vault-secret").unwrap()
    }

    fn basic_input(username: &str, password: &str) -> CredentialInput {
        CredentialInput {
            username: Some(username.to_string()),
            password: Some(password.to_string()),
            ..CredentialInput::default()
        }
    }

    #[test]
    fn test_blob_tag_matches_auth_type() {
        let vault = test_vault();
        let blob =
            encrypt_credentials(&vault, AuthType::Basic, &basic_input("svc", "secret123")).unwrap();

        assert_eq!(blob.auth_type(), AuthType::Basic);

        let json = serde_json::to_value(&blob).unwrap();
        assert_eq!(json["type"], "basic");
        assert_eq!(json["username"], "svc");
        // The stored password field is ciphertext, not the plaintext.
        assert_ne!(json["password"], "secret123");
    }

    #[test]
    fn test_blob_round_trips_through_json() {
        let vault = test_vault();
        let input = CredentialInput {
            client_id: Some("client-1".to_string()),
            client_secret: Some("hunter2".to_string()),
            ..CredentialInput::default()
        };
        let blob = encrypt_credentials(&vault, AuthType::Oauth, &input).unwrap();

        let json = serde_json::to_value(&blob).unwrap();
        let parsed: Credentials = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, blob);
    }

    #[test]
    fn test_encrypted_password_decrypts_to_original() {
        let vault = test_vault();
        let blob =
            encrypt_credentials(&vault, AuthType::Basic, &basic_input("svc", "secret123")).unwrap();

        let Credentials::Basic {
            encrypted_password, ..
        } = blob
        else {
            panic!("expected basic credentials");
        };
        assert_eq!(vault.decrypt(&encrypted_password).unwrap(), "secret123");
    }

    #[test]
    fn test_basic_requires_username() {
        let input = CredentialInput {
            password: Some("secret".to_string()),
            ..CredentialInput::default()
        };
        assert!(validate_for_create(AuthType::Basic, &input).is_err());
    }

    #[test]
    fn test_oauth_requires_client_id() {
        let input = CredentialInput {
            client_secret: Some("secret".to_string()),
            ..CredentialInput::default()
        };
        assert!(validate_for_create(AuthType::Oauth, &input).is_err());
    }

    #[test]
    fn test_merge_preserves_unsupplied_secret() {
        let vault = test_vault();
        let existing =
            encrypt_credentials(&vault, AuthType::Basic, &basic_input("svc", "secret123")).unwrap();

        // Only the username changes; the stored ciphertext must survive.
        let update = CredentialInput {
            username: Some("svc2".to_string()),
            ..CredentialInput::default()
        };
        let merged = merge_credentials(&vault, &existing, &update).unwrap();

        let Credentials::Basic {
            username,
            encrypted_password,
        } = merged
        else {
            panic!("expected basic credentials");
        };
        assert_eq!(username, "svc2");
        assert_eq!(vault.decrypt(&encrypted_password).unwrap(), "secret123");
    }

    #[test]
    fn test_merge_replaces_supplied_secret() {
        let vault = test_vault();
        let existing =
            encrypt_credentials(&vault, AuthType::Basic, &basic_input("svc", "old")).unwrap();

        let update = CredentialInput {
            password: Some("new".to_string()),
            ..CredentialInput::default()
        };
        let merged = merge_credentials(&vault, &existing, &update).unwrap();

        let Credentials::Basic {
            username,
            encrypted_password,
        } = merged
        else {
            panic!("expected basic credentials");
        };
        assert_eq!(username, "svc");
        assert_eq!(vault.decrypt(&encrypted_password).unwrap(), "new");
    }
}
