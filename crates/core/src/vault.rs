//! Symmetric encryption for stored ServiceNow credentials.
//!
//! AES-256-GCM keyed from a process-wide secret. Secrets shorter than the
//! key length are stretched with PBKDF2-HMAC-SHA256 (fixed salt, high
//! iteration count); longer secrets are truncated deterministically.
//! Ciphertexts travel as `base64(nonce || ciphertext || tag)` so they can
//! live inside the JSONB credential blob.

use aes_gcm::aead::{Aead, OsRng};
use aes_gcm::{AeadCore, Aes256Gcm, KeyInit, Nonce};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;

use crate::error::CoreError;

/// Length of an AES-256 key in bytes.
const KEY_LENGTH: usize = 32;

/// Length of a GCM nonce in bytes.
const NONCE_LENGTH: usize = 12;

/// Length of the GCM authentication tag in bytes.
const TAG_LENGTH: usize = 16;

/// Fixed salt for PBKDF2 stretching of short secrets.
const KDF_SALT: &[u8] = b"complianceiq-salt";

/// PBKDF2 iteration count.
const KDF_ITERATIONS: u32 = 100_000;

/// Encrypts and decrypts credential secrets with a process-wide key.
#[derive(Clone)]
pub struct CredentialVault {
    key: [u8; KEY_LENGTH],
}

impl CredentialVault {
    /// Build a vault from the configured secret.
    ///
    /// Secrets shorter than 32 bytes are run through PBKDF2-HMAC-SHA256;
    /// longer ones are truncated to 32 bytes. Both derivations are
    /// deterministic, so the same secret always yields the same key.
    pub fn new(secret: &str) -> Result<Self, CoreError> {
        if secret.is_empty() {
            return Err(CoreError::Credential(
                "Encryption key must not be empty".to_string(),
            ));
        }

        let mut key = [0u8; KEY_LENGTH];
        if secret.len() < KEY_LENGTH {
            pbkdf2_hmac::<Sha256>(secret.as_bytes(), KDF_SALT, KDF_ITERATIONS, &mut key);
        } else {
            key.copy_from_slice(&secret.as_bytes()[..KEY_LENGTH]);
        }
        Ok(Self { key })
    }

    /// Encrypt a plaintext secret.
    ///
    /// The empty string maps to the empty string (no-op passthrough), so
    /// optional secrets round-trip without special-casing at call sites.
    pub fn encrypt(&self, plaintext: &str) -> Result<String, CoreError> {
        if plaintext.is_empty() {
            return Ok(String::new());
        }

        let cipher = Aes256Gcm::new_from_slice(&self.key)
            .map_err(|e| CoreError::Credential(format!("Failed to create cipher: {e}")))?;
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

        let ciphertext = cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|e| CoreError::Credential(format!("Encryption failed: {e}")))?;

        let mut raw = Vec::with_capacity(NONCE_LENGTH + ciphertext.len());
        raw.extend_from_slice(nonce.as_slice());
        raw.extend_from_slice(&ciphertext);
        Ok(BASE64.encode(raw))
    }

    /// Decrypt a ciphertext produced by [`encrypt`](Self::encrypt).
    ///
    /// Fails with [`CoreError::Credential`] on ciphertexts produced with a
    /// different key, tampered data, or garbage input. The empty string
    /// passes through unchanged.
    pub fn decrypt(&self, encoded: &str) -> Result<String, CoreError> {
        if encoded.is_empty() {
            return Ok(String::new());
        }

        let raw = BASE64
            .decode(encoded)
            .map_err(|e| CoreError::Credential(format!("Ciphertext is not valid base64: {e}")))?;
        if raw.len() < NONCE_LENGTH + TAG_LENGTH {
            return Err(CoreError::Credential("Ciphertext too short".to_string()));
        }

        let cipher = Aes256Gcm::new_from_slice(&self.key)
            .map_err(|e| CoreError::Credential(format!("Failed to create cipher: {e}")))?;
        let (nonce_bytes, ciphertext) = raw.split_at(NONCE_LENGTH);

        let plaintext = cipher
            .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
            .map_err(|_| {
                CoreError::Credential(
                    "Decryption failed: ciphertext was not produced with this key".to_string(),
                )
            })?;

        String::from_utf8(plaintext)
            .map_err(|e| CoreError::Credential(format!("Decrypted data is not valid UTF-8: {e}")))
    }
}

impl std::fmt::Debug for CredentialVault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialVault")
            .field("key", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_vault() -> CredentialVault {
        CredentialVault::new("test-encryption-key-that-is-long-enough").unwrap()
    }

    #[test]
    fn test_encrypt_decrypt_round_trip() {
        let vault = test_vault();
        let ciphertext = vault.encrypt("secret123").unwrap();

        assert_ne!(ciphertext, "secret123");
        assert_eq!(vault.decrypt(&ciphertext).unwrap(), "secret123");
    }

    #[test]
    fn test_empty_string_passes_through() {
        let vault = test_vault();
        assert_eq!(vault.encrypt("").unwrap(), "");
        assert_eq!(vault.decrypt("").unwrap(), "");
    }

    #[test]
    fn test_short_secret_derivation_is_deterministic() {
        // Both vaults stretch the same short secret, so ciphertext from one
        // must decrypt with the other.
        let vault_a = CredentialVault::new("short").unwrap();
        let vault_b = CredentialVault::new("short").unwrap();

        let ciphertext = vault_a.encrypt("payload").unwrap();
        assert_eq!(vault_b.decrypt(&ciphertext).unwrap(), "payload");
    }

    #[test]
    fn test_foreign_key_fails() {
        let vault_a = CredentialVault::new("first-vault-secret-first-vault-secret").unwrap();
        let vault_b = CredentialVault::new("other-vault-secret-other-vault-secret").unwrap();

        let ciphertext = vault_a.encrypt("payload").unwrap();
        assert!(vault_b.decrypt(&ciphertext).is_err());
    }

    #[test]
    fn test_tampered_ciphertext_fails() {
        let vault = test_vault();
        let ciphertext = vault.encrypt("payload").unwrap();

        let mut raw = BASE64.decode(&ciphertext).unwrap();
        let last = raw.len() - 1;
        raw[last] ^= 0xFF;
        let tampered = BASE64.encode(raw);

        assert!(vault.decrypt(&tampered).is_err());
    }

    #[test]
    fn test_garbage_input_fails() {
        let vault = test_vault();
        assert!(vault.decrypt("not-base64!!!").is_err());
        assert!(vault.decrypt("AAAA").is_err());
    }

    #[test]
    fn test_empty_secret_rejected() {
        assert!(CredentialVault::new("").is_err());
    }

    #[test]
    fn test_debug_redacts_key() {
        let vault = test_vault();
        let debug = format!("{vault:?}");
        assert!(debug.contains("[REDACTED]"));
    }
}
