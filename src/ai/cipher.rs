//! Token Encryption
//!
//! The vault treats encryption as an opaque per-tenant primitive behind
//! [`TokenCipher`]. [`AesGcmCipher`] is the bundled implementation.
//!
//! Output format: `base64(nonce || ciphertext || tag)` with a fresh random
//! 96-bit nonce per call. Each tenant gets its own key, derived with SHA-256
//! from the master secret and the tenant ID.

use aes_gcm::{
    Aes256Gcm, Key, Nonce,
    aead::{Aead, KeyInit},
};
use base64::{Engine as _, engine::general_purpose};
use rand::RngCore;
use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha256};

use crate::constants::vault::{NONCE_SIZE, TAG_SIZE};
use crate::types::{ModelError, Result, TenantId};

/// Opaque tenant-scoped encryption primitive
pub trait TokenCipher: Send + Sync {
    fn encrypt(&self, tenant_id: &TenantId, plaintext: &str) -> Result<String>;

    fn decrypt(&self, tenant_id: &TenantId, ciphertext: &str) -> Result<String>;
}

/// AES-256-GCM cipher keyed per tenant
pub struct AesGcmCipher {
    master_key: SecretString,
}

impl std::fmt::Debug for AesGcmCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AesGcmCipher")
            .field("master_key", &"[REDACTED]")
            .finish()
    }
}

impl AesGcmCipher {
    pub fn new(master_key: impl Into<String>) -> Result<Self> {
        let master_key = master_key.into();
        if master_key.is_empty() {
            return Err(ModelError::Config(
                "Vault secret key must not be empty".to_string(),
            ));
        }
        Ok(Self {
            master_key: SecretString::from(master_key),
        })
    }

    fn cipher_for(&self, tenant_id: &TenantId) -> Aes256Gcm {
        let mut hasher = Sha256::new();
        hasher.update(self.master_key.expose_secret().as_bytes());
        hasher.update([0u8]);
        hasher.update(tenant_id.as_str().as_bytes());
        let derived: [u8; 32] = hasher.finalize().into();
        Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&derived))
    }
}

impl TokenCipher for AesGcmCipher {
    fn encrypt(&self, tenant_id: &TenantId, plaintext: &str) -> Result<String> {
        if plaintext.is_empty() {
            return Err(ModelError::Encryption("Refusing to encrypt an empty token".to_string()));
        }

        let mut nonce_bytes = [0u8; NONCE_SIZE];
        rand::rng().fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher_for(tenant_id)
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|e| ModelError::Encryption(e.to_string()))?;

        let mut output = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        output.extend_from_slice(&nonce_bytes);
        output.extend_from_slice(&ciphertext);

        Ok(general_purpose::STANDARD.encode(&output))
    }

    fn decrypt(&self, tenant_id: &TenantId, ciphertext: &str) -> Result<String> {
        let bytes = general_purpose::STANDARD
            .decode(ciphertext)
            .map_err(|e| ModelError::Decryption(format!("Invalid base64 token: {}", e)))?;

        if bytes.len() < NONCE_SIZE + TAG_SIZE {
            return Err(ModelError::Decryption(
                "Token too short - possible corruption".to_string(),
            ));
        }

        let (nonce_bytes, sealed) = bytes.split_at(NONCE_SIZE);
        let plaintext = self
            .cipher_for(tenant_id)
            .decrypt(Nonce::from_slice(nonce_bytes), sealed)
            .map_err(|_| {
                ModelError::Decryption(
                    "Token authentication failed - wrong tenant key or tampered data".to_string(),
                )
            })?;

        String::from_utf8(plaintext)
            .map_err(|e| ModelError::Decryption(format!("Token is not valid UTF-8: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cipher() -> AesGcmCipher {
        AesGcmCipher::new("test-master-secret").unwrap()
    }

    #[test]
    fn test_round_trip() {
        let tenant = TenantId::new("tenant-a");
        let sealed = cipher().encrypt(&tenant, "AIza-secret").unwrap();
        assert_ne!(sealed, "AIza-secret");
        assert_eq!(cipher().decrypt(&tenant, &sealed).unwrap(), "AIza-secret");
    }

    #[test]
    fn test_nonce_is_fresh() {
        let tenant = TenantId::new("tenant-a");
        let a = cipher().encrypt(&tenant, "same").unwrap();
        let b = cipher().encrypt(&tenant, "same").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_other_tenant_cannot_decrypt() {
        let sealed = cipher().encrypt(&TenantId::new("a"), "secret").unwrap();
        let err = cipher().decrypt(&TenantId::new("b"), &sealed).unwrap_err();
        assert!(matches!(err, ModelError::Decryption(_)));
    }

    #[test]
    fn test_rejects_empty_plaintext() {
        let err = cipher().encrypt(&TenantId::new("a"), "").unwrap_err();
        assert!(matches!(err, ModelError::Encryption(_)));
    }

    #[test]
    fn test_rejects_garbage() {
        let tenant = TenantId::new("a");
        assert!(matches!(
            cipher().decrypt(&tenant, "not base64!!"),
            Err(ModelError::Decryption(_))
        ));
        assert!(matches!(
            cipher().decrypt(&tenant, "c2hvcnQ="),
            Err(ModelError::Decryption(_))
        ));
    }

    #[test]
    fn test_empty_master_key_rejected() {
        assert!(matches!(AesGcmCipher::new(""), Err(ModelError::Config(_))));
    }

    #[test]
    fn test_debug_redacts_key() {
        let debug = format!("{:?}", cipher());
        assert!(!debug.contains("test-master-secret"));
        assert!(debug.contains("[REDACTED]"));
    }
}
