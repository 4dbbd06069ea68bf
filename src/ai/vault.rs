//! Credential Vault
//!
//! Encrypt-at-rest, decrypt-for-use and obfuscate-for-display for provider
//! credentials.
//!
//! ## Credential views
//!
//! - **Stored**: ciphertext, persisted (`StoredCredentials`)
//! - **Resolved**: plaintext, in-memory only (`ResolvedCredentials`)
//! - **Display**: secret masked, safe to show (`DisplayCredentials`)
//!
//! Only the stored and display views ever leave the vault. Resolved
//! credentials hold the key as a `SecretString`, are never serialized and
//! redact the key in debug output.

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::ai::cipher::TokenCipher;
use crate::constants::gemini::API_VERSION_SUFFIX;
use crate::constants::vault::{MASK_CHAR, MAX_MASK_WIDTH, MIN_MASK_WIDTH};
use crate::types::{ModelError, Result, TenantId};

// =============================================================================
// Credential Views
// =============================================================================

/// Plaintext credentials as entered by a user, before encryption
#[derive(Clone, Default)]
pub struct ProviderCredentials {
    pub api_base: Option<String>,
    pub api_key: Option<SecretString>,
}

impl ProviderCredentials {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_base: None,
            api_key: Some(SecretString::from(api_key.into())),
        }
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = Some(api_base.into());
        self
    }
}

impl std::fmt::Debug for ProviderCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderCredentials")
            .field("api_base", &self.api_base)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Persisted JSON shape. Older records used `genai_`-prefixed field names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuredCredentials {
    #[serde(default, alias = "genai_api_base")]
    pub api_base: Option<String>,
    /// Ciphertext of the API key
    #[serde(default, alias = "genai_api_key")]
    pub api_key: Option<String>,
}

/// Credentials as persisted: structured JSON, or a legacy bare ciphertext
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoredCredentials {
    Structured(StructuredCredentials),
    /// Pre-JSON records: the whole value is the encrypted API key
    LegacyOpaque(String),
}

impl StoredCredentials {
    /// Parse a persisted configuration value.
    ///
    /// Anything that is not a JSON object with the expected fields is read
    /// as the legacy single-field format.
    pub fn parse(raw: &str) -> Self {
        match serde_json::from_str::<StructuredCredentials>(raw) {
            Ok(structured) => Self::Structured(structured),
            Err(e) => {
                debug!("Stored credentials are not JSON ({}), reading legacy format", e);
                Self::LegacyOpaque(raw.to_string())
            }
        }
    }

    /// Serialize for persistence
    pub fn to_persisted(&self) -> Result<String> {
        match self {
            Self::Structured(structured) => Ok(serde_json::to_string(structured)?),
            Self::LegacyOpaque(raw) => Ok(raw.clone()),
        }
    }

    /// Normalize to the structured shape
    pub fn into_structured(self) -> StructuredCredentials {
        match self {
            Self::Structured(structured) => structured,
            Self::LegacyOpaque(raw) => StructuredCredentials {
                api_base: None,
                api_key: Some(raw),
            },
        }
    }
}

/// Plaintext, in-memory credentials for a single request scope
#[derive(Clone, Default)]
pub struct ResolvedCredentials {
    /// API root with the version suffix applied, `None` for the provider default
    pub api_base: Option<String>,
    pub api_key: Option<SecretString>,
}

impl std::fmt::Debug for ResolvedCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedCredentials")
            .field("api_base", &self.api_base)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Credentials safe to display: the key is masked
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DisplayCredentials {
    pub api_base: Option<String>,
    pub api_key: Option<String>,
}

/// Whether a provider record carries its own credentials or uses the shared tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProviderType {
    #[default]
    Custom,
    System,
}

/// Persisted provider record for one tenant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderRecord {
    pub tenant_id: TenantId,
    pub provider_type: ProviderType,
    /// Stored credentials (JSON or legacy ciphertext)
    pub encrypted_config: Option<String>,
}

impl ProviderRecord {
    pub fn custom(tenant_id: impl Into<TenantId>, encrypted_config: impl Into<String>) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            provider_type: ProviderType::Custom,
            encrypted_config: Some(encrypted_config.into()),
        }
    }

    pub fn system(tenant_id: impl Into<TenantId>) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            provider_type: ProviderType::System,
            encrypted_config: None,
        }
    }
}

/// Shared credentials offered by the deployment to system-tier records
#[derive(Clone)]
pub struct HostedCredentials {
    pub api_base: Option<String>,
    pub api_key: SecretString,
}

// =============================================================================
// Vault
// =============================================================================

/// Encrypts, resolves and obfuscates provider credentials
#[derive(Clone)]
pub struct CredentialVault {
    cipher: Arc<dyn TokenCipher>,
    hosted: Option<HostedCredentials>,
}

impl std::fmt::Debug for CredentialVault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialVault")
            .field("hosted", &self.hosted.is_some())
            .finish()
    }
}

impl CredentialVault {
    pub fn new(cipher: Arc<dyn TokenCipher>) -> Self {
        Self {
            cipher,
            hosted: None,
        }
    }

    /// Configure the shared credentials returned for system-tier records
    pub fn with_hosted(mut self, hosted: Option<HostedCredentials>) -> Self {
        self.hosted = hosted;
        self
    }

    /// Encrypt the secret field; every other field is left untouched
    pub fn encrypt(
        &self,
        tenant_id: &TenantId,
        credentials: &ProviderCredentials,
    ) -> Result<StoredCredentials> {
        let plaintext = credentials
            .api_key
            .as_ref()
            .map(|k| k.expose_secret())
            .filter(|k| !k.is_empty())
            .ok_or_else(|| ModelError::Encryption("API key is empty".to_string()))?;

        let ciphertext = self.cipher.encrypt(tenant_id, plaintext)?;

        Ok(StoredCredentials::Structured(StructuredCredentials {
            api_base: credentials.api_base.clone(),
            api_key: Some(ciphertext),
        }))
    }

    /// Resolve a provider record into plaintext credentials.
    ///
    /// System records use the hosted credentials (or nothing); their
    /// tenant ciphertext is never read.
    pub fn resolve(&self, record: &ProviderRecord) -> Result<ResolvedCredentials> {
        match record.provider_type {
            ProviderType::Custom => {
                let stored = record
                    .encrypted_config
                    .as_deref()
                    .map(StoredCredentials::parse)
                    .unwrap_or_else(|| {
                        StoredCredentials::Structured(StructuredCredentials::default())
                    });
                self.resolve_stored(&record.tenant_id, &stored)
            }
            ProviderType::System => Ok(match &self.hosted {
                Some(hosted) => ResolvedCredentials {
                    api_base: hosted.api_base.clone(),
                    api_key: Some(hosted.api_key.clone()),
                },
                None => ResolvedCredentials::default(),
            }),
        }
    }

    /// Decrypt already-parsed stored credentials for a tenant.
    ///
    /// Decryption errors propagate unchanged.
    pub fn resolve_stored(
        &self,
        tenant_id: &TenantId,
        stored: &StoredCredentials,
    ) -> Result<ResolvedCredentials> {
        let structured = stored.clone().into_structured();

        let api_key = match structured.api_key.as_deref() {
            Some(ciphertext) if !ciphertext.is_empty() => Some(SecretString::from(
                self.cipher.decrypt(tenant_id, ciphertext)?,
            )),
            _ => None,
        };

        Ok(ResolvedCredentials {
            api_base: normalize_api_base(structured.api_base.as_deref()),
            api_key,
        })
    }

    /// Replace the secret with a mask; other fields unchanged
    pub fn obfuscate(&self, resolved: &ResolvedCredentials) -> DisplayCredentials {
        DisplayCredentials {
            api_base: resolved.api_base.clone(),
            api_key: resolved
                .api_key
                .as_ref()
                .map(|k| obfuscate_token(k.expose_secret())),
        }
    }

    /// Resolve then obfuscate, for settings pages
    pub fn display(&self, record: &ProviderRecord) -> Result<DisplayCredentials> {
        Ok(self.obfuscate(&self.resolve(record)?))
    }
}

/// Append the API version to a custom base; absent or empty bases become `None`
pub fn normalize_api_base(api_base: Option<&str>) -> Option<String> {
    api_base
        .map(|base| base.trim().trim_end_matches('/'))
        .filter(|base| !base.is_empty())
        .map(|base| format!("{}{}", base, API_VERSION_SUFFIX))
}

/// Mask a secret without revealing any of its characters.
///
/// The mask is one character shorter than the secret (clamped), so it can
/// never contain a secret of four or more characters.
pub fn obfuscate_token(token: &str) -> String {
    let width = token
        .chars()
        .count()
        .saturating_sub(1)
        .clamp(MIN_MASK_WIDTH, MAX_MASK_WIDTH);
    std::iter::repeat_n(MASK_CHAR, width).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    /// Reversible stand-in for the encryption service
    struct ReverseCipher;

    impl TokenCipher for ReverseCipher {
        fn encrypt(&self, tenant_id: &TenantId, plaintext: &str) -> Result<String> {
            if plaintext.is_empty() {
                return Err(ModelError::Encryption("empty".into()));
            }
            Ok(format!(
                "{}:{}",
                tenant_id,
                plaintext.chars().rev().collect::<String>()
            ))
        }

        fn decrypt(&self, tenant_id: &TenantId, ciphertext: &str) -> Result<String> {
            let prefix = format!("{}:", tenant_id);
            ciphertext
                .strip_prefix(&prefix)
                .map(|body| body.chars().rev().collect())
                .ok_or_else(|| ModelError::Decryption("wrong tenant".into()))
        }
    }

    /// Decrypt is identity, for records written by a plaintext-era cipher
    struct IdentityCipher;

    impl TokenCipher for IdentityCipher {
        fn encrypt(&self, _tenant_id: &TenantId, plaintext: &str) -> Result<String> {
            Ok(plaintext.to_string())
        }

        fn decrypt(&self, _tenant_id: &TenantId, ciphertext: &str) -> Result<String> {
            Ok(ciphertext.to_string())
        }
    }

    fn vault() -> CredentialVault {
        CredentialVault::new(Arc::new(ReverseCipher))
    }

    fn key(resolved: &ResolvedCredentials) -> Option<&str> {
        resolved.api_key.as_ref().map(|k| k.expose_secret())
    }

    #[test]
    fn test_encrypt_keeps_other_fields() {
        let tenant = TenantId::new("t1");
        let creds = ProviderCredentials::new("AIza123").with_api_base("https://proxy.local");
        let stored = vault().encrypt(&tenant, &creds).unwrap();

        match &stored {
            StoredCredentials::Structured(s) => {
                assert_eq!(s.api_base.as_deref(), Some("https://proxy.local"));
                assert_eq!(s.api_key.as_deref(), Some("t1:321azIA"));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_encrypt_rejects_empty_secret() {
        let tenant = TenantId::new("t1");
        let err = vault()
            .encrypt(&tenant, &ProviderCredentials::new(""))
            .unwrap_err();
        assert!(matches!(err, ModelError::Encryption(_)));

        let err = vault()
            .encrypt(&tenant, &ProviderCredentials::default())
            .unwrap_err();
        assert!(matches!(err, ModelError::Encryption(_)));
    }

    #[test]
    fn test_round_trip_through_persistence() {
        let tenant = TenantId::new("t1");
        let stored = vault()
            .encrypt(&tenant, &ProviderCredentials::new("AIza-secret"))
            .unwrap();
        let record = ProviderRecord::custom("t1", stored.to_persisted().unwrap());

        let resolved = vault().resolve(&record).unwrap();
        assert_eq!(key(&resolved), Some("AIza-secret"));
        assert_eq!(resolved.api_base, None);
    }

    #[test]
    fn test_api_base_gets_version_suffix() {
        let tenant = TenantId::new("t1");
        let stored = vault()
            .encrypt(
                &tenant,
                &ProviderCredentials::new("k").with_api_base("https://proxy.local/"),
            )
            .unwrap();
        let resolved = vault().resolve_stored(&tenant, &stored).unwrap();
        assert_eq!(
            resolved.api_base.as_deref(),
            Some("https://proxy.local/v1beta")
        );
    }

    #[test]
    fn test_empty_api_base_is_unset() {
        assert_eq!(normalize_api_base(Some("")), None);
        assert_eq!(normalize_api_base(Some("   ")), None);
        assert_eq!(normalize_api_base(None), None);
    }

    #[test]
    fn test_legacy_bare_string() {
        let vault = CredentialVault::new(Arc::new(IdentityCipher));
        let record = ProviderRecord::custom("t1", "sk-legacy123");

        let resolved = vault.resolve(&record).unwrap();
        assert_eq!(resolved.api_base, None);
        assert_eq!(key(&resolved), Some("sk-legacy123"));
    }

    #[test]
    fn test_parse_stored_formats() {
        assert_eq!(
            StoredCredentials::parse("sk-legacy123"),
            StoredCredentials::LegacyOpaque("sk-legacy123".into())
        );
        assert_eq!(
            StoredCredentials::parse(r#"{"genai_api_base": null, "genai_api_key": "abc"}"#),
            StoredCredentials::Structured(StructuredCredentials {
                api_base: None,
                api_key: Some("abc".into()),
            })
        );
    }

    #[test]
    fn test_decryption_errors_propagate() {
        let record = ProviderRecord::custom("t2", r#"{"api_key": "t1:cba"}"#);
        let err = vault().resolve(&record).unwrap_err();
        assert!(matches!(err, ModelError::Decryption(_)));
    }

    #[test]
    fn test_empty_ciphertext_not_decrypted() {
        let record = ProviderRecord::custom("t1", r#"{"api_base": "https://x", "api_key": ""}"#);
        let resolved = vault().resolve(&record).unwrap();
        assert!(resolved.api_key.is_none());
        assert_eq!(resolved.api_base.as_deref(), Some("https://x/v1beta"));
    }

    #[test]
    fn test_system_record_uses_hosted_credentials() {
        let hosted = HostedCredentials {
            api_base: Some("https://hosted".into()),
            api_key: SecretString::from("hosted-key".to_string()),
        };
        let vault = vault().with_hosted(Some(hosted));

        // Ciphertext on a system record would fail to decrypt if it were read
        let mut record = ProviderRecord::system("t1");
        record.encrypted_config = Some(r#"{"api_key": "other:zzz"}"#.into());

        let resolved = vault.resolve(&record).unwrap();
        assert_eq!(key(&resolved), Some("hosted-key"));
        assert_eq!(resolved.api_base.as_deref(), Some("https://hosted"));
    }

    #[test]
    fn test_system_record_without_hosted_is_unset() {
        let resolved = vault().resolve(&ProviderRecord::system("t1")).unwrap();
        assert!(resolved.api_key.is_none());
        assert!(resolved.api_base.is_none());
    }

    #[test]
    fn test_obfuscate_masks_key_only() {
        let resolved = ResolvedCredentials {
            api_base: Some("https://x/v1beta".into()),
            api_key: Some(SecretString::from("AIzaSyD-123456".to_string())),
        };
        let display = vault().obfuscate(&resolved);
        assert_eq!(display.api_base.as_deref(), Some("https://x/v1beta"));
        let masked = display.api_key.unwrap();
        assert!(masked.chars().all(|c| c == '*'));
        assert!(!masked.contains("AIza"));
    }

    #[test]
    fn test_debug_redacts_key() {
        let resolved = ResolvedCredentials {
            api_base: None,
            api_key: Some(SecretString::from("plain-secret".to_string())),
        };
        assert!(!format!("{:?}", resolved).contains("plain-secret"));
        assert!(!format!("{:?}", ProviderCredentials::new("plain-secret")).contains("plain-secret"));
    }

    proptest! {
        #[test]
        fn prop_obfuscation_never_leaks(secret in "\\PC{4,64}") {
            let masked = obfuscate_token(&secret);
            prop_assert_ne!(&masked, &secret);
            prop_assert!(!masked.contains(secret.as_str()));
        }

        #[test]
        fn prop_round_trip(secret in "[A-Za-z0-9_-]{1,48}") {
            let tenant = TenantId::new("tenant");
            let vault = vault();
            let stored = vault.encrypt(&tenant, &ProviderCredentials::new(secret.clone())).unwrap();
            let resolved = vault.resolve_stored(&tenant, &stored).unwrap();
            prop_assert_eq!(key(&resolved), Some(secret.as_str()));
        }
    }
}
