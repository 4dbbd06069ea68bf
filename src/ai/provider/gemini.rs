//! Gemini Provider
//!
//! Provider-level façade: model catalog, parameter rules, credential
//! lifecycle and adapter construction for Google Gemini.

use async_trait::async_trait;
use secrecy::ExposeSecret;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use super::{
    ClientSettings, GeminiClientFactory, GeminiModel, GenerateRequest, ModelProvider, Prompt,
    SharedAdapter, SharedClientFactory, gemini_rules, list_models, model_mode,
};
use crate::ai::cipher::AesGcmCipher;
use crate::ai::rules::{ModelParams, ParameterRuleSet, RequestedParams};
use crate::ai::vault::{
    CredentialVault, DisplayCredentials, ProviderCredentials, ProviderRecord,
    ResolvedCredentials, StoredCredentials, StructuredCredentials, normalize_api_base,
};
use crate::config::{Config, Edition};
use crate::constants::{gemini::PROVIDER_NAME, probe};
use crate::types::{ModelDescriptor, ModelError, ModelMode, ModelType, Result, TenantId};

/// Gemini implementation of [`ModelProvider`]
#[derive(Clone)]
pub struct GeminiProvider {
    vault: CredentialVault,
    factory: SharedClientFactory,
}

impl std::fmt::Debug for GeminiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiProvider")
            .field("vault", &self.vault)
            .finish_non_exhaustive()
    }
}

impl GeminiProvider {
    pub fn new(vault: CredentialVault, factory: SharedClientFactory) -> Self {
        Self { vault, factory }
    }

    /// Build from configuration: AES-GCM vault keyed by `vault.secret_key`,
    /// hosted credentials, and the reqwest-backed client factory.
    pub fn from_config(config: &Config) -> Result<Self> {
        let secret = config.vault.secret_key.as_deref().ok_or_else(|| {
            ModelError::Config(
                "vault.secret_key is not set (use MODELBRIDGE_VAULT__SECRET_KEY or `config init`)"
                    .to_string(),
            )
        })?;

        let vault = CredentialVault::new(Arc::new(AesGcmCipher::new(secret)?))
            .with_hosted(config.hosted_credentials());
        let factory = Arc::new(GeminiClientFactory::new(config.gemini.clone()));

        Ok(Self::new(vault, factory))
    }

    /// Validate requested parameters against a model's rules
    pub fn validate_parameters(&self, model: &str, requested: &RequestedParams) -> ModelParams {
        gemini_rules(model).validate(requested)
    }

    /// Model-level credentials are the provider-level credentials
    pub fn get_model_credentials(
        &self,
        record: &ProviderRecord,
        model: &str,
    ) -> Result<ResolvedCredentials> {
        debug!("Resolving credentials for {} via provider record", model);
        self.get_provider_credentials(record)
    }

    pub fn get_model_display_credentials(
        &self,
        record: &ProviderRecord,
        model: &str,
    ) -> Result<DisplayCredentials> {
        debug!("Resolving display credentials for {} via provider record", model);
        self.get_display_credentials(record)
    }

    /// No model-level secrets exist; always the empty structure
    pub fn encrypt_model_credentials(
        &self,
        _tenant_id: &TenantId,
        _model: &str,
        _credentials: &ProviderCredentials,
    ) -> StoredCredentials {
        StoredCredentials::Structured(StructuredCredentials::default())
    }

    fn probe_settings() -> ClientSettings {
        ClientSettings {
            temperature: Some(probe::TEMPERATURE),
            max_tokens: Some(probe::MAX_OUTPUT_TOKENS),
            top_p: Some(probe::TOP_P),
            top_k: Some(probe::TOP_K),
            ..Default::default()
        }
    }
}

#[async_trait]
impl ModelProvider for GeminiProvider {
    fn provider_name(&self) -> &str {
        PROVIDER_NAME
    }

    fn list_models(&self, model_type: ModelType) -> Vec<ModelDescriptor> {
        list_models(model_type)
    }

    fn model_mode(&self, model: &str) -> ModelMode {
        model_mode(model)
    }

    fn get_model_parameter_rules(&self, model: &str) -> ParameterRuleSet {
        gemini_rules(model)
    }

    async fn validate_provider_credentials(&self, credentials: &ProviderCredentials) -> Result<()> {
        let api_key = credentials
            .api_key
            .clone()
            .filter(|k| !k.expose_secret().is_empty())
            .ok_or_else(|| ModelError::credentials("Gemini API key is required"))?;

        let resolved = ResolvedCredentials {
            api_base: normalize_api_base(credentials.api_base.as_deref()),
            api_key: Some(api_key),
        };

        let request = GenerateRequest {
            prompt: Prompt::Text(probe::PROMPT.to_string()),
            stop: Vec::new(),
            settings: Self::probe_settings(),
        };

        let outcome = match self.factory.construct(probe::MODEL, &resolved) {
            Ok(client) => client.generate(request, &CancellationToken::new()).await,
            Err(e) => Err(e),
        };

        match outcome {
            Ok(_) => {
                info!("{} credentials validated", PROVIDER_NAME);
                Ok(())
            }
            Err(e) => {
                error!("{} credential probe failed: {}", PROVIDER_NAME, e);
                Err(ModelError::CredentialsValidation {
                    message: e.to_string(),
                    source: Some(e),
                })
            }
        }
    }

    fn validate_model_credentials(
        &self,
        _model: &str,
        _model_type: ModelType,
        _credentials: &ProviderCredentials,
    ) -> Result<()> {
        Ok(())
    }

    fn encrypt_provider_credentials(
        &self,
        tenant_id: &TenantId,
        credentials: &ProviderCredentials,
    ) -> Result<StoredCredentials> {
        self.vault.encrypt(tenant_id, credentials)
    }

    fn get_provider_credentials(&self, record: &ProviderRecord) -> Result<ResolvedCredentials> {
        self.vault.resolve(record)
    }

    fn get_display_credentials(&self, record: &ProviderRecord) -> Result<DisplayCredentials> {
        self.vault.display(record)
    }

    fn is_system_tier_supported(&self, _edition: Edition) -> bool {
        false
    }

    fn billable(&self) -> bool {
        false
    }

    fn create_model(
        &self,
        record: &ProviderRecord,
        model: &str,
        model_type: ModelType,
        requested: &RequestedParams,
    ) -> Result<SharedAdapter> {
        if model_type != ModelType::TextGeneration {
            return Err(ModelError::UnsupportedModelType {
                provider: PROVIDER_NAME.to_string(),
                model_type,
            });
        }

        let credentials = self.get_model_credentials(record, model)?;
        let adapter = GeminiModel::new(model, &credentials, requested, self.factory.as_ref())?;
        Ok(Arc::new(adapter))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::cipher::TokenCipher;
    use crate::ai::provider::{ClientFactory, LlmClient, LlmResult};
    use crate::ai::rules::ParamKind;
    use crate::types::{BackendError, ErrorKind};
    use std::sync::Mutex;

    struct PlainCipher;

    impl TokenCipher for PlainCipher {
        fn encrypt(&self, _tenant_id: &TenantId, plaintext: &str) -> Result<String> {
            Ok(format!("enc:{}", plaintext))
        }

        fn decrypt(&self, _tenant_id: &TenantId, ciphertext: &str) -> Result<String> {
            ciphertext
                .strip_prefix("enc:")
                .map(str::to_string)
                .ok_or_else(|| ModelError::Decryption("bad ciphertext".into()))
        }
    }

    /// Backend stand-in: accepts exactly one key
    struct ProbeClient {
        valid: bool,
        seen: Arc<Mutex<Vec<GenerateRequest>>>,
    }

    #[async_trait]
    impl LlmClient for ProbeClient {
        async fn generate(
            &self,
            request: GenerateRequest,
            _cancel: &CancellationToken,
        ) -> std::result::Result<LlmResult, BackendError> {
            self.seen.lock().unwrap().push(request);
            if self.valid {
                Ok(LlmResult::content_only("p"))
            } else {
                Err(BackendError::Authentication("API key not valid".into()))
            }
        }

        async fn count_tokens(&self, _text: &str) -> std::result::Result<i64, BackendError> {
            Ok(0)
        }
    }

    #[derive(Default)]
    struct ProbeFactory {
        seen: Arc<Mutex<Vec<GenerateRequest>>>,
        models: Mutex<Vec<(String, Option<String>)>>,
    }

    impl ClientFactory for ProbeFactory {
        fn construct(
            &self,
            model: &str,
            credentials: &ResolvedCredentials,
        ) -> std::result::Result<Arc<dyn LlmClient>, BackendError> {
            let key = credentials
                .api_key
                .as_ref()
                .map(|k| k.expose_secret().to_string())
                .ok_or_else(|| BackendError::Authentication("Gemini API key is required".into()))?;
            self.models
                .lock()
                .unwrap()
                .push((model.to_string(), credentials.api_base.clone()));
            Ok(Arc::new(ProbeClient {
                valid: key == "good-key",
                seen: self.seen.clone(),
            }))
        }
    }

    fn provider() -> (GeminiProvider, Arc<ProbeFactory>) {
        let factory = Arc::new(ProbeFactory::default());
        let provider = GeminiProvider::new(
            CredentialVault::new(Arc::new(PlainCipher)),
            factory.clone(),
        );
        (provider, factory)
    }

    #[test]
    fn test_catalog() {
        let (provider, _) = provider();
        assert_eq!(provider.provider_name(), "gemini");

        let models = provider.list_models(ModelType::TextGeneration);
        let ids: Vec<_> = models.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["gemini-pro", "gemini-pro-vision"]);
        assert!(models.iter().all(|m| m.mode == ModelMode::Chat));

        assert!(provider.list_models(ModelType::Embeddings).is_empty());
        assert_eq!(provider.model_mode("gemini-pro"), ModelMode::Chat);
    }

    #[test]
    fn test_policy_flags() {
        let (provider, _) = provider();
        assert!(!provider.billable());
        assert!(!provider.is_system_tier_supported(Edition::SelfHosted));
        assert!(!provider.is_system_tier_supported(Edition::Cloud));
    }

    #[tokio::test]
    async fn test_probe_with_valid_key() {
        let (provider, factory) = provider();
        let creds = ProviderCredentials::new("good-key").with_api_base("https://proxy.local");

        provider.validate_provider_credentials(&creds).await.unwrap();

        let (model, base) = factory.models.lock().unwrap()[0].clone();
        assert_eq!(model, "gemini-pro");
        assert_eq!(base.as_deref(), Some("https://proxy.local/v1beta"));

        let seen = factory.seen.lock().unwrap();
        let settings = &seen[0].settings;
        assert_eq!(seen[0].prompt, Prompt::Text("ping".into()));
        assert_eq!(settings.temperature, Some(0.9));
        assert_eq!(settings.top_p, Some(1.0));
        assert_eq!(settings.top_k, Some(1));
        assert_eq!(settings.max_tokens, Some(1));
    }

    #[tokio::test]
    async fn test_probe_failure_keeps_raw_cause() {
        let (provider, _) = provider();
        let err = provider
            .validate_provider_credentials(&ProviderCredentials::new("bad-key"))
            .await
            .unwrap_err();

        match err {
            ModelError::CredentialsValidation {
                message,
                source: Some(BackendError::Authentication(raw)),
            } => {
                assert_eq!(raw, "API key not valid");
                assert!(message.contains("API key not valid"));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_probe_requires_key() {
        let (provider, factory) = provider();
        let err = provider
            .validate_provider_credentials(&ProviderCredentials::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ModelError::CredentialsValidation { source: None, .. }
        ));
        assert!(factory.seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_create_model_end_to_end() {
        let (provider, _) = provider();
        let tenant = TenantId::new("t1");
        let stored = provider
            .encrypt_provider_credentials(&tenant, &ProviderCredentials::new("good-key"))
            .unwrap();
        let record = ProviderRecord::custom("t1", stored.to_persisted().unwrap());

        let requested: RequestedParams = [("max_tokens".to_string(), 999_999.0)].into();
        let adapter = provider
            .create_model(&record, "gemini-pro", ModelType::TextGeneration, &requested)
            .unwrap();
        assert_eq!(adapter.parameters().get(ParamKind::MaxTokens), Some(4096.0));

        let display = provider.get_display_credentials(&record).unwrap();
        assert!(display.api_key.unwrap().chars().all(|c| c == '*'));
    }

    #[test]
    fn test_create_model_rejects_embeddings() {
        let (provider, _) = provider();
        let err = provider
            .create_model(
                &ProviderRecord::system("t1"),
                "gemini-pro",
                ModelType::Embeddings,
                &RequestedParams::new(),
            )
            .err()
            .unwrap();
        assert!(matches!(err, ModelError::UnsupportedModelType { .. }));
    }

    #[test]
    fn test_create_model_without_credentials_is_auth_failure() {
        let (provider, _) = provider();
        let err = provider
            .create_model(
                &ProviderRecord::system("t1"),
                "gemini-pro",
                ModelType::TextGeneration,
                &RequestedParams::new(),
            )
            .err()
            .unwrap();
        assert_eq!(err.kind(), Some(ErrorKind::AuthorizationFailure));
    }

    #[test]
    fn test_model_level_credentials() {
        let (provider, _) = provider();
        let tenant = TenantId::new("t1");
        assert_eq!(
            provider.encrypt_model_credentials(&tenant, "gemini-pro", &ProviderCredentials::new("k")),
            StoredCredentials::Structured(StructuredCredentials::default())
        );
        assert!(
            provider
                .validate_model_credentials("gemini-pro", ModelType::TextGeneration, &ProviderCredentials::default())
                .is_ok()
        );

        let record = ProviderRecord::custom("t1", r#"{"api_key": "enc:abc"}"#);
        let creds = provider.get_model_credentials(&record, "gemini-pro").unwrap();
        assert_eq!(creds.api_key.unwrap().expose_secret(), "abc");

        let display = provider
            .get_model_display_credentials(&record, "gemini-pro")
            .unwrap();
        assert_eq!(display.api_key.as_deref(), Some("***"));
        assert_eq!(display, provider.get_display_credentials(&record).unwrap());
    }

    #[test]
    fn test_validate_parameters() {
        let (provider, _) = provider();
        let requested: RequestedParams = [("temperature".to_string(), 0.12345)].into();
        let params = provider.validate_parameters("gemini-pro", &requested);
        assert_eq!(params.temperature(), Some(0.12));
    }
}
