//! Credential Commands
//!
//! Usage:
//!   modelbridge encrypt -t <tenant> --api-key <key> [--api-base <url>]
//!   modelbridge resolve -t <tenant> (--stored <config> | --stored-file <path> | --system-tier)
//!   modelbridge validate --api-key <key> [--api-base <url>]
//!
//! Resolved credentials are only ever printed masked.

use crate::ai::vault::ProviderCredentials;
use crate::cli::ui::Output;
use crate::cli::util::{CommandContext, RecordArgs};
use crate::types::{Result, TenantId};

fn credentials(api_key: String, api_base: Option<String>) -> ProviderCredentials {
    let credentials = ProviderCredentials::new(api_key);
    match api_base {
        Some(base) => credentials.with_api_base(base),
        None => credentials,
    }
}

/// Encrypt credentials and print the persisted form
pub fn encrypt(tenant: &str, api_key: String, api_base: Option<String>) -> Result<()> {
    let ctx = CommandContext::load_default()?;
    let stored = ctx
        .provider
        .encrypt_provider_credentials(&TenantId::new(tenant), &credentials(api_key, api_base))?;

    println!("{}", stored.to_persisted()?);
    Ok(())
}

/// Resolve a stored record and print its display view
pub fn resolve(args: &RecordArgs, format: &str) -> Result<()> {
    let ctx = CommandContext::load_default()?;
    let record = args.record()?;
    let display = ctx.provider.get_display_credentials(&record)?;

    let out = Output::new();
    if format == "json" {
        return out.json(&display);
    }

    out.section(&format!("{} credentials ({})", ctx.provider.provider_name(), args.tenant));
    out.field(
        "api_base",
        display.api_base.as_deref().unwrap_or("(provider default)"),
    );
    out.field("api_key", display.api_key.as_deref().unwrap_or("(not set)"));

    if args.system_tier && !ctx.provider.is_system_tier_supported(ctx.config.edition) {
        out.info(&format!(
            "{} does not offer system-tier credentials on the {} edition",
            ctx.provider.provider_name(),
            ctx.config.edition
        ));
    }
    Ok(())
}

/// Run the live credential probe
pub async fn validate(api_key: String, api_base: Option<String>) -> Result<()> {
    let ctx = CommandContext::load_default()?;
    let out = Output::new();

    match ctx
        .provider
        .validate_provider_credentials(&credentials(api_key, api_base))
        .await
    {
        Ok(()) => {
            out.success("Credentials are valid");
            Ok(())
        }
        Err(e) => {
            out.error("Credentials were rejected");
            Err(e)
        }
    }
}
