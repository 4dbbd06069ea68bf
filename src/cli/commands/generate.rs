//! Generation Commands
//!
//! Usage:
//!   modelbridge generate -t <tenant> --stored <config> [-m model] [-p name=value]...
//!       [--stop SEQ]... [--message role:content]... <prompt>
//!   modelbridge tokens -t <tenant> --stored <config> [-m model] <text>
//!
//! Ctrl-C cancels an in-flight generation.

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::ai::provider::SharedAdapter;
use crate::ai::rules::RequestedParams;
use crate::cli::ui::Output;
use crate::cli::util::{CommandContext, RecordArgs};
use crate::types::{ModelType, PromptMessage, Result};

/// Options for a single generation
pub struct GenerateOptions {
    pub record: RecordArgs,
    pub model: String,
    pub params: RequestedParams,
    pub stop: Vec<String>,
    pub messages: Vec<PromptMessage>,
    pub system_prompt: Option<String>,
    pub prompt: Option<String>,
    pub format: String,
}

impl GenerateOptions {
    /// System prompt first, then history, then the prompt as the final user turn
    fn conversation(&self) -> Vec<PromptMessage> {
        let mut conversation = Vec::with_capacity(self.messages.len() + 2);
        if let Some(system) = &self.system_prompt {
            conversation.push(PromptMessage::system(system.clone()));
        }
        conversation.extend(self.messages.iter().cloned());
        if let Some(prompt) = &self.prompt {
            conversation.push(PromptMessage::user(prompt.clone()));
        }
        conversation
    }
}

fn adapter(record: &RecordArgs, model: &str, params: &RequestedParams) -> Result<SharedAdapter> {
    let ctx = CommandContext::load_default()?;
    let record = record.record()?;
    ctx.provider
        .create_model(&record, model, ModelType::TextGeneration, params)
}

/// Cancel the token on Ctrl-C
fn cancel_on_interrupt() -> CancellationToken {
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling generation");
            trigger.cancel();
        }
    });
    cancel
}

/// Generate a completion
pub async fn generate(options: GenerateOptions) -> Result<()> {
    let adapter = adapter(&options.record, &options.model, &options.params)?;
    let conversation = options.conversation();
    debug!(
        "Generating with {} ({} messages, streaming supported: {})",
        adapter.name(),
        conversation.len(),
        adapter.supports_streaming()
    );

    let cancel = cancel_on_interrupt();
    let result = adapter
        .generate(&conversation, &options.stop, &cancel)
        .await?;

    let out = Output::new();
    if options.format == "json" {
        return out.json(&serde_json::json!({
            "model": result.metadata.model,
            "content": result.content,
            "finish_reason": result.finish_reason,
            "usage": result.usage,
            "elapsed_ms": result.timing.total_ms,
            "parameters": adapter.parameters(),
        }));
    }

    println!("{}", result.content);
    out.section("Usage");
    out.field("input_tokens", result.usage.input_tokens);
    out.field("output_tokens", result.usage.output_tokens);
    out.field("elapsed_ms", result.timing.total_ms);
    if let Some(reason) = &result.finish_reason {
        out.field("finish_reason", reason);
    }
    Ok(())
}

/// Count tokens for a text
pub async fn tokens(record: &RecordArgs, model: &str, text: &str) -> Result<()> {
    let adapter = adapter(record, model, &RequestedParams::new())?;
    let count = adapter.token_count(&[PromptMessage::user(text)]).await?;
    println!("{}", count);
    Ok(())
}
