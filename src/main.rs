use clap::{Parser, Subcommand};
use std::process::ExitCode;
use tokio::runtime::Runtime;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use modelbridge::cli::commands::generate::GenerateOptions;
use modelbridge::cli::{RecordArgs, parse_message, parse_param, requested_params};
use modelbridge::types::{ModelType, PromptMessage};

#[derive(Parser)]
#[command(name = "modelbridge")]
#[command(
    version,
    about = "Provider abstraction for LLM backends: parameter rules, credential vault, portable errors"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, global = true)]
    verbose: bool,

    #[arg(long, short, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List models in the catalog
    Models {
        #[arg(long = "type", default_value = "text-generation", help = "Model type: text-generation, embeddings")]
        model_type: ModelType,
        #[arg(short = 'f', long, default_value = "text", help = "Output format: text, json")]
        format: String,
    },

    /// Show parameter rules for a model
    Rules {
        #[arg(help = "Model name")]
        model: String,
        #[arg(short = 'f', long, default_value = "text", help = "Output format: text, json")]
        format: String,
    },

    /// Clamp and round requested parameters against a model's rules
    Normalize {
        #[arg(help = "Model name")]
        model: String,
        #[arg(short = 'p', long = "param", value_parser = parse_param, help = "Parameter as name=value (repeatable)")]
        params: Vec<(String, f64)>,
        #[arg(short = 'f', long, default_value = "text", help = "Output format: text, json")]
        format: String,
    },

    /// Encrypt provider credentials for storage
    Encrypt {
        #[arg(long, short = 't', help = "Tenant that owns the credentials")]
        tenant: String,
        #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true, help = "API key to encrypt")]
        api_key: String,
        #[arg(long, help = "Custom API base URL")]
        api_base: Option<String>,
    },

    /// Resolve stored credentials and show them masked
    Resolve {
        #[command(flatten)]
        record: RecordArgs,
        #[arg(short = 'f', long, default_value = "text", help = "Output format: text, json")]
        format: String,
    },

    /// Validate credentials with a live request
    Validate {
        #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true, help = "API key to validate")]
        api_key: String,
        #[arg(long, help = "Custom API base URL")]
        api_base: Option<String>,
    },

    /// Generate a completion
    Generate {
        #[command(flatten)]
        record: RecordArgs,
        #[arg(long, short = 'm', default_value = "gemini-pro", help = "Model to use")]
        model: String,
        #[arg(short = 'p', long = "param", value_parser = parse_param, help = "Parameter as name=value (repeatable)")]
        params: Vec<(String, f64)>,
        #[arg(long, help = "Stop sequence (repeatable)")]
        stop: Vec<String>,
        #[arg(long = "message", value_parser = parse_message, help = "Prior turn as role:content (repeatable)")]
        messages: Vec<PromptMessage>,
        #[arg(long, help = "System prompt")]
        system_prompt: Option<String>,
        #[arg(short = 'f', long, default_value = "text", help = "Output format: text, json")]
        format: String,
        #[arg(help = "Prompt text")]
        prompt: Option<String>,
    },

    /// Count tokens for a text
    Tokens {
        #[command(flatten)]
        record: RecordArgs,
        #[arg(long, short = 'm', default_value = "gemini-pro", help = "Model to use")]
        model: String,
        #[arg(help = "Text to count")]
        text: String,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration (merged from all sources, secrets omitted)
    Show {
        #[arg(short = 'g', long, help = "Show global config file only")]
        global: bool,
        #[arg(short = 'f', long, default_value = "text", help = "Output format: text, json")]
        format: String,
    },
    /// Show configuration file paths
    Path,
    /// Initialize configuration with a new vault key
    Init {
        #[arg(long, short, help = "Initialize global config")]
        global: bool,
        #[arg(long, help = "Overwrite existing config")]
        force: bool,
    },
}

/// Set up panic handler for graceful error reporting
fn setup_panic_handler() {
    let default_hook = std::panic::take_hook();

    std::panic::set_hook(Box::new(move |panic_info| {
        let message = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };

        eprintln!("\n\x1b[1;31m━━━ PANIC ━━━\x1b[0m");
        eprintln!("\x1b[31mmodelbridge encountered an unexpected error:\x1b[0m");
        eprintln!("  {}", message);

        if let Some(location) = panic_info.location() {
            eprintln!(
                "\x1b[90mLocation: {}:{}:{}\x1b[0m",
                location.file(),
                location.line(),
                location.column()
            );
        }
        eprintln!();

        // Call default hook for backtrace (if RUST_BACKTRACE=1)
        default_hook(panic_info);
    }));
}

fn main() -> ExitCode {
    setup_panic_handler();

    match run_cli() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("\x1b[31mError:\x1b[0m {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "warn"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    use modelbridge::cli::commands::{config, credentials, generate, models};

    match cli.command {
        Commands::Models { model_type, format } => {
            models::list(model_type, &format)?;
        }
        Commands::Rules { model, format } => {
            models::rules(&model, &format)?;
        }
        Commands::Normalize {
            model,
            params,
            format,
        } => {
            models::normalize(&model, &requested_params(params), &format)?;
        }
        Commands::Encrypt {
            tenant,
            api_key,
            api_base,
        } => {
            credentials::encrypt(&tenant, api_key, api_base)?;
        }
        Commands::Resolve { record, format } => {
            credentials::resolve(&record, &format)?;
        }
        Commands::Validate { api_key, api_base } => {
            let rt = Runtime::new()?;
            rt.block_on(credentials::validate(api_key, api_base))?;
        }
        Commands::Generate {
            record,
            model,
            params,
            stop,
            messages,
            system_prompt,
            format,
            prompt,
        } => {
            if prompt.is_none() && messages.is_empty() {
                anyhow::bail!("Provide a prompt or at least one --message");
            }
            let rt = Runtime::new()?;
            rt.block_on(generate::generate(GenerateOptions {
                record,
                model,
                params: requested_params(params),
                stop,
                messages,
                system_prompt,
                prompt,
                format,
            }))?;
        }
        Commands::Tokens {
            record,
            model,
            text,
        } => {
            let rt = Runtime::new()?;
            rt.block_on(generate::tokens(&record, &model, &text))?;
        }
        Commands::Config { action } => match action {
            ConfigAction::Show { global, format } => {
                config::show(global, &format)?;
            }
            ConfigAction::Path => {
                config::path()?;
            }
            ConfigAction::Init { global, force } => {
                if global {
                    config::init_global(force)?;
                } else {
                    config::init_project(force)?;
                }
            }
        },
    }

    Ok(())
}
