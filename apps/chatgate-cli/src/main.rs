//! ChatGate - chat dispatch to Bedrock, OpenAI and Anthropic from the command line.
//!
//! Settings are kept in a JSON file in the same shape the settings form
//! writes (`apiProvider`, `apiKeys`, `selectedModel`, ...). Every command first
//! runs the startup model repair.
//!
//! # Usage
//!
//! ```text
//! chatgate chat [--system <prompt>] <message...>
//! chatgate repair
//! chatgate reset-model
//! chatgate settings
//! ```
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `CHATGATE_SETTINGS_PATH` | `chatgate-settings.json` | Settings file |
//! | `LOG_LEVEL` | `info` | Log level filter |
//! | `RUST_LOG` | *(unset)* | Fine-grained tracing filter (overrides `LOG_LEVEL`) |

use std::sync::Arc;

use anyhow::{Context, Result};
use chatgate_core::{
    ChatGateConfig, ChatMessage, ChatRequest, JsonFileSettingsStore, ModelCatalog, RepairOutcome,
    Settings, SettingsLoader, SettingsStore, bootstrap, repair_selected_model, reset_model,
    settings::keys,
};
use chatgate_provider::{Dispatcher, ReqwestTransport};
use tracing::info;
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage: chatgate <chat [--system <prompt>] <message...> | repair | reset-model | settings>";

/// A parsed command line.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Chat {
        system: Option<String>,
        message: String,
    },
    Repair,
    ResetModel,
    Settings,
}

/// Initialize the tracing subscriber.
///
/// Uses `RUST_LOG` if set, otherwise falls back to the `LOG_LEVEL` config value.
/// Logs go to stderr so stdout carries only command output.
fn init_tracing(log_level: &str) -> Result<()> {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::try_new(log_level)
            .with_context(|| format!("invalid log level filter: {log_level}"))?
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    Ok(())
}

fn parse_command(args: &[String]) -> Result<Command> {
    let Some((name, rest)) = args.split_first() else {
        anyhow::bail!("{USAGE}");
    };

    match name.as_str() {
        "chat" => {
            let (system, words) = match rest {
                [flag, prompt, words @ ..] if flag == "--system" => (Some(prompt.clone()), words),
                [flag] if flag == "--system" => anyhow::bail!("--system requires a prompt"),
                words => (None, words),
            };
            if words.is_empty() {
                anyhow::bail!("chat requires a message");
            }
            Ok(Command::Chat {
                system,
                message: words.join(" "),
            })
        }
        "repair" if rest.is_empty() => Ok(Command::Repair),
        "reset-model" if rest.is_empty() => Ok(Command::ResetModel),
        "settings" if rest.is_empty() => Ok(Command::Settings),
        _ => anyhow::bail!("{USAGE}"),
    }
}

fn describe(outcome: &RepairOutcome) -> String {
    match outcome {
        RepairOutcome::Unchanged => "selected model unchanged".to_owned(),
        RepairOutcome::Repaired { provider, from, to } => {
            format!("{provider} model changed from {from:?} to {to:?}")
        }
    }
}

async fn run(
    command: Command,
    store: Arc<JsonFileSettingsStore>,
    catalog: Arc<ModelCatalog>,
) -> Result<()> {
    match command {
        Command::Chat { system, message } => {
            let mut request = ChatRequest::new(vec![ChatMessage::user(message)]);
            if let Some(prompt) = system {
                request = request.with_system_prompt(prompt);
            }

            let loader = SettingsLoader::new(store, catalog);
            let dispatcher = Dispatcher::new(loader, Arc::new(ReqwestTransport::new()));
            let result = dispatcher.dispatch(&request).await;

            let rendered =
                serde_json::to_string_pretty(&result).context("failed to encode dispatch result")?;
            println!("{rendered}");
        }
        Command::Repair => {
            let outcome = repair_selected_model(store.as_ref(), &catalog)
                .await
                .context("model repair failed")?;
            println!("{}", describe(&outcome));
        }
        Command::ResetModel => {
            let outcome = reset_model(store.as_ref(), &catalog)
                .await
                .context("model reset failed")?;
            println!("{}", describe(&outcome));
        }
        Command::Settings => {
            let entries = store
                .get(keys::ALL)
                .await
                .context("failed to read settings")?;
            let settings = Settings::from_map(entries).context("failed to parse settings")?;
            println!("{settings:#?}");
            match settings.validate() {
                Ok(()) => println!("settings are complete"),
                Err(e) => println!("settings are incomplete: {e}"),
            }
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = ChatGateConfig::from_env();
    init_tracing(&config.log_level)?;

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = parse_command(&args)?;

    let store = Arc::new(JsonFileSettingsStore::new(&config.settings_path));
    let catalog = Arc::new(ModelCatalog::default());
    info!(path = %store.path().display(), "Using settings file");

    let outcome = bootstrap(store.as_ref(), &catalog)
        .await
        .with_context(|| format!("failed to check settings in {}", store.path().display()))?;
    if outcome != RepairOutcome::Unchanged {
        info!(outcome = %describe(&outcome), "Repaired settings at startup");
    }

    run(command, store, catalog).await
}
