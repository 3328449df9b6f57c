mod cli;
mod input;
mod render;

use std::path::Path;
use std::process::ExitCode;

use lti_chat::{ChatClient, ChatHandle, Role};
use lti_common::{ConfigError, LtiError};
use lti_config::{LogLevel, LtiConfig};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use input::Input;
use render::{PlainRenderer, Renderer};

const DEFAULT_LOG_FILTER: &str = "lti=info";

/// `--log-level` wins, then `RUST_LOG`, then the config file.
fn init_logging(cli_level: Option<&str>, config_level: LogLevel) {
    let directive = match cli_level {
        Some(level) => level.to_string(),
        None => std::env::var(EnvFilter::DEFAULT_ENV)
            .unwrap_or_else(|_| format!("lti={}", config_level.as_directive())),
    };
    let filter =
        EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Load the config, falling back to defaults only when the file cannot
/// be read or parsed. The error is returned so it can be logged once
/// logging is up.
fn load_config(path: Option<&str>) -> (LtiConfig, Option<ConfigError>) {
    let loaded = match path {
        Some(path) => lti_config::load_config_from(Path::new(path)),
        None => lti_config::load_config(),
    };
    match loaded {
        Ok(config) => (config, None),
        Err(e) => (LtiConfig::default(), Some(e)),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = cli::parse();

    let (mut config, config_error) = load_config(args.config.as_deref());
    init_logging(args.log_level.as_deref(), config.logging.level);

    tracing::info!("LTI-Bot v{} starting...", env!("CARGO_PKG_VERSION"));
    if let Some(ref path) = args.config {
        tracing::info!("Using config override: {path}");
    }
    if let Some(e) = config_error {
        tracing::warn!("Config load failed, using defaults: {e}");
    }
    if let Some(url) = args.url {
        config.connection.url = url;
    }
    if let Err(e) = lti_config::validation::validate(&config) {
        tracing::warn!("Using config with invalid values: {e}");
    }
    tracing::info!(url = %config.connection.url, "Config loaded");

    match run(config).await {
        Ok(()) => {
            tracing::info!("Shutdown complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: LtiConfig) -> Result<(), LtiError> {
    let examples = config.session.example_questions.clone();
    let mut renderer = PlainRenderer::new(
        std::io::stdout(),
        config.session.bot_name.clone(),
        examples.clone(),
    );

    let (handle, mut updates) = ChatClient::new(&config).start();
    renderer.session(&handle.snapshot().await?.messages)?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            update = updates.recv() => match update {
                Some(update) => renderer.update(&update)?,
                None => break,
            },
            line = lines.next_line() => match line? {
                Some(line) => {
                    let input = input::parse(&line);
                    if !dispatch(&handle, &mut renderer, &examples, input).await? {
                        break;
                    }
                }
                None => break,
            },
        }
    }

    if let Err(e) = handle.shutdown().await {
        tracing::debug!("Driver already stopped: {e}");
    }
    Ok(())
}

/// Act on one input line. Returns `false` when the user wants to quit.
async fn dispatch(
    handle: &ChatHandle,
    renderer: &mut impl Renderer,
    examples: &[String],
    input: Input,
) -> Result<bool, LtiError> {
    match input {
        Input::Question(text) => submit(handle, text).await?,
        Input::Example(n) => match examples.get(n - 1) {
            Some(question) => submit(handle, question.clone()).await?,
            None => renderer.note(&format!("There is no example question {n}."))?,
        },
        Input::New => handle.reset().await?,
        Input::Toggle => {
            let snapshot = handle.snapshot().await?;
            let last = snapshot
                .messages
                .iter()
                .rev()
                .find(|m| m.role() == Role::User && !m.is_open() && !m.reasoning().is_empty());
            match last {
                Some(message) => {
                    handle.toggle_reasoning(message.id().clone()).await?;
                }
                None => renderer.note("No reasoning to show yet.")?,
            }
        }
        Input::Dismiss => handle.dismiss_limit_notice().await?,
        Input::Help => renderer.help()?,
        Input::Quit => return Ok(false),
        Input::Invalid(message) => renderer.note(&message)?,
    }
    Ok(true)
}

/// Refusals are already shown as notices by the session.
async fn submit(handle: &ChatHandle, text: String) -> Result<(), LtiError> {
    match handle.submit(text).await {
        Ok(id) => tracing::debug!(message_id = %id, "Question sent"),
        Err(LtiError::Rejected(rejection)) => tracing::debug!(%rejection, "Question refused"),
        Err(e) => return Err(e),
    }
    Ok(())
}
