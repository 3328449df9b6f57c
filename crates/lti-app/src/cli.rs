use clap::Parser;

/// LTI-Bot: a terminal client for the long-term stock investment assistant.
#[derive(Parser, Debug)]
#[command(name = "lti", version, about)]
pub struct Args {
    /// Config file path override.
    #[arg(long)]
    pub config: Option<String>,

    /// Assistant WebSocket URL, overriding `[connection] url`.
    #[arg(long)]
    pub url: Option<String>,

    /// Log filter override (e.g. debug, lti_chat=trace).
    #[arg(long)]
    pub log_level: Option<String>,
}

pub fn parse() -> Args {
    Args::parse()
}
