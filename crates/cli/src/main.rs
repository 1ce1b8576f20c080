use std::{path::PathBuf, process};

use clap::{Parser, Subcommand};
use fleet_client::{ApiClient, ClientConfig, DEFAULT_API_URL, PageStream};
use serde::Serialize;
use tracing::Level;

mod config;
mod devices;
mod history;
mod hooks;
mod output;
mod session;

use config::CliConfig;
use output::{OutputFormat, Render};

#[derive(Clone, Debug)]
pub struct Context {
    pub config_path: PathBuf,
    pub config: CliConfig,
    pub api_url: String,
    pub token: Option<String>,
    pub format: OutputFormat,
}

impl Context {
    /// Authenticated client for the configured service
    pub fn client(&self) -> Result<ApiClient, String> {
        let token = self
            .token
            .as_ref()
            .ok_or("Not logged in. Run `fleet login` or pass --token.")?;
        ApiClient::new(ClientConfig::new(&self.api_url).with_token(token))
            .map_err(|e| format!("Invalid API URL {}: {}", self.api_url, e))
    }

    /// Client without credentials, for logging in
    pub fn anonymous_client(&self) -> Result<ApiClient, String> {
        ApiClient::new(ClientConfig::new(&self.api_url))
            .map_err(|e| format!("Invalid API URL {}: {}", self.api_url, e))
    }

    /// Start a listing and print its batches as they arrive
    pub async fn print_stream<T, F>(&self, start: F) -> Result<(), String>
    where
        T: Render + Serialize + Send + 'static,
        F: FnOnce(&ApiClient, &PageStream<T>) -> PageStream<T>,
    {
        let client = self.client()?;
        let stream = PageStream::new();
        output::attach_stdout(&stream, self.format);
        start(&client, &stream)
            .wait()
            .await
            .map_err(|e| e.to_string())
    }
}

#[derive(Parser, Debug)]
#[clap(author, version, about = "Fleet - device fleet management CLI", long_about = None)]
struct Opts {
    /// Base URL of the fleet service
    #[arg(long = "api-url", global = true, env = "FLEET_API_URL")]
    api_url: Option<String>,

    /// API token (overrides the one saved by `fleet login`)
    #[arg(long = "token", global = true, env = "FLEET_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Path to the config file (default: <config dir>/fleet/config.toml)
    #[arg(long = "config", global = true, env = "FLEET_CONFIG")]
    config: Option<PathBuf>,

    /// Output format: json or pretty (default: pretty)
    #[arg(long = "format", short = 'f', global = true, default_value = "pretty")]
    format: OutputFormat,

    /// Log requests and pagination to stderr
    #[arg(long = "verbose", short = 'v', global = true, default_value = "false")]
    verbose: bool,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, PartialEq, Clone, Debug)]
enum Command {
    /// Save credentials for the fleet service
    Login(session::LoginCommand),
    /// Forget saved credentials
    Logout,
    /// Show the configured service and login state
    Status,
    /// Device commands
    Devices {
        #[clap(subcommand)]
        command: devices::DevicesCommand,
    },
    /// List segments
    Segments,
    /// List packages
    Packages,
    /// List saved device filters
    Filters,
    /// List API tokens
    Tokens,
    /// Webhook commands
    Hooks {
        #[clap(subcommand)]
        command: hooks::HooksCommand,
    },
    /// List package updates of a device
    Updates(history::UpdatesCommand),
    /// List events of a device, newest first
    Events(history::EventsCommand),
}

#[tokio::main]
async fn main() {
    // .env must be loaded before parsing so it can feed the env-backed flags
    load_env_file();

    let opts: Opts = match Opts::try_parse() {
        Ok(opts) => opts,
        Err(e) => {
            let _ = e.print();
            process::exit(e.exit_code());
        }
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(if opts.verbose {
            Level::DEBUG
        } else {
            Level::WARN
        })
        .init();

    let ctx = match build_context(&opts) {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    if let Err(e) = handle_command(opts.command, &ctx).await {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Load environment variables from a .env file in the working directory
fn load_env_file() {
    match dotenvy::dotenv() {
        Ok(path) => {
            eprintln!("✓ Loaded environment from {}", path.display());
        }
        Err(e) if e.not_found() => {
            // .env file not found is fine, just continue silently
        }
        Err(e) => {
            eprintln!("Warning: Failed to load .env file: {}", e);
        }
    }
}

/// Flags and environment win over the config file, which wins over defaults
fn build_context(opts: &Opts) -> Result<Context, String> {
    let config_path = match &opts.config {
        Some(path) => path.clone(),
        None => CliConfig::default_path()?,
    };
    let config = CliConfig::load(&config_path)?;

    let api_url = opts
        .api_url
        .clone()
        .or_else(|| config.api_url.clone())
        .unwrap_or_else(|| DEFAULT_API_URL.to_string());
    let token = opts.token.clone().or_else(|| config.token.clone());

    Ok(Context {
        config_path,
        config,
        api_url,
        token,
        format: opts.format,
    })
}

async fn handle_command(command: Command, ctx: &Context) -> Result<(), String> {
    match command {
        Command::Login(cmd) => cmd.execute(ctx).await,
        Command::Logout => session::logout(ctx),
        Command::Status => session::status(ctx),
        Command::Devices { command } => command.execute(ctx).await,
        Command::Segments => ctx.print_stream(|client, s| client.list_segments(s)).await,
        Command::Packages => ctx.print_stream(|client, s| client.list_packages(s)).await,
        Command::Filters => ctx.print_stream(|client, s| client.list_filters(s)).await,
        Command::Tokens => ctx.print_stream(|client, s| client.list_tokens(s)).await,
        Command::Hooks { command } => command.execute(ctx).await,
        Command::Updates(cmd) => cmd.execute(ctx).await,
        Command::Events(cmd) => cmd.execute(ctx).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Opts {
        Opts::try_parse_from(std::iter::once("fleet").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_flags_override_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        CliConfig {
            api_url: Some("https://from-file.example.com".into()),
            token: Some("file-token".into()),
            user: None,
        }
        .save(&path)
        .unwrap();

        let config_arg = path.to_str().unwrap();
        let ctx = build_context(&parse(&["--config", config_arg, "status"])).unwrap();
        assert_eq!(ctx.api_url, "https://from-file.example.com");
        assert_eq!(ctx.token.as_deref(), Some("file-token"));

        let ctx = build_context(&parse(&[
            "--config",
            config_arg,
            "--api-url",
            "http://localhost:8080",
            "--token",
            "flag-token",
            "status",
        ]))
        .unwrap();
        assert_eq!(ctx.api_url, "http://localhost:8080");
        assert_eq!(ctx.token.as_deref(), Some("flag-token"));
    }

    #[test]
    fn test_client_requires_token() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let ctx = build_context(&parse(&["--config", path.to_str().unwrap(), "segments"])).unwrap();
        assert_eq!(ctx.api_url, DEFAULT_API_URL);
        if ctx.token.is_none() {
            assert!(ctx.client().is_err());
        }
    }

    #[test]
    fn test_parse_subcommands() {
        let opts = parse(&["--format", "json", "devices", "list", "--all-segments"]);
        assert_eq!(opts.format, OutputFormat::Json);
        assert!(matches!(opts.command, Command::Devices { .. }));

        let opts = parse(&["events", "dev-1", "--since", "2024-01-01T00:00:00Z"]);
        assert!(matches!(opts.command, Command::Events(_)));
    }
}
