use std::path::{Path, PathBuf};
use std::process::{ExitCode, ExitStatus};
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use rexctl::env_file::{DEFAULT_ENV_FILE, EnvRecord};
use rexctl::lifecycle::{self, LaunchOptions, PollPolicy, ServerCommand};
use rexctl::{Config, OllamaClient, RegisterOptions, TelegramClient, WebhookRegistrar};

/// rexctl - Env loading, webhook registration and Ollama lifecycle for Rex
#[derive(Parser)]
#[command(name = "rexctl", version, about)]
struct Cli {
    /// Env file to load
    #[arg(long, env = "REX_ENV_FILE", default_value = DEFAULT_ENV_FILE, global = true)]
    env_file: PathBuf,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Total timeout for outbound HTTP requests, in seconds
    #[arg(long, global = true)]
    http_timeout_secs: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Load the env file and show, export or apply it
    Env {
        /// Print `export KEY='value'` lines for `eval`
        #[arg(long, conflicts_with = "command")]
        shell: bool,

        /// Command to run with the loaded variables
        #[arg(last = true)]
        command: Vec<String>,
    },
    /// Manage the Telegram webhook
    Webhook {
        #[command(subcommand)]
        action: WebhookAction,
    },
    /// Stop any running Ollama and start it in the foreground
    Serve {
        /// Port the server listens on (defaults to the configured port)
        #[arg(long)]
        port: Option<u16>,

        #[command(flatten)]
        poll: PollArgs,

        /// Do not try to stop an existing server
        #[arg(long)]
        skip_stop: bool,
    },
    /// Check whether Ollama answers
    Health {
        /// Poll until the server is ready
        #[arg(long)]
        wait: bool,

        #[command(flatten)]
        poll: PollArgs,
    },
}

#[derive(Subcommand)]
enum WebhookAction {
    /// Register the webhook, creating the secret if needed
    Set {
        /// Fail when Telegram rejects the call
        #[arg(long)]
        strict: bool,

        /// Also send the secret as `secret_token`
        #[arg(long)]
        secret_header: bool,

        /// Drop updates queued while no webhook was set
        #[arg(long)]
        drop_pending: bool,
    },
    /// Remove the webhook and show the resulting state
    Delete {
        /// Fail when Telegram rejects the call
        #[arg(long)]
        strict: bool,
    },
    /// Show the current webhook
    Info,
    /// Print the webhook URL without contacting Telegram
    Url,
}

#[derive(clap::Args)]
struct PollArgs {
    /// Maximum number of checks
    #[arg(long, default_value = "20")]
    attempts: u32,

    /// Delay between checks, in milliseconds
    #[arg(long, default_value = "500")]
    interval_ms: u64,
}

impl PollArgs {
    const fn policy(&self) -> PollPolicy {
        PollPolicy {
            attempts: self.attempts,
            interval: Duration::from_millis(self.interval_ms),
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "warn,rexctl=info",
        1 => "info,rexctl=debug",
        2 => "debug",
        _ => "trace",
    };

    // stdout is reserved for command output
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    match cli.command {
        Command::Env { shell, command } => cmd_env(&cli.env_file, shell, &command).await,
        Command::Webhook { action } => {
            let config = load_config(&cli.env_file, cli.http_timeout_secs)?;
            cmd_webhook(&config, &action).await?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Serve {
            port,
            poll,
            skip_stop,
        } => {
            let (mut config, record) = Config::load(&cli.env_file)?;
            if let Some(port) = port {
                config.ollama.port = port;
            }
            let options = LaunchOptions {
                poll: poll.policy(),
                skip_stop,
                ..LaunchOptions::default()
            };
            cmd_serve(&config, &record, &options).await
        }
        Command::Health { wait, poll } => {
            let config = load_config(&cli.env_file, cli.http_timeout_secs)?;
            cmd_health(&config, wait, poll.policy()).await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn load_config(env_file: &Path, http_timeout_secs: Option<u64>) -> anyhow::Result<Config> {
    let (mut config, _) = Config::load(env_file)?;
    if let Some(secs) = http_timeout_secs {
        config.http.timeout = Duration::from_secs(secs);
    }
    tracing::debug!(?config, "loaded configuration");
    Ok(config)
}

/// Show, export or apply the env file
async fn cmd_env(env_file: &Path, shell: bool, command: &[String]) -> anyhow::Result<ExitCode> {
    let record = EnvRecord::load(env_file)?;

    if shell {
        // stdout is evaluated by the calling shell
        eprint!("{}", record.summary());
        print!("{}", record.shell_exports());
        return Ok(ExitCode::SUCCESS);
    }

    let Some((program, args)) = command.split_first() else {
        print!("{}", record.summary());
        return Ok(ExitCode::SUCCESS);
    };

    eprint!("{}", record.summary());

    let mut child = std::process::Command::new(program);
    child.args(args);
    record.apply_to(&mut child);

    tracing::debug!(%program, "running command with loaded env");
    let status = tokio::process::Command::from(child)
        .status()
        .await
        .map_err(|e| anyhow::anyhow!("failed to run {program}: {e}"))?;

    Ok(exit_code(status))
}

async fn cmd_webhook(config: &Config, action: &WebhookAction) -> anyhow::Result<()> {
    let client = TelegramClient::from_config(config)?;
    let registrar = WebhookRegistrar::new(&client, config);

    match action {
        WebhookAction::Set {
            strict,
            secret_header,
            drop_pending,
        } => {
            let registration = registrar
                .register(RegisterOptions {
                    secret_header: *secret_header,
                    drop_pending_updates: *drop_pending,
                })
                .await?;
            println!("{}", registration.reply.body);
            if *strict {
                registration.reply.ensure_ok()?;
            }
        }
        WebhookAction::Delete { strict } => {
            let result = registrar.unregister().await?;
            println!("{}", result.delete.body);
            println!("{}", result.info.body);
            if *strict {
                result.delete.ensure_ok()?;
            }
        }
        WebhookAction::Info => {
            let info = registrar.info().await?;
            println!("{}", info.body);
        }
        WebhookAction::Url => {
            let (url, _) = registrar.prepare()?;
            println!("{url}");
        }
    }

    Ok(())
}

/// Relaunch the model server in the foreground
async fn cmd_serve(
    config: &Config,
    record: &EnvRecord,
    options: &LaunchOptions,
) -> anyhow::Result<ExitCode> {
    let server = ServerCommand::ollama()?;
    let status = lifecycle::relaunch(&server, &config.ollama, record, options).await?;
    Ok(exit_code(status))
}

async fn cmd_health(config: &Config, wait: bool, policy: PollPolicy) -> anyhow::Result<()> {
    let client = OllamaClient::from_config(config)?;

    let version = if wait {
        client.wait_until_ready(policy).await?
    } else {
        client.version().await?
    };

    println!("Ollama {version} is up at {}", config.ollama.url);
    Ok(())
}

fn exit_code(status: ExitStatus) -> ExitCode {
    status
        .code()
        .and_then(|code| u8::try_from(code).ok())
        .map_or(ExitCode::FAILURE, ExitCode::from)
}
