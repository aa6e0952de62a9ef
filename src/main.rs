//! CLI entry point for `mailhook`.

use std::io::Read;
use std::path::{Path, PathBuf};

use clap::{CommandFactory, Parser, Subcommand};

use mailhook::config::Config;
use mailhook::deliver::{DeliveryEngine, DeliveryOutcome, HttpTransport};
use mailhook::error::HookError;
use mailhook::pipeline::{self, Disposition, Envelope};
use mailhook::route::Router;

/// Exit status when no destination is configured for the recipient.
const EXIT_REJECTED: i32 = 2;

#[derive(Parser)]
#[command(
    name = "mailhook",
    version,
    about = "Forward inbound email to chat webhooks",
    long_about = "Turns one raw email into a webhook notification with the body \
converted to Markdown, a plain-text archive of the message and as many \
attachments as the platform allows."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (defaults to $MAILHOOK_CONFIG or the user config dir)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Forward a message to its webhook
    Send {
        /// Raw RFC 5322 message; read from stdin when omitted
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
        /// Envelope recipient, used to pick the webhook
        #[arg(long, value_name = "ADDRESS")]
        to: String,
        /// Envelope sender
        #[arg(long, value_name = "ADDRESS")]
        from: Option<String>,
        /// Send to this webhook regardless of routing
        #[arg(long, env = "MAILHOOK_WEBHOOK_URL", value_name = "URL")]
        webhook: Option<String>,
    },
    /// Print the notification payload and attachment triage without sending
    Preview {
        /// Raw RFC 5322 message; read from stdin when omitted
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
    },
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
    /// Generate a man page
    Manpage,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = mailhook::config::load_config(cli.config.as_deref());

    let log_level = match cli.verbose {
        0 => config.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    setup_logging(log_level, &config);

    match cli.command {
        Commands::Send {
            file,
            to,
            from,
            webhook,
        } => cmd_send(file.as_deref(), to, from, webhook.as_deref(), &config),
        Commands::Preview { file } => cmd_preview(file.as_deref(), &config),
        Commands::Completions { shell } => cmd_completions(shell),
        Commands::Manpage => cmd_manpage(),
    }
}

/// Set up tracing with stderr output and optional file logging.
fn setup_logging(level: &str, config: &Config) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    let log_dir = mailhook::config::cache_dir(config);
    if std::fs::create_dir_all(&log_dir).is_ok() {
        let file_appender = tracing_appender::rolling::never(&log_dir, "mailhook.log");
        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(file_appender);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .with(file_layer)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .init();
    }
}

/// Read the raw message from `file`, or stdin.
fn read_message(file: Option<&Path>) -> anyhow::Result<Vec<u8>> {
    match file {
        Some(path) => {
            if !path.exists() {
                return Err(HookError::FileNotFound(path.to_path_buf()).into());
            }
            std::fs::read(path).map_err(|e| HookError::io(path, e).into())
        }
        None => {
            let mut raw = Vec::new();
            std::io::stdin()
                .lock()
                .read_to_end(&mut raw)
                .map_err(|e| HookError::io("<stdin>", e))?;
            Ok(raw)
        }
    }
}

fn cmd_send(
    file: Option<&Path>,
    to: String,
    from: Option<String>,
    webhook: Option<&str>,
    config: &Config,
) -> anyhow::Result<()> {
    let raw = read_message(file)?;
    let router = Router::new(&config.routing).with_fixed(webhook);
    let engine = DeliveryEngine::new(HttpTransport::new(&config.http)?);
    let envelope = Envelope { from, to };

    match pipeline::process(&raw, &envelope, config, &router, &engine) {
        Disposition::Accepted {
            outcome: DeliveryOutcome::Delivered { tier },
        } => {
            println!("Delivered ({tier})");
            Ok(())
        }
        Disposition::Accepted {
            outcome: DeliveryOutcome::Failed { tier, reason, .. },
        } => anyhow::bail!("Delivery failed ({tier}): {reason}"),
        Disposition::Rejected { reason } => {
            eprintln!("Rejected: {reason}");
            std::process::exit(EXIT_REJECTED);
        }
    }
}

fn cmd_preview(file: Option<&Path>, config: &Config) -> anyhow::Result<()> {
    let raw = read_message(file)?;
    let prepared = pipeline::prepare(&raw, config, chrono::Utc::now())?;

    let files: Vec<serde_json::Value> = prepared
        .report
        .accepted
        .iter()
        .enumerate()
        .map(|(id, a)| {
            serde_json::json!({
                "id": id,
                "filename": a.filename,
                "content_type": a.content_type,
                "size": a.size,
                "archive": a.is_archive,
            })
        })
        .collect();
    let skipped: Vec<serde_json::Value> = prepared
        .report
        .skipped
        .iter()
        .map(|s| {
            serde_json::json!({
                "filename": s.label,
                "reason": s.reason.to_string(),
            })
        })
        .collect();

    let output = serde_json::json!({
        "payload": prepared.notification.to_payload(),
        "files": files,
        "skipped": skipped,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

/// Generate shell completions and print to stdout.
fn cmd_completions(shell: clap_complete::Shell) -> anyhow::Result<()> {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "mailhook", &mut std::io::stdout());
    Ok(())
}

/// Generate a man page and print to stdout.
fn cmd_manpage() -> anyhow::Result<()> {
    let cmd = Cli::command();
    let man = clap_mangen::Man::new(cmd);
    let mut buf = Vec::new();
    man.render(&mut buf)?;
    std::io::Write::write_all(&mut std::io::stdout(), &buf)?;
    Ok(())
}
