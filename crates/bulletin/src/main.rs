//! Bulletin CLI - render and send bulletins described in TOML files.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use bulletin::{BulletinFile, EmailServer, Recipients, SmtpConfig};

/// Bulletin CLI - Render sections into a bulletin and email it.
#[derive(Parser)]
#[command(name = "bulletin")]
#[command(about = "Build and email bulletins from feeds, text and HTTP sources")]
#[command(version)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Render a bulletin to HTML without sending it
    Render {
        /// Bulletin description (TOML)
        file: PathBuf,

        /// Write the HTML here instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Render a bulletin and send it over SMTP
    ///
    /// SMTP settings are read from BULLETIN_SMTP_HOST, BULLETIN_SMTP_PORT,
    /// BULLETIN_SMTP_USERNAME and BULLETIN_SMTP_PASSWORD.
    Send {
        /// Bulletin description (TOML)
        file: PathBuf,

        /// Recipient address (repeatable); overrides the file's recipients
        #[arg(long = "to")]
        to: Vec<String>,

        /// Subject line; overrides the file's subject
        #[arg(long)]
        subject: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose {
        EnvFilter::new("bulletin=debug,info")
    } else {
        EnvFilter::new("bulletin=info,warn")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    match cli.command {
        Commands::Render { file, output } => run_render(file, output).await,
        Commands::Send { file, to, subject } => {
            tracing::info!(file = %file.display(), "Sending bulletin");
            run_send(file, to, subject).await
        }
    }
}

fn load(file: &Path) -> Result<BulletinFile> {
    BulletinFile::load(file)
        .with_context(|| format!("Failed to load bulletin file: {}", file.display()))
}

async fn run_render(file: PathBuf, output: Option<PathBuf>) -> Result<()> {
    let description = load(&file)?;
    let bulletin = description.to_bulletin(Arc::new(EmailServer::disabled()));

    let html = bulletin.render().await.context("Failed to render bulletin")?;

    match output {
        Some(path) => {
            tokio::fs::write(&path, html)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            tracing::info!(output = %path.display(), "Bulletin rendered");
        }
        None => println!("{html}"),
    }
    Ok(())
}

async fn run_send(file: PathBuf, to: Vec<String>, subject: Option<String>) -> Result<()> {
    let description = load(&file)?;

    let recipients = if to.is_empty() {
        description.recipients.clone()
    } else {
        to
    };
    if recipients.is_empty() {
        bail!("No recipients: pass --to or set `recipients` in the bulletin file");
    }

    let smtp = SmtpConfig::from_env().context("SMTP configuration incomplete")?;
    let server = EmailServer::connect(&smtp)
        .await
        .with_context(|| format!("Failed to connect to {}:{}", smtp.host, smtp.port))?;

    let bulletin = description.to_bulletin(Arc::new(server));
    bulletin
        .send(Recipients::from(recipients), subject.as_deref())
        .await
        .context("Failed to send bulletin")?;

    println!("✅ Bulletin sent");
    Ok(())
}
