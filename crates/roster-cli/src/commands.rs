use std::sync::Arc;

use anyhow::Context;
use colored::Colorize;
use roster_append::{AppendService, CancellationToken};
use roster_server::{AppConfig, RosterServer};
use roster_store::GitHubStore;
use roster_types::{Clock, SubmissionDraft, SystemClock};

use crate::cli::*;

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = AppConfig::load(cli.config.as_deref()).context("loading configuration")?;
    tracing::debug!(
        repo = %config.github.repo,
        branch = %config.github.branch,
        ledger = %config.ledger_path,
        max_attempts = config.retry.max_attempts,
        "configuration loaded",
    );
    match cli.command {
        Command::Serve(args) => cmd_serve(config, args).await,
        Command::Append(args) => cmd_append(config, args).await,
        Command::Show(args) => cmd_show(config, args).await,
    }
}

fn service(config: &AppConfig) -> anyhow::Result<AppendService> {
    let store = GitHubStore::new(config.github.clone())?;
    Ok(AppendService::new(Arc::new(store), config.retry.clone())?)
}

/// Cancel `token` on Ctrl-C.
fn cancel_on_interrupt(token: &CancellationToken) {
    let token = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            token.cancel();
        }
    });
}

async fn cmd_serve(mut config: AppConfig, args: ServeArgs) -> anyhow::Result<()> {
    if let Some(bind) = args.bind {
        config.server.bind_addr = bind;
    }
    println!(
        "{} Roster on {} → {}:{} ({})",
        "✓".green().bold(),
        config.server.bind_addr.to_string().bold(),
        config.github.repo.cyan(),
        config.ledger_path.cyan(),
        config.github.branch.yellow(),
    );
    RosterServer::from_config(config)?.serve().await?;
    Ok(())
}

async fn cmd_append(config: AppConfig, args: AppendArgs) -> anyhow::Result<()> {
    let mut draft = SubmissionDraft::new(args.name, args.phone);
    if let Some(linkedin) = args.linkedin {
        draft = draft.with_linkedin(linkedin);
    }
    let record = draft.validate(SystemClock.now())?;
    let path = config.ledger_path()?;
    let cancel = CancellationToken::new();
    cancel_on_interrupt(&cancel);

    let receipt = service(&config)?
        .append(&path, record, &cancel)
        .await
        .with_context(|| format!("appending to {path}"))?;
    tracing::info!(
        ledger = %path,
        version = %receipt.version.short(),
        position = receipt.position,
        attempts = receipt.attempts,
        "submission appended from the command line",
    );

    println!("{} Submission saved", "✓".green().bold());
    println!("  Ledger: {}", path.to_string().cyan());
    println!("  Position: {}", receipt.position.to_string().bold());
    println!("  Version: {}", receipt.version.short().yellow());
    if receipt.attempts > 1 {
        println!("  Attempts: {}", receipt.attempts);
    }
    Ok(())
}

async fn cmd_show(config: AppConfig, args: ShowArgs) -> anyhow::Result<()> {
    let path = config.ledger_path()?;
    let cancel = CancellationToken::new();
    cancel_on_interrupt(&cancel);

    let view = service(&config)?
        .read_ledger(&path, &cancel)
        .await
        .with_context(|| format!("reading {path}"))?;
    tracing::debug!(ledger = %path, records = view.records.len(), "ledger read");

    match args.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&view.records)?);
        }
        OutputFormat::Text => {
            match &view.version {
                Some(v) => println!("{} @ {}", path.to_string().bold(), v.short().yellow()),
                None => println!("{} {}", path.to_string().bold(), "(not created yet)".dimmed()),
            }
            if view.records.is_empty() {
                println!("No submissions.");
            }
            for (i, s) in view.records.iter().enumerate() {
                print!(
                    "{:>4}  {}  {}  {}",
                    i.to_string().dimmed(),
                    s.timestamp().to_string().dimmed(),
                    s.name().bold(),
                    s.phone(),
                );
                match s.linkedin() {
                    Some(l) => println!("  {}", l.blue()),
                    None => println!(),
                }
            }
        }
    }
    Ok(())
}
