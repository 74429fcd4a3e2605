use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use bytes::Bytes;
use clap::Parser;
use tokio::io::AsyncReadExt;
use tracing::debug;

use vellum_cli::config::{Cli, Command, Settings};
use vellum_cli::output;
use vellum_core::SystemClock;
use vellum_gateway::{AllowlistCache, ArtifactGatewayService, GatewayError, PathResolver};
use vellum_storage::{FileAllowlistSource, FsObjectStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut settings = Settings::load(cli.config.as_deref())?;
    settings.apply_overrides(&cli);

    let _guard = vellum_logging::install(&settings.logging)?;

    match &cli.command {
        Command::Resolve {
            category,
            participant,
        } => {
            // Pure path computation, no store or allowlist needed
            let resolver = PathResolver::from_config(&settings.gateway)?;
            let folder = resolver
                .resolve(category, participant)
                .map_err(|e| user_error(e.into()))?;
            print(&cli, &folder, output::render_folder(&folder))?;
        }

        Command::CheckAccess => {
            let principal = cli.require_principal()?;
            let gateway = connect(&settings).await?;
            let decision = gateway.check_access(principal);
            print(&cli, &decision, output::render_decision(&decision))?;
        }

        Command::Search {
            category,
            participant,
        } => {
            let principal = cli.require_principal()?;
            let gateway = connect(&settings).await?;
            let bundle = gateway
                .search(category, participant, principal)
                .await
                .map_err(user_error)?;
            print(&cli, &bundle, output::render_bundle(&bundle))?;
            if !cli.json {
                println!();
                print!("{}", String::from_utf8_lossy(&bundle.table.content));
            }
        }

        Command::Save {
            category,
            participant,
            file,
        } => {
            let principal = cli.require_principal()?;
            let content = read_content(file.as_deref()).await?;
            let gateway = connect(&settings).await?;
            let receipt = gateway
                .save_edit(category, participant, principal, content)
                .await
                .map_err(user_error)?;
            print(&cli, &receipt, output::render_receipt(&receipt))?;
        }
    }

    Ok(())
}

/// Build the gateway over the configured store and allowlist
async fn connect(settings: &Settings) -> anyhow::Result<ArtifactGatewayService> {
    let clock = Arc::new(SystemClock);
    let source = Arc::new(FileAllowlistSource::new(settings.require_allowlist()?));
    let cache = Arc::new(AllowlistCache::new(
        source,
        clock.clone(),
        settings.gateway.allowlist.clone(),
    ));
    let snapshot = cache.bootstrap().await;
    debug!(generation = snapshot.generation(), entries = snapshot.len(), "Allowlist ready");

    let root = settings.require_store_root()?;
    let store = FsObjectStore::new(root)
        .await
        .with_context(|| format!("opening store at {}", root.display()))?;

    Ok(ArtifactGatewayService::new(
        &settings.gateway,
        Arc::new(store),
        cache,
        clock,
    )?)
}

async fn read_content(file: Option<&Path>) -> anyhow::Result<Bytes> {
    match file {
        Some(path) => {
            let data = tokio::fs::read(path)
                .await
                .with_context(|| format!("reading {}", path.display()))?;
            Ok(Bytes::from(data))
        }
        None => {
            let mut data = Vec::new();
            tokio::io::stdin()
                .read_to_end(&mut data)
                .await
                .context("reading table from stdin")?;
            Ok(Bytes::from(data))
        }
    }
}

fn print<T: serde::Serialize>(cli: &Cli, value: &T, human: String) -> anyhow::Result<()> {
    if cli.json {
        println!("{}", output::to_json(value)?);
    } else {
        print!("{human}");
    }
    Ok(())
}

/// Show operators the category message, keep details in the logs
fn user_error(err: GatewayError) -> anyhow::Error {
    debug!(kind = %err.kind(), error = %err, "Request failed");
    anyhow::anyhow!("{} [{}]", err.user_message(), err.kind())
}
