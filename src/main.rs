mod cli;

use anyhow::Result;
use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
use kasync::config::Settings;
use kasync::prompt::RewritePolicy;
use kasync::upload::RowOutcome;
use kasync::Kasync;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() { ExitCode::FAILURE } else { ExitCode::SUCCESS };
        }
    };

    let default_filter = if cli.verbose { "kasync=debug,info" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)))
        .with_target(false)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let app = Kasync::new(Settings::load(cli.config.as_deref())?);

    match cli.command {
        Commands::Upload { input, lang, files, youtube, amara: _, skip_errors, rewrite, no_rewrite, credentials } => {
            let mode = Commands::upload_mode(files, youtube);
            let policy = RewritePolicy::from_flags(rewrite, no_rewrite);
            let outcomes = app.upload(&input, &credentials, mode, &lang, skip_errors, policy).await?;
            let uploaded = outcomes.iter().filter(|o| **o == RowOutcome::Uploaded).count();
            println!("Uploaded {lang} subtitles for {uploaded} of {} videos", outcomes.len());
        }
        Commands::Sync { input, lang, credentials, .. } => {
            let r = app.sync(&input, &lang, &credentials).await?;
            println!(
                "uploaded: {}, already on Amara: {}, skipped: {}, not on YouTube: {}, failed: {}",
                r.uploaded, r.already_present, r.skipped, r.not_on_youtube, r.failed
            );
        }
        Commands::KaExport { course, kind, refresh, out_dir } => {
            let (path, r) = app.ka_export(&course, kind, refresh, &out_dir).await?;
            println!(
                "Wrote {} items to {} ({} not listed, {} duplicates, {} rejected)",
                r.items.len(), path.display(), r.not_listed, r.duplicates, r.rejected
            );
        }
        Commands::KsExport { password, schema, all, out_dir } => {
            if all {
                for (id, title) in app.ks_schemas(password.as_deref()).await? {
                    println!("{id}\t{title}");
                }
            } else if let Some(schema) = schema {
                let (path, r) = app.ks_export(&schema, password.as_deref(), &out_dir).await?;
                println!("Wrote {} items to {} ({} duplicates, {} rejected)", r.items.len(), path.display(), r.duplicates, r.rejected);
            }
        }
    }
    Ok(())
}
