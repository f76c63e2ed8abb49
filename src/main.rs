mod api;
mod archive;
mod config;
mod error;
mod extract;
mod output;
mod record;
mod scraper;
mod template;
mod transform;

use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::Parser;

#[derive(Parser)]
#[command(name = "wiki_harvest", about = "Structured-record harvester for MediaWiki pages")]
struct Cli {
    /// Path to the config file that defines the scraping operations
    config_file: PathBuf,

    /// Only save the raw JSON responses to files, without extracting
    #[arg(long, conflicts_with = "from_files")]
    save_only: bool,

    /// Extract from response files previously saved with --save-only
    #[arg(long)]
    from_files: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();

    let config = config::Config::load(&cli.config_file)?;

    if cli.save_only {
        let client = api::ApiClient::new(&config)?;
        let saved = scraper::archive_responses(&client, &cli.config_file).await?;
        println!(
            "Saved {} raw response file(s) next to {}",
            saved,
            cli.config_file.display()
        );
    } else {
        let (records, stats) = if cli.from_files {
            scraper::harvest_archived(&config, &cli.config_file)?
        } else {
            let client = api::ApiClient::new(&config)?;
            scraper::harvest_live(&config, &client).await?
        };

        let yaml_path = Path::new(&config.output_filename);
        let json_path = output::write_outputs(&records, yaml_path)?;
        println!(
            "Extracted {} records from {} result pages ({} skipped).",
            stats.records, stats.pages, stats.skipped
        );
        println!("Wrote {} and {}", yaml_path.display(), json_path.display());
    }

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    Ok(())
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
