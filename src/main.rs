use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cache;
mod catalog;
mod cli;
mod config;
mod metadata;
#[cfg(test)]
mod tests;
mod web;

use catalog::Catalog;
use cli::Command;
use config::Config;
use metadata::{Markup, MetadataService};

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let args = cli::Args::parse();
    init_logging();

    let mut config = Config::load_with(&args.config)?;

    match args.command {
        Command::Serve { listen } => {
            if let Some(listen) = listen {
                config.listen = listen;
            }
            web::start_daemon(&config)
        }

        Command::Meta { app_id, report } => {
            let service = MetadataService::from_config(&config)?;
            let (outcome, extract_report) = service.get_app_metadata_with_report(&app_id)?;

            if let Some(reason) = outcome.degrade_reason() {
                log::warn!("app_id={app_id} degraded: {reason}");
            }

            print_json(outcome.metadata())?;
            if report {
                print_json(&extract_report)?;
            }
            Ok(())
        }

        Command::Extract { file, id, report } => {
            let html = std::fs::read_to_string(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;

            let service = MetadataService::from_config(&config)?;
            let source_url = service.detail_url(&id);
            let (outcome, extract_report) =
                service.extract_guarded(&Markup::from(html), &id, &source_url);

            print_json(outcome.metadata())?;
            if report {
                print_json(&extract_report)?;
            }
            Ok(())
        }

        Command::Catalog {
            category,
            query,
            featured,
        } => {
            let catalog = Catalog::new(config.catalog.clone());
            let mut entries = match query.as_deref() {
                Some(query) => catalog.search(query),
                None => catalog.entries().iter().collect(),
            };
            if let Some(category) = category.as_deref() {
                entries.retain(|e| e.in_category(category));
            }
            if featured {
                entries.retain(|e| e.featured);
            }
            let entries: Vec<_> = entries.into_iter().cloned().collect();

            if entries.is_empty() {
                if catalog.entries().is_empty() {
                    println!("catalog is empty, add apps under `catalog:` in {}", args.config.display());
                } else {
                    println!("no catalog entry matches");
                }
                return Ok(());
            }

            let service = MetadataService::from_config(&config)?;
            let listings = Catalog::new(entries).refresh(&service);

            let degraded = listings.iter().filter(|l| l.degraded).count();
            log::info!("refreshed {} apps, {degraded} degraded", listings.len());

            print_json(&listings)
        }
    }
}
