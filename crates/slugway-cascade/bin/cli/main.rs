mod cli;

use crate::cli::{LogFormatArg, CLI};
use anyhow::Context;
use clap::Parser;
use slugway_cascade::{ConfiguredSiteRegistry, Ports, ServiceOptions, SlugService, TracingEventSink};
use slugway_storage::MySqlStore;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = CLI::parse();
    init_tracing(config.log_format);

    info!(
        page_id = config.page_id,
        old_slug = %config.old_slug,
        new_slug = %config.new_slug,
        workspace = config.workspace,
        sites_file = %config.sites_file.display(),
        "starting slug cascade"
    );

    let store = Arc::new(
        MySqlStore::connect(&config.mysql_dsn)
            .await
            .context("failed to connect to mysql")?,
    );
    let sites = ConfiguredSiteRegistry::from_file(&config.sites_file, store.clone())?;

    let ports = Ports::builder()
        .pages(store.clone())
        .writer(store.clone())
        .redirects(store.clone())
        .history(store)
        .sites(Arc::new(sites))
        .events(Arc::new(TracingEventSink))
        .build();
    let options = ServiceOptions::builder()
        .workspace(config.workspace)
        .backend_user(config.backend_user)
        .max_depth(config.max_depth)
        .build();

    let report = SlugService::new(ports, options)
        .rebuild_slugs_for_slug_change(
            config.page_id,
            &config.old_slug,
            &config.new_slug,
            config.correlation_id.unwrap_or_default(),
        )
        .await
        .with_context(|| format!("slug cascade for page {} failed", config.page_id))?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn init_tracing(format: LogFormatArg) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr);

    match format {
        LogFormatArg::Text => builder.init(),
        LogFormatArg::Json => builder.json().init(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slugway_core::CorrelationId;

    #[test]
    fn parses_arguments_and_defaults() {
        let config = CLI::try_parse_from([
            "slugway",
            "--page-id",
            "2",
            "--old-slug",
            "/old",
            "--new-slug",
            "/new",
            "--mysql-dsn",
            "mysql://localhost/cms",
            "--sites-file",
            "sites.json",
        ])
        .unwrap();

        assert_eq!(config.page_id, 2);
        assert_eq!(config.workspace, 0);
        assert_eq!(config.max_depth, slugway_cascade::DEFAULT_MAX_DEPTH);
        assert_eq!(config.log_format, LogFormatArg::Text);
        assert_eq!(config.correlation_id, None);
    }

    #[test]
    fn parses_correlation_id() {
        let config = CLI::try_parse_from([
            "slugway",
            "--page-id",
            "2",
            "--old-slug",
            "/old",
            "--new-slug",
            "/new",
            "--mysql-dsn",
            "mysql://localhost/cms",
            "--sites-file",
            "sites.json",
            "--correlation-id",
            "0400$edit-42",
            "--log-format",
            "json",
        ])
        .unwrap();

        assert_eq!(
            config.correlation_id,
            Some(CorrelationId::for_subject("edit-42"))
        );
        assert_eq!(config.log_format, LogFormatArg::Json);
    }
}
