//! hygraph-migrate: migrate one content model from Hygraph to Contentful
//!
//! Secrets and per-model settings are looked up by name in a parameter file
//! and/or environment variables:
//!
//! - `hygraph_key`, `hygraph_api`
//! - `contentful_mgmt_token`, `contentful_delivery_token`, `contentful_env_name`
//! - `locales` (`{"locales": ["en", "fr"]}`)
//! - `hygraph_query_<model>` (GraphQL field selection)
//! - `transforms_<model>` (remap/markdown/reference/location field lists)
//!
//! Referenced models must be migrated before the models that point at them.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use hygraph_migrate::backend::{
    ChainedParameterStore, ContentfulClient, ContentfulConfig, EnvParameterStore,
    FileParameterStore, HttpRichTextConverter, HygraphClient,
};
use hygraph_migrate::config::ResolvedParameters;
use hygraph_migrate::{Config, FailurePolicy, JobOptions, MigrationJob, Throttle};

#[derive(Parser, Debug)]
#[command(name = "hygraph-migrate")]
#[command(about = "Migrate a Hygraph content model into Contentful")]
struct Cli {
    /// Content model to migrate (Contentful content type id)
    #[arg(env = "MIGRATE_CONTENT_MODEL")]
    content_model: String,

    /// Path to configuration file
    #[arg(short, long, default_value = "hygraph-migrate.toml")]
    config: PathBuf,

    /// TOML file of job parameters and secrets
    #[arg(short, long, env = "MIGRATE_PARAMS_FILE")]
    params: Option<PathBuf>,

    /// Prefix for parameters read from environment variables
    #[arg(long, default_value = "MIGRATE_")]
    env_prefix: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "MIGRATE_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,

    /// Build entries but do not write them
    #[arg(long)]
    dry_run: bool,

    /// Keep going after a record fails
    #[arg(long)]
    continue_on_error: bool,

    /// Disable the random delay between requests
    #[arg(long)]
    no_throttle: bool,

    /// Contentful space id (overrides config file)
    #[arg(long, env = "MIGRATE_SPACE_ID")]
    space_id: Option<String>,

    /// Markdown converter endpoint (overrides config file)
    #[arg(long, env = "MIGRATE_CONVERTER_URL")]
    converter_url: Option<String>,

    /// Print the run report as JSON on stdout
    #[arg(long)]
    report_json: bool,
}

fn init_tracing(level: &str, json: bool) -> anyhow::Result<()> {
    let filter = EnvFilter::from_default_env()
        .add_directive(format!("hygraph_migrate={}", level).parse()?);

    if json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level, cli.log_json)?;

    info!("Starting hygraph-migrate");

    // Load or create default config
    let mut config = if cli.config.exists() {
        info!(path = %cli.config.display(), "Loading config file");
        Config::load(&cli.config)?
    } else {
        info!("Config file not found, using defaults");
        Config::default()
    };

    // Apply CLI overrides
    if cli.dry_run {
        config.job.dry_run = true;
    }
    if cli.continue_on_error {
        config.job.continue_on_error = true;
    }
    if cli.no_throttle {
        config.job.throttle = false;
    }
    if let Some(space_id) = cli.space_id {
        config.destination.space_id = Some(space_id);
    }
    if let Some(url) = cli.converter_url {
        config.converter.endpoint = url;
    }

    let mut store = ChainedParameterStore::new();
    if let Some(path) = &cli.params {
        let file = FileParameterStore::load(path)?;
        info!(path = %path.display(), parameters = file.len(), "Loaded parameter file");
        store = store.with_store(file);
    }
    store = store.with_store(EnvParameterStore::with_prefix(cli.env_prefix));

    let params = ResolvedParameters::resolve(&store, &config.parameters, &cli.content_model)
        .context("resolving job parameters")?;
    info!(model = %cli.content_model, locales = ?params.locales, "Migrating content model");

    let source = HygraphClient::new(
        params.hygraph_api.clone(),
        params.hygraph_key.clone(),
        Duration::from_secs(config.source.timeout_secs),
    )?
    .with_first(config.source.first);

    let converter = HttpRichTextConverter::new(
        config.converter.endpoint.clone(),
        Duration::from_secs(config.converter.timeout_secs),
    )?;

    let destination = Arc::new(
        ContentfulClient::connect(ContentfulConfig {
            management_url: config.destination.management_url.clone(),
            delivery_url: config.destination.delivery_url.clone(),
            management_token: params.contentful_mgmt_token.clone(),
            delivery_token: params.contentful_delivery_token.clone(),
            space_id: config.destination.space_id.clone(),
            environment: params.contentful_env_name.clone(),
            timeout_secs: config.destination.timeout_secs,
        })
        .await
        .context("connecting to Contentful")?,
    );

    let throttle = if config.job.throttle {
        Throttle::random()
    } else {
        Throttle::disabled()
    };
    let failure_policy = if config.job.continue_on_error {
        FailurePolicy::Continue
    } else {
        FailurePolicy::Abort
    };

    let options = JobOptions::new(
        cli.content_model.clone(),
        params.locales.clone(),
        params.query_fields.clone(),
    )
    .with_throttle(throttle)
    .with_dry_run(config.job.dry_run)
    .with_failure_policy(failure_policy);

    let job = MigrationJob::new(
        options,
        &params.transforms,
        Arc::new(source),
        Arc::new(converter),
        destination.clone(),
        destination,
    )?;

    let report = job.run().await?;

    if cli.report_json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    if !report.is_success() {
        for failed in &report.failed {
            eprintln!("Failed: {}: {}", failed.slug, failed.error);
        }
        std::process::exit(1);
    }

    Ok(())
}
