use anyhow::{Context, Result};
use clap::Parser;
use dotenv::dotenv;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use hive_ingest::hdfs::client::WebHdfsClient;
use hive_ingest::hive::client::HiveClient;
use hive_ingest::hive::mapper::TypeMapper;
use hive_ingest::pipeline::{MigrationOptions, Migrator};
use hive_ingest::settings::Settings;
use hive_ingest::source::mysql::MySqlSource;
use hive_ingest::verify::{print_counts, verify_tables};

#[derive(Parser, Debug)]
#[command(name = "hive-ingest", version)]
#[command(about = "Copy every table of a MySQL schema into Hive-on-HDFS", long_about = None)]
struct Args {
    /// Configuration file layered over config/default and config/$RUN_MODE
    #[arg(long)]
    config: Option<PathBuf>,

    /// Only migrate these tables (repeatable)
    #[arg(long = "table", value_name = "NAME")]
    tables: Vec<String>,

    /// Skip listing Hive tables and their row counts afterwards
    #[arg(long)]
    skip_verify: bool,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();
    let settings = Settings::load(args.config.as_deref()).context("Failed to load settings")?;

    info!(
        mysql = %format!("{}:{}/{}", settings.source.mysql.host, settings.source.mysql.port, settings.source.mysql.database),
        hdfs = %settings.hdfs.namenode_url,
        hive = %settings.hive.url,
        policy = ?settings.mapping.policy,
        "hive-ingest v{}", env!("CARGO_PKG_VERSION")
    );

    let source = MySqlSource::connect(&settings.source.mysql).await?;
    let store = WebHdfsClient::new(&settings.hdfs)?;
    let hive = HiveClient::connect(settings.hive.clone()).await?;
    info!("Hive connection established successfully!");

    let migrator = Migrator::new(
        source,
        store,
        hive,
        TypeMapper::new(settings.mapping.policy),
        MigrationOptions::from_settings(&settings),
    );

    let report = migrator.run(&args.tables).await?;
    println!("{}", "=".repeat(80));
    report.print_summary();

    if !args.skip_verify {
        match verify_tables(migrator.warehouse(), &settings.hive.database).await {
            Ok(counts) => print_counts(&counts),
            Err(e) => error!("{:#}", e),
        }
    }

    let (source, _, hive) = migrator.into_parts();
    source.close().await;
    if let Err(e) = hive.close().await {
        error!("Failed to close Hive session: {:#}", e);
    }

    Ok(if report.has_failures() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}
