use std::io::{self, Write};
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use spapi_core::{AppConfig, GraphqlClient, ReportOrchestrator};

use crate::cli::{Commands, ReportArgs, ServeArgs};


pub(crate) fn run(command: Option<Commands>) -> Result<()> {
    let config = AppConfig::from_env().context("failed to load configuration")?;

    match command.unwrap_or_else(|| Commands::Serve(ServeArgs::default())) {
        Commands::Serve(args) => serve(apply_serve_overrides(config, args)),
        Commands::Report(args) => report(config, &args),
    }
}

fn apply_serve_overrides(mut config: AppConfig, args: ServeArgs) -> AppConfig {
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    config
}

fn serve(config: AppConfig) -> Result<()> {
    info!(
        host = %config.server.host,
        port = config.server.port,
        "starting spapi"
    );
    spapi_web::serve_web(config)
}

fn report(config: AppConfig, args: &ReportArgs) -> Result<()> {
    let client =
        GraphqlClient::new(&config.upstream).context("failed to build upstream client")?;
    let reports = ReportOrchestrator::new(Arc::new(client), config.metrics);
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to build report runtime")?;

    let report = runtime
        .block_on(reports.build_report(&args.code))
        .with_context(|| format!("failed to build report {}", args.code))?;
    print_json(&report)
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, value)?;
    writeln!(stdout)?;
    Ok(())
}
