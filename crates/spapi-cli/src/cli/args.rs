use clap::Args;

#[derive(Debug, Args, Default)]
pub struct ServeArgs {
    /// Interface to bind. Overrides `SPAPI_HOST`.
    #[arg(long)]
    pub host: Option<String>,
    /// Port to listen on. Overrides `SPAPI_PORT` / `PORT`.
    #[arg(long)]
    pub port: Option<u16>,
}

#[derive(Debug, Args)]
pub struct ReportArgs {
    /// Report code, as it appears in a report URL.
    pub code: String,
}
