mod aggregate;
mod app;
mod broadcast;
mod chart;
mod cli;
mod config;
mod model;
mod telemetry;
mod tracker;
mod util;
mod web;

use anyhow::Result;

use cli::Command;

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = cli::parse_args(&args)?;
    if command == Command::Help {
        cli::print_help();
        return Ok(());
    }

    let config = config::load_config()?;
    telemetry::init_logging(&config.log);

    let result = match command {
        Command::Serve(serve_args) => app::serve(&config, serve_args).await,
        Command::Push => app::push(&config).await,
        Command::Help => Ok(()),
    };
    if let Err(e) = &result {
        tracing::error!(error = %format!("{e:#}"), "cj-dashboard failed");
    }
    result
}
