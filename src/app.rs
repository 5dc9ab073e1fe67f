//! Wiring of configuration, clients and the two entry points.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use tokio::net::TcpListener;

use crate::aggregate::Aggregator;
use crate::broadcast::job::{BroadcastJob, IntervalTrigger};
use crate::broadcast::pusher::PusherClient;
use crate::cli::ServeArgs;
use crate::config::{AppConfig, PusherConfig};
use crate::tracker::jira::JiraClient;
use crate::tracker::IssueTracker;
use crate::web::{self, pages::LiveUpdates, AppState};

/// Connect to the tracker. Any failure here stops the process.
async fn connect(config: &AppConfig) -> Result<(Aggregator, String)> {
    let jira = config.jira()?;
    let client = JiraClient::connect(&jira, &config.queries).await?;
    let browse_url = client.base_url().to_string();
    tracing::info!(tracker = client.name(), board = jira.board, "tracker ready");
    let aggregator = Aggregator::new(Arc::new(client), config.queries.clone(), jira.board);
    Ok((aggregator, browse_url))
}

fn broadcast_job(config: &AppConfig, pusher: &PusherConfig, aggregator: Aggregator) -> BroadcastJob {
    BroadcastJob::new(
        aggregator,
        Arc::new(PusherClient::new(pusher)),
        config.broadcast.clone(),
    )
}

pub async fn serve(config: &AppConfig, args: ServeArgs) -> Result<()> {
    let push_every = args.push_every.or(config.server.push_interval_secs);
    if push_every == Some(0) {
        bail!("Push interval must be at least 1 second");
    }
    // Scheduled pushes need the full credentials; the page only needs key and cluster
    let pusher = push_every.map(|_| config.pusher()).transpose()?;

    let (aggregator, browse_url) = connect(config).await?;

    let job = match (push_every, &pusher) {
        (Some(secs), Some(pusher)) => {
            let job = broadcast_job(config, pusher, aggregator.clone());
            tracing::info!(every_secs = secs, channel = %config.broadcast.channel, "scheduled broadcast enabled");
            Some(tokio::spawn(async move {
                job.run(IntervalTrigger::every(Duration::from_secs(secs)))
                    .await
            }))
        }
        _ => None,
    };

    let live = config.pusher_public().map(|(key, cluster)| LiveUpdates {
        key,
        cluster,
        channel: config.broadcast.channel.clone(),
        event: config.broadcast.event.clone(),
    });
    let state = Arc::new(AppState {
        aggregator,
        browse_url,
        live,
    });

    let bind = args.bind.unwrap_or_else(|| config.server.bind.clone());
    let listener = TcpListener::bind(&bind)
        .await
        .with_context(|| format!("Failed to bind {bind}"))?;

    let served = web::serve(listener, state, shutdown_signal()).await;
    if let Some(job) = job {
        job.abort();
    }
    served
}

/// Push the chart once and exit.
pub async fn push(config: &AppConfig) -> Result<()> {
    let pusher = config.pusher()?;
    let (aggregator, _) = connect(config).await?;
    let bytes = broadcast_job(config, &pusher, aggregator).run_once().await?;
    println!(
        "Pushed {bytes} bytes to {}/{}",
        config.broadcast.channel, config.broadcast.event
    );
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
