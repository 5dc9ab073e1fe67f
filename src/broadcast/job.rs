//! Recomputes the tech-debt chart and pushes it to the broadcast channel,
//! once or on every tick of a [`Trigger`].

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::time::{Interval, MissedTickBehavior};

use super::Broadcaster;
use crate::aggregate::Aggregator;
use crate::chart;
use crate::config::BroadcastSettings;

/// Source of job runs.
#[async_trait]
pub trait Trigger: Send {
    /// Wait for the next run. Returns `false` once no more runs will come.
    async fn tick(&mut self) -> bool;
}

pub struct IntervalTrigger {
    interval: Interval,
}

impl IntervalTrigger {
    /// First tick fires immediately. `period` must be non-zero.
    pub fn every(period: Duration) -> Self {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self { interval }
    }
}

#[async_trait]
impl Trigger for IntervalTrigger {
    async fn tick(&mut self) -> bool {
        self.interval.tick().await;
        true
    }
}

#[async_trait]
impl Trigger for mpsc::UnboundedReceiver<()> {
    async fn tick(&mut self) -> bool {
        self.recv().await.is_some()
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct JobStats {
    pub pushed: u64,
    pub failed: u64,
}

pub struct BroadcastJob {
    aggregator: Aggregator,
    broadcaster: Arc<dyn Broadcaster>,
    settings: BroadcastSettings,
}

impl BroadcastJob {
    pub fn new(
        aggregator: Aggregator,
        broadcaster: Arc<dyn Broadcaster>,
        settings: BroadcastSettings,
    ) -> Self {
        Self {
            aggregator,
            broadcaster,
            settings,
        }
    }

    /// Recompute the chart and publish it. Returns the payload size in bytes.
    pub async fn run_once(&self) -> Result<usize> {
        let chart = self.aggregator.sprints_with_tech_debt().await?;
        let json = chart::to_json(&chart)?;
        self.broadcaster
            .trigger(&self.settings.channel, &self.settings.event, &json)
            .await
            .with_context(|| {
                format!(
                    "Failed to push {} to channel {}",
                    self.settings.event, self.settings.channel
                )
            })?;
        tracing::info!(
            channel = %self.settings.channel,
            event = %self.settings.event,
            issues = chart.total(),
            bytes = json.len(),
            "chart pushed"
        );
        Ok(json.len())
    }

    /// Run once per tick until the trigger ends. A failed run is logged and
    /// the job waits for the next tick.
    pub async fn run(&self, mut trigger: impl Trigger) -> JobStats {
        let mut stats = JobStats::default();
        while trigger.tick().await {
            match self.run_once().await {
                Ok(_) => stats.pushed += 1,
                Err(e) => {
                    stats.failed += 1;
                    tracing::warn!(error = %format!("{e:#}"), "scheduled broadcast failed");
                }
            }
        }
        tracing::info!(pushed = stats.pushed, failed = stats.failed, "broadcast job stopped");
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use crate::aggregate::tech_debt_query;
    use crate::broadcast::BroadcastError;
    use crate::config::QuerySettings;
    use crate::tracker::tests::{issue, FakeTracker};

    #[derive(Default)]
    struct RecordingBroadcaster {
        sent: Mutex<Vec<(String, String, String)>>,
        reject: bool,
    }

    #[async_trait]
    impl Broadcaster for RecordingBroadcaster {
        async fn trigger(
            &self,
            channel: &str,
            event: &str,
            data: &str,
        ) -> Result<(), BroadcastError> {
            if self.reject {
                return Err(BroadcastError::Rejected {
                    status: 401,
                    body: "Invalid signature".into(),
                });
            }
            self.sent
                .lock()
                .unwrap()
                .push((channel.into(), event.into(), data.into()));
            Ok(())
        }
    }

    fn tracker() -> FakeTracker {
        FakeTracker::new()
            .with_sprints(3, &["CustomerJourney 1", "CustomerJourney 2"])
            .with_query(
                &tech_debt_query(&QuerySettings::default()),
                vec![issue("CJ-1", Some("CustomerJourney 2")), issue("CJ-2", None)],
            )
    }

    fn job(tracker: FakeTracker, broadcaster: Arc<RecordingBroadcaster>) -> BroadcastJob {
        let aggregator = Aggregator::new(Arc::new(tracker), QuerySettings::default(), 3);
        BroadcastJob::new(aggregator, broadcaster, BroadcastSettings::default())
    }

    #[tokio::test]
    async fn run_once_pushes_chart_json_to_fixed_channel() {
        let broadcaster = Arc::new(RecordingBroadcaster::default());
        let bytes = job(tracker(), broadcaster.clone()).run_once().await.unwrap();

        let sent = broadcaster.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        let (channel, event, data) = &sent[0];
        assert_eq!(channel, "customer_journey_dashboard");
        assert_eq!(event, "tech_debt");
        assert_eq!(bytes, data.len());

        let chart = chart::from_json(data).unwrap();
        assert_eq!(
            chart.series[0].x,
            vec!["Backlog", "CustomerJourney 1", "CustomerJourney 2"]
        );
        assert_eq!(chart.series[0].y, vec![1, 0, 1]);
    }

    #[tokio::test]
    async fn run_once_propagates_broadcast_failure() {
        let broadcaster = Arc::new(RecordingBroadcaster {
            reject: true,
            ..Default::default()
        });
        let err = job(tracker(), broadcaster).run_once().await.unwrap_err();
        let message = format!("{err:#}");
        assert!(message.contains("customer_journey_dashboard"));
        assert!(message.contains("401"));
    }

    #[tokio::test]
    async fn run_pushes_once_per_tick_until_trigger_closes() {
        let broadcaster = Arc::new(RecordingBroadcaster::default());
        let job = job(tracker(), broadcaster.clone());

        let (tx, rx) = mpsc::unbounded_channel();
        for _ in 0..3 {
            tx.send(()).unwrap();
        }
        drop(tx);

        let stats = job.run(rx).await;
        assert_eq!(stats, JobStats { pushed: 3, failed: 0 });
        assert_eq!(broadcaster.sent.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn run_keeps_going_after_failed_tick() {
        let broadcaster = Arc::new(RecordingBroadcaster::default());
        let job = job(tracker().failing_on("sprints"), broadcaster.clone());

        let (tx, rx) = mpsc::unbounded_channel();
        tx.send(()).unwrap();
        tx.send(()).unwrap();
        drop(tx);

        let stats = job.run(rx).await;
        assert_eq!(stats, JobStats { pushed: 0, failed: 2 });
        assert!(broadcaster.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn interval_trigger_fires_immediately() {
        let mut trigger = IntervalTrigger::every(Duration::from_secs(3600));
        let fired = tokio::time::timeout(Duration::from_secs(1), trigger.tick()).await;
        assert_eq!(fired.ok(), Some(true));
    }
}
