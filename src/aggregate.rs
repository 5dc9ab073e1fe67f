//! Turns tracker queries into the figures shown on the dashboard.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::config::QuerySettings;
use crate::model::chart::ChartDocument;
use crate::model::issue::{IdlePbi, Issue, Sprint, TechDebtIssue, BACKLOG};
use crate::tracker::IssueTracker;

/// Quote a JQL value unless it is a bare word.
fn jql_value(value: &str) -> String {
    let bare = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
    if bare {
        value.to_string()
    } else {
        format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
    }
}

pub fn tech_debt_query(q: &QuerySettings) -> String {
    format!(
        "Team in ({}) AND labels in ({})",
        jql_value(&q.team),
        jql_value(&q.tech_debt_label)
    )
}

pub fn in_progress_query(q: &QuerySettings) -> String {
    let types: Vec<String> = q.pbi_issue_types.iter().map(|t| jql_value(t)).collect();
    format!(
        "Team in ({}) AND Sprint in openSprints() AND issuetype in ({}) AND status = {}",
        jql_value(&q.team),
        types.join(", "),
        jql_value(&q.in_progress_status)
    )
}

pub fn active_children_query(q: &QuerySettings, parent_key: &str) -> String {
    format!(
        "parent = {} and status = {}",
        jql_value(parent_key),
        jql_value(&q.in_progress_status)
    )
}

/// Sprint an issue is counted under.
pub fn sprint_or_backlog(issue: &Issue) -> String {
    match &issue.sprint {
        Some(sprint) => sprint.name.clone(),
        None => BACKLOG.to_string(),
    }
}

/// Names of board sprints whose name contains `filter`; all of them without one.
pub fn filter_sprints(sprints: &[Sprint], filter: Option<&str>) -> Vec<String> {
    sprints
        .iter()
        .filter(|s| filter.map_or(true, |f| s.name.contains(f)))
        .map(|s| s.name.clone())
        .collect()
}

/// Outer join of tech-debt issues with board sprints, counted per sprint.
///
/// Every board sprint appears, with zero when it holds no tech debt, and so
/// does every sprint that holds tech debt. The axis is in lexicographic order
/// of sprint name and each name appears once.
pub fn count_by_sprint(issues: &[TechDebtIssue], board_sprints: &[String]) -> ChartDocument {
    let mut counts: BTreeMap<&str, u64> = BTreeMap::new();
    for name in board_sprints {
        counts.entry(name.as_str()).or_insert(0);
    }
    for issue in issues {
        *counts.entry(issue.sprint.as_str()).or_insert(0) += 1;
    }

    let (x, y) = counts
        .into_iter()
        .map(|(name, count)| (name.to_string(), count))
        .unzip();
    ChartDocument::single_bar(x, y)
}

/// Fetches from the tracker and shapes the results. Holds no state between calls.
#[derive(Clone)]
pub struct Aggregator {
    tracker: Arc<dyn IssueTracker>,
    queries: QuerySettings,
    board_id: u64,
}

impl Aggregator {
    pub fn new(tracker: Arc<dyn IssueTracker>, queries: QuerySettings, board_id: u64) -> Self {
        Self {
            tracker,
            queries,
            board_id,
        }
    }

    pub async fn tech_debt_issues(&self) -> Result<Vec<TechDebtIssue>> {
        let issues = self
            .tracker
            .search_issues(&tech_debt_query(&self.queries))
            .await
            .context("Failed to fetch tech debt issues")?;
        Ok(issues
            .iter()
            .map(|issue| TechDebtIssue {
                key: issue.key.clone(),
                sprint: sprint_or_backlog(issue),
            })
            .inspect(|debt| tracing::trace!(key = %debt.key, sprint = %debt.sprint, "tech debt issue"))
            .collect())
    }

    /// Board sprints belonging to the configured team.
    pub async fn team_sprints(&self) -> Result<Vec<String>> {
        let sprints = self
            .tracker
            .sprints(self.board_id)
            .await
            .with_context(|| format!("Failed to fetch sprints of board {}", self.board_id))?;
        let filter = Some(self.queries.team.as_str()).filter(|t| !t.is_empty());
        Ok(filter_sprints(&sprints, filter))
    }

    pub async fn sprints_with_tech_debt(&self) -> Result<ChartDocument> {
        let sprints = self.team_sprints().await?;
        let issues = self.tech_debt_issues().await?;
        let chart = count_by_sprint(&issues, &sprints);
        tracing::debug!(
            sprints = sprints.len(),
            issues = issues.len(),
            bars = chart.series.first().map_or(0, |s| s.x.len()),
            "aggregated tech debt by sprint"
        );
        Ok(chart)
    }

    /// In-progress PBIs of the open sprints.
    pub async fn in_progress_pbis(&self) -> Result<Vec<Issue>> {
        let issues = self
            .tracker
            .search_issues(&in_progress_query(&self.queries))
            .await
            .context("Failed to fetch in-progress items")?;
        let status = &self.queries.in_progress_status;
        Ok(issues
            .into_iter()
            .filter(|issue| {
                issue
                    .status
                    .as_deref()
                    .map_or(true, |s| s.eq_ignore_ascii_case(status))
            })
            .collect())
    }

    /// In-progress PBIs none of whose children are in progress.
    ///
    /// Issues one count query per candidate, in order.
    pub async fn idle_pbis(&self) -> Result<Vec<IdlePbi>> {
        let mut idle = Vec::new();
        for issue in self.in_progress_pbis().await? {
            let active = self
                .tracker
                .count_issues(&active_children_query(&self.queries, &issue.key))
                .await
                .with_context(|| format!("Failed to count children of {}", issue.key))?;
            if active == 0 {
                idle.push(IdlePbi {
                    key: issue.key,
                    summary: issue.summary,
                });
            }
        }
        Ok(idle)
    }
}
