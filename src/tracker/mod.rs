pub mod jira;
pub mod sprint_field;

use anyhow::Result;
use async_trait::async_trait;

use crate::model::issue::{Issue, Sprint};

/// Read-only access to the issue tracker.
#[async_trait]
pub trait IssueTracker: Send + Sync {
    fn name(&self) -> &str;

    /// Issues matching a JQL query, first page only.
    async fn search_issues(&self, jql: &str) -> Result<Vec<Issue>>;

    /// Total number of issues matching a JQL query.
    async fn count_issues(&self, jql: &str) -> Result<u64> {
        Ok(self.search_issues(jql).await?.len() as u64)
    }

    async fn sprints(&self, board_id: u64) -> Result<Vec<Sprint>>;
}
