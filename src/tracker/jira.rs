use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use base64::Engine;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;

use super::sprint_field::first_sprint;
use super::IssueTracker;
use crate::config::{JiraConfig, QuerySettings};
use crate::model::issue::{Issue, Sprint};

pub struct JiraClient {
    base_url: String,
    auth_header: String,
    sprint_field: String,
    page_size: u32,
    client: reqwest::Client,
}

impl JiraClient {
    pub fn new(config: &JiraConfig, queries: &QuerySettings) -> Self {
        let creds = format!("{}:{}", config.username, config.password);
        let encoded = base64::engine::general_purpose::STANDARD.encode(creds);
        Self {
            base_url: config.server.trim_end_matches('/').to_string(),
            auth_header: format!("Basic {encoded}"),
            sprint_field: queries.sprint_field.clone(),
            page_size: queries.page_size,
            client: reqwest::Client::new(),
        }
    }

    /// Build a client and check the credentials against the server.
    pub async fn connect(config: &JiraConfig, queries: &QuerySettings) -> Result<Self> {
        let client = Self::new(config, queries);
        let user = client
            .current_user()
            .await
            .with_context(|| format!("Failed to authenticate against {}", client.base_url))?;
        tracing::info!(server = %client.base_url, user = %user, "connected to Jira");
        Ok(client)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn current_user(&self) -> Result<String> {
        let url = format!("{}/rest/api/2/myself", self.base_url);
        let me: Myself = self.get_json(&url).await?;
        Ok(me.display_name.unwrap_or(me.name.unwrap_or_default()))
    }

    fn search_url(&self, jql: &str, max_results: u32) -> String {
        format!(
            "{}/rest/api/2/search?jql={}&maxResults={}&fields=summary,status,{}",
            self.base_url,
            urlencoding::encode(jql),
            max_results,
            urlencoding::encode(&self.sprint_field)
        )
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let resp = self
            .client
            .get(url)
            .header("Authorization", &self.auth_header)
            .header("Accept", "application/json")
            .send()
            .await
            .context("Jira API request failed")?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let snippet: String = body.chars().take(300).collect();
            bail!("Jira API returned {status}: {snippet}");
        }

        resp.json().await.context("Failed to parse Jira response")
    }

    fn to_issue(&self, issue: JiraIssue) -> Result<Issue> {
        let sprint = first_sprint(issue.fields.extra.get(&self.sprint_field))
            .with_context(|| format!("Bad sprint field on {}", issue.key))?;
        if let Some(s) = &sprint {
            tracing::trace!(key = %issue.key, sprint = %s.name, sprint_id = ?s.id, state = ?s.state, "issue sprint");
        }
        Ok(Issue {
            key: issue.key,
            summary: issue.fields.summary.unwrap_or_default(),
            status: issue.fields.status.map(|s| s.name),
            sprint,
        })
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Myself {
    name: Option<String>,
    display_name: Option<String>,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    total: u64,
    #[serde(default)]
    issues: Vec<JiraIssue>,
}

#[derive(Deserialize)]
struct JiraIssue {
    key: String,
    fields: IssueFields,
}

#[derive(Deserialize)]
struct IssueFields {
    summary: Option<String>,
    status: Option<StatusField>,
    /// Custom fields, including the sprint field.
    #[serde(flatten)]
    extra: HashMap<String, Value>,
}

#[derive(Deserialize)]
struct StatusField {
    name: String,
}

#[derive(Deserialize)]
struct SprintPage {
    #[serde(default)]
    values: Vec<BoardSprint>,
}

#[derive(Deserialize)]
struct BoardSprint {
    id: u64,
    name: String,
    state: Option<String>,
}

#[async_trait]
impl IssueTracker for JiraClient {
    fn name(&self) -> &str {
        "Jira"
    }

    async fn search_issues(&self, jql: &str) -> Result<Vec<Issue>> {
        tracing::debug!(jql, "searching issues");
        let search: SearchResponse = self.get_json(&self.search_url(jql, self.page_size)).await?;
        if search.total > search.issues.len() as u64 {
            tracing::debug!(
                jql,
                total = search.total,
                returned = search.issues.len(),
                "search truncated to first page"
            );
        }
        search
            .issues
            .into_iter()
            .map(|issue| self.to_issue(issue))
            .collect()
    }

    async fn count_issues(&self, jql: &str) -> Result<u64> {
        tracing::debug!(jql, "counting issues");
        let search: SearchResponse = self.get_json(&self.search_url(jql, 0)).await?;
        Ok(search.total)
    }

    async fn sprints(&self, board_id: u64) -> Result<Vec<Sprint>> {
        tracing::debug!(board_id, "listing board sprints");
        let url = format!(
            "{}/rest/agile/1.0/board/{}/sprint?maxResults={}",
            self.base_url, board_id, self.page_size
        );
        let page: SprintPage = self
            .get_json(&url)
            .await
            .with_context(|| format!("Failed to list sprints of board {board_id}"))?;
        Ok(page
            .values
            .into_iter()
            .map(|s| Sprint {
                id: s.id,
                name: s.name,
                state: s.state,
            })
            .inspect(|s| {
                tracing::trace!(board_id, id = s.id, name = %s.name, state = ?s.state, "board sprint")
            })
            .collect())
    }
}
