use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub jira: JiraSection,
    #[serde(default)]
    pub pusher: PusherSection,
    #[serde(default)]
    pub queries: QuerySettings,
    #[serde(default)]
    pub broadcast: BroadcastSettings,
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub log: LogSettings,
}

#[derive(Debug, Deserialize, Default)]
pub struct JiraSection {
    pub server: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub board: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
pub struct PusherSection {
    pub app_id: Option<String>,
    pub key: Option<String>,
    pub secret: Option<String>,
    pub cluster: Option<String>,
}

/// Resolved tracker settings; every field is required.
#[derive(Debug, Clone)]
pub struct JiraConfig {
    pub server: String,
    pub username: String,
    pub password: String,
    pub board: u64,
}

#[derive(Debug, Clone)]
pub struct PusherConfig {
    pub app_id: String,
    pub key: String,
    pub secret: String,
    pub cluster: String,
}

/// Filters used to build the tracker queries.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct QuerySettings {
    pub team: String,
    pub tech_debt_label: String,
    pub sprint_field: String,
    pub in_progress_status: String,
    pub pbi_issue_types: Vec<String>,
    /// Results requested per search. Only the first page is read.
    pub page_size: u32,
}

impl Default for QuerySettings {
    fn default() -> Self {
        Self {
            team: "CustomerJourney".into(),
            tech_debt_label: "TechImprovements".into(),
            sprint_field: "customfield_10005".into(),
            in_progress_status: "Implementing".into(),
            pbi_issue_types: vec!["Story".into(), "Task".into(), "Bug".into()],
            page_size: 50,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BroadcastSettings {
    pub channel: String,
    pub event: String,
}

impl Default for BroadcastSettings {
    fn default() -> Self {
        Self {
            channel: "customer_journey_dashboard".into(),
            event: "tech_debt".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub bind: String,
    /// Push the chart to the broadcast channel this often while serving.
    pub push_interval_secs: Option<u64>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:5000".into(),
            push_interval_secs: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    /// Fallback filter when `RUST_LOG` is unset.
    pub level: String,
    pub format: LogFormat,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: LogFormat::Pretty,
        }
    }
}

/// Blank values count as missing; present values are returned untouched.
fn required(value: &Option<String>, key: &str) -> Result<String> {
    match value.as_deref() {
        Some(v) if !v.trim().is_empty() => Ok(v.to_string()),
        _ => anyhow::bail!("Missing configuration value: {key}"),
    }
}

fn present(value: &Option<String>) -> Option<String> {
    value.as_deref().filter(|v| !v.trim().is_empty()).map(String::from)
}

impl AppConfig {
    pub fn jira(&self) -> Result<JiraConfig> {
        Ok(JiraConfig {
            server: required(&self.jira.server, "JIRA_SERVER")?
                .trim()
                .trim_end_matches('/')
                .to_string(),
            username: required(&self.jira.username, "JIRA_USERNAME")?,
            password: required(&self.jira.password, "JIRA_PASSWORD")?,
            board: self
                .jira
                .board
                .context("Missing configuration value: JIRA_BOARD")?,
        })
    }

    pub fn pusher(&self) -> Result<PusherConfig> {
        Ok(PusherConfig {
            app_id: required(&self.pusher.app_id, "PUSHER_APP_ID")?,
            key: required(&self.pusher.key, "PUSHER_KEY")?,
            secret: required(&self.pusher.secret, "PUSHER_SECRET")?,
            cluster: required(&self.pusher.cluster, "PUSHER_CLUSTER")?,
        })
    }

    /// Public key and cluster, enough for browsers to subscribe to the channel.
    pub fn pusher_public(&self) -> Option<(String, String)> {
        Some((present(&self.pusher.key)?, present(&self.pusher.cluster)?))
    }

    /// Overlay values from the environment. `lookup` is `std::env::var` outside tests.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        let set = |slot: &mut Option<String>, key: &str| {
            if let Some(v) = lookup(key) {
                *slot = Some(v);
            }
        };
        set(&mut self.jira.server, "JIRA_SERVER");
        set(&mut self.jira.username, "JIRA_USERNAME");
        set(&mut self.jira.password, "JIRA_PASSWORD");
        set(&mut self.pusher.app_id, "PUSHER_APP_ID");
        set(&mut self.pusher.key, "PUSHER_KEY");
        set(&mut self.pusher.secret, "PUSHER_SECRET");
        set(&mut self.pusher.cluster, "PUSHER_CLUSTER");

        if let Some(board) = lookup("JIRA_BOARD") {
            let board = board
                .trim()
                .parse()
                .with_context(|| format!("JIRA_BOARD must be a numeric board id, got {board:?}"))?;
            self.jira.board = Some(board);
        }
        if let Some(bind) = lookup("DASHBOARD_BIND") {
            self.server.bind = bind;
        }
        if let Some(secs) = lookup("DASHBOARD_PUSH_INTERVAL_SECS") {
            let secs = secs.trim().parse().with_context(|| {
                format!("DASHBOARD_PUSH_INTERVAL_SECS must be a number of seconds, got {secs:?}")
            })?;
            self.server.push_interval_secs = Some(secs);
        }
        if let Some(format) = lookup("DASHBOARD_LOG_FORMAT") {
            self.log.format = match format.trim().to_ascii_lowercase().as_str() {
                "json" => LogFormat::Json,
                "pretty" | "text" => LogFormat::Pretty,
                other => anyhow::bail!("Unknown DASHBOARD_LOG_FORMAT {other:?}"),
            };
        }
        Ok(())
    }
}

pub fn config_path() -> PathBuf {
    if let Ok(path) = std::env::var("CJ_DASHBOARD_CONFIG") {
        return PathBuf::from(path);
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".cj-dashboard")
        .join("config.toml")
}

pub fn load_config_file(path: &Path) -> Result<AppConfig> {
    if !path.exists() {
        return Ok(AppConfig::default());
    }
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config from {}", path.display()))?;
    let config: AppConfig = toml::from_str(&contents)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    Ok(config)
}

/// Config file, then `.env`, then the process environment.
pub fn load_config() -> Result<AppConfig> {
    dotenvy::dotenv().ok();
    let mut config = load_config_file(&config_path())?;
    config.apply_env(|key| std::env::var(key).ok())?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_customer_journey_board() {
        let config = AppConfig::default();
        assert_eq!(config.queries.team, "CustomerJourney");
        assert_eq!(config.queries.tech_debt_label, "TechImprovements");
        assert_eq!(config.queries.sprint_field, "customfield_10005");
        assert_eq!(config.queries.in_progress_status, "Implementing");
        assert_eq!(config.queries.pbi_issue_types, vec!["Story", "Task", "Bug"]);
        assert_eq!(config.broadcast.channel, "customer_journey_dashboard");
        assert_eq!(config.broadcast.event, "tech_debt");
        assert_eq!(config.server.bind, "0.0.0.0:5000");
        assert_eq!(config.server.push_interval_secs, None);
    }

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config_file(&dir.path().join("nope.toml")).unwrap();
        assert!(config.jira.server.is_none());
        assert_eq!(config.log.format, LogFormat::Pretty);
    }

    #[test]
    fn file_values_are_parsed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[jira]
server = "https://jira.example.com/"
username = "bot"
password = "hunter2"
board = 42

[queries]
team = "Payments"
page_size = 100

[server]
push_interval_secs = 30

[log]
format = "json"
"#,
        )
        .unwrap();

        let config = load_config_file(&path).unwrap();
        let jira = config.jira().unwrap();
        assert_eq!(jira.server, "https://jira.example.com");
        assert_eq!(jira.board, 42);
        assert_eq!(config.queries.team, "Payments");
        assert_eq!(config.queries.page_size, 100);
        // Unset keys in a present section keep their defaults
        assert_eq!(config.queries.tech_debt_label, "TechImprovements");
        assert_eq!(config.server.push_interval_secs, Some(30));
        assert_eq!(config.server.bind, "0.0.0.0:5000");
        assert_eq!(config.log.format, LogFormat::Json);
    }

    #[test]
    fn invalid_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[jira\nserver=").unwrap();
        let err = load_config_file(&path).unwrap_err();
        assert!(err.to_string().contains("config.toml"));
    }

    #[test]
    fn environment_overrides_file() {
        let mut config = AppConfig::default();
        config.jira.server = Some("https://old.example.com".into());
        config
            .apply_env(env(&[
                ("JIRA_SERVER", "https://jira.example.com"),
                ("JIRA_USERNAME", "bot"),
                ("JIRA_PASSWORD", "secret"),
                ("JIRA_BOARD", " 7 "),
                ("PUSHER_APP_ID", "1"),
                ("PUSHER_KEY", "k"),
                ("PUSHER_SECRET", "s"),
                ("PUSHER_CLUSTER", "eu"),
                ("DASHBOARD_BIND", "127.0.0.1:8080"),
                ("DASHBOARD_PUSH_INTERVAL_SECS", "60"),
            ]))
            .unwrap();

        let jira = config.jira().unwrap();
        assert_eq!(jira.server, "https://jira.example.com");
        assert_eq!(jira.username, "bot");
        assert_eq!(jira.board, 7);
        let pusher = config.pusher().unwrap();
        assert_eq!(pusher.cluster, "eu");
        assert_eq!(config.server.bind, "127.0.0.1:8080");
        assert_eq!(config.server.push_interval_secs, Some(60));
    }

    #[test]
    fn non_numeric_board_is_rejected() {
        let mut config = AppConfig::default();
        let err = config
            .apply_env(env(&[("JIRA_BOARD", "customer-journey")]))
            .unwrap_err();
        assert!(err.to_string().contains("JIRA_BOARD"));
    }

    #[test]
    fn unknown_log_format_is_rejected() {
        let mut config = AppConfig::default();
        assert!(config
            .apply_env(env(&[("DASHBOARD_LOG_FORMAT", "xml")]))
            .is_err());
    }

    #[test]
    fn missing_required_value_is_named() {
        let mut config = AppConfig::default();
        config
            .apply_env(env(&[
                ("JIRA_SERVER", "https://jira.example.com"),
                ("JIRA_USERNAME", "bot"),
                ("JIRA_BOARD", "3"),
            ]))
            .unwrap();
        let err = config.jira().unwrap_err();
        assert!(err.to_string().contains("JIRA_PASSWORD"));

        let err = config.pusher().unwrap_err();
        assert!(err.to_string().contains("PUSHER_APP_ID"));
    }

    #[test]
    fn secrets_keep_surrounding_whitespace() {
        let mut config = AppConfig::default();
        config
            .apply_env(env(&[
                ("JIRA_SERVER", " https://jira.example.com/ "),
                ("JIRA_USERNAME", "bot"),
                ("JIRA_PASSWORD", " pass word "),
                ("JIRA_BOARD", "3"),
                ("PUSHER_APP_ID", "1"),
                ("PUSHER_KEY", "k"),
                ("PUSHER_SECRET", "  s3cret"),
                ("PUSHER_CLUSTER", "eu"),
            ]))
            .unwrap();
        let jira = config.jira().unwrap();
        assert_eq!(jira.password, " pass word ");
        assert_eq!(jira.server, "https://jira.example.com");
        assert_eq!(config.pusher().unwrap().secret, "  s3cret");
    }

    #[test]
    fn public_pusher_settings_need_only_key_and_cluster() {
        let mut config = AppConfig::default();
        assert_eq!(config.pusher_public(), None);

        config
            .apply_env(env(&[("PUSHER_KEY", "app-key"), ("PUSHER_CLUSTER", "eu")]))
            .unwrap();
        assert!(config.pusher().is_err());
        assert_eq!(
            config.pusher_public(),
            Some(("app-key".to_string(), "eu".to_string()))
        );

        config.pusher.cluster = Some(" ".into());
        assert_eq!(config.pusher_public(), None);
    }

    #[test]
    fn blank_values_count_as_missing() {
        let mut config = AppConfig::default();
        config.pusher.app_id = Some("  ".into());
        let err = config.pusher().unwrap_err();
        assert!(err.to_string().contains("PUSHER_APP_ID"));
    }
}
