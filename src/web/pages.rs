//! HTML pages, rendered from the askama templates under `templates/`.

use askama::Template;

use crate::model::issue::IdlePbi;
use crate::util::html::script_safe_json;

/// Broadcast channel the dashboard page listens on for fresh charts.
#[derive(Debug, Clone)]
pub struct LiveUpdates {
    pub key: String,
    pub cluster: String,
    pub channel: String,
    pub event: String,
}

/// `LiveUpdates` with every value already encoded as a JS string literal.
struct LiveScript {
    key: String,
    cluster: String,
    channel: String,
    event: String,
}

impl LiveScript {
    fn new(live: &LiveUpdates) -> Self {
        Self {
            key: js_string(&live.key),
            cluster: js_string(&live.cluster),
            channel: js_string(&live.channel),
            event: js_string(&live.event),
        }
    }
}

fn js_string(value: &str) -> String {
    script_safe_json(&serde_json::Value::from(value).to_string())
}

#[derive(Template)]
#[template(path = "dashboard.html")]
struct DashboardPage<'a> {
    chart_json: String,
    live: Option<&'a LiveScript>,
}

#[derive(Template)]
#[template(path = "pbi_idling.html")]
struct IdlePage<'a> {
    items: &'a [IdlePbi],
    browse_url: &'a str,
}

#[derive(Template)]
#[template(path = "error.html")]
struct ErrorPage<'a> {
    status: &'a str,
    message: &'a str,
}

/// `chart_json` must already be valid JSON.
pub fn dashboard(chart_json: &str, live: Option<&LiveUpdates>) -> askama::Result<String> {
    let live = live.map(LiveScript::new);
    DashboardPage {
        chart_json: script_safe_json(chart_json),
        live: live.as_ref(),
    }
    .render()
}

pub fn idle_pbis(items: &[IdlePbi], browse_url: &str) -> askama::Result<String> {
    IdlePage { items, browse_url }.render()
}

pub fn error_page(status: &str, message: &str) -> askama::Result<String> {
    ErrorPage { status, message }.render()
}
