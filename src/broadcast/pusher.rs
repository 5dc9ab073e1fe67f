//! Client for the Pusher Channels HTTP API.

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use md5::{Digest, Md5};
use serde::Serialize;
use sha2::Sha256;

use super::{BroadcastError, Broadcaster};
use crate::config::PusherConfig;

const MAX_NAME_LEN: usize = 200;
pub const MAX_PAYLOAD_BYTES: usize = 10_240;

#[derive(Serialize)]
struct EventBody<'a> {
    name: &'a str,
    channels: [&'a str; 1],
    data: &'a str,
}

pub struct PusherClient {
    app_id: String,
    key: String,
    secret: String,
    base_url: String,
    client: reqwest::Client,
}

impl PusherClient {
    pub fn new(config: &PusherConfig) -> Self {
        Self {
            app_id: config.app_id.clone(),
            key: config.key.clone(),
            secret: config.secret.clone(),
            base_url: format!("https://api-{}.pusher.com", config.cluster),
            client: reqwest::Client::new(),
        }
    }

    fn events_path(&self) -> String {
        format!("/apps/{}/events", self.app_id)
    }

    /// Authentication query parameters, in the sorted order they are signed in.
    fn signed_query(&self, path: &str, body: &[u8], timestamp: i64) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("auth_key", self.key.clone()),
            ("auth_timestamp", timestamp.to_string()),
            ("auth_version", "1.0".to_string()),
            ("body_md5", hex::encode(Md5::digest(body))),
        ];
        let query = params
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&");
        let to_sign = format!("POST\n{path}\n{query}");
        params.push(("auth_signature", sign(&self.secret, &to_sign)));
        params
    }
}

fn sign(secret: &str, payload: &str) -> String {
    let mut mac =
        Hmac::<Sha256>::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(payload.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

pub fn validate_channel(channel: &str) -> Result<(), BroadcastError> {
    let valid = !channel.is_empty()
        && channel.len() <= MAX_NAME_LEN
        && channel
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_=@,.;".contains(c));
    if valid {
        Ok(())
    } else {
        Err(BroadcastError::InvalidChannel(channel.to_string()))
    }
}

pub fn validate_event(event: &str) -> Result<(), BroadcastError> {
    if event.is_empty() || event.len() > MAX_NAME_LEN {
        return Err(BroadcastError::InvalidEvent(event.to_string()));
    }
    Ok(())
}

#[async_trait]
impl Broadcaster for PusherClient {
    async fn trigger(&self, channel: &str, event: &str, data: &str) -> Result<(), BroadcastError> {
        validate_channel(channel)?;
        validate_event(event)?;
        if data.len() > MAX_PAYLOAD_BYTES {
            return Err(BroadcastError::PayloadTooLarge {
                size: data.len(),
                limit: MAX_PAYLOAD_BYTES,
            });
        }

        let body = serde_json::to_vec(&EventBody {
            name: event,
            channels: [channel],
            data,
        })?;
        let path = self.events_path();
        let query = self.signed_query(&path, &body, chrono::Utc::now().timestamp());

        tracing::debug!(channel, event, bytes = data.len(), "triggering broadcast");
        let resp = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .query(&query)
            .header("Content-Type", "application/json")
            .body(body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(BroadcastError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}
