use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::notify::error::DeliveryError;
use crate::notify::transport::ChatTransport;

pub const SLACK_API: &str = "https://slack.com/api";

/// Slack Web API client authenticated with a bot token.
pub struct Slack {
    client: reqwest::Client,
    token: String,
    api_base: String,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    upload_url: Option<String>,
    #[serde(default)]
    file_id: Option<String>,
}

#[derive(Serialize)]
struct UploadedFile<'a> {
    id: &'a str,
    title: &'a str,
}

impl Slack {
    pub fn new(client: reqwest::Client, token: String) -> Self {
        Self {
            client,
            token,
            api_base: SLACK_API.to_string(),
        }
    }

    async fn call(
        &self,
        method: &'static str,
        form: &[(&str, &str)],
    ) -> Result<ApiResponse, DeliveryError> {
        let response = self
            .client
            .post(format!("{}/{}", self.api_base, method))
            .bearer_auth(&self.token)
            .form(form)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(DeliveryError::Status { method, status });
        }
        check(method, response.json().await?)
    }

    async fn post_message(&self, channel: &str, text: &str) -> Result<(), DeliveryError> {
        self.call("chat.postMessage", &[("channel", channel), ("text", text)])
            .await?;
        log::info!("Posted digest to {}", channel);
        Ok(())
    }

    /// External upload flow: reserve an upload URL, send the bytes, then share
    /// the file to the channel with the digest as its comment.
    async fn upload(&self, channel: &str, text: &str, path: &Path) -> Result<(), DeliveryError> {
        let bytes = std::fs::read(path)?;
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("SatPass.ics");
        let length = bytes.len().to_string();

        let reserved = self
            .call(
                "files.getUploadURLExternal",
                &[("filename", filename), ("length", length.as_str())],
            )
            .await?;
        let (Some(upload_url), Some(file_id)) = (reserved.upload_url, reserved.file_id) else {
            return Err(DeliveryError::Api {
                method: "files.getUploadURLExternal",
                error: "missing upload_url or file_id".to_string(),
            });
        };

        let response = self
            .client
            .post(&upload_url)
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(bytes)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(DeliveryError::Status {
                method: "file upload",
                status: response.status(),
            });
        }

        let files = serde_json::to_string(&[UploadedFile {
            id: &file_id,
            title: filename,
        }])
        .map_err(|e| DeliveryError::Api {
            method: "files.completeUploadExternal",
            error: e.to_string(),
        })?;
        self.call(
            "files.completeUploadExternal",
            &[
                ("files", files.as_str()),
                ("channel_id", channel),
                ("initial_comment", text),
            ],
        )
        .await?;
        log::info!("Uploaded {} with digest to {}", filename, channel);
        Ok(())
    }
}

impl ChatTransport for Slack {
    async fn deliver(
        &self,
        channel: &str,
        text: &str,
        attachment: Option<&Path>,
    ) -> Result<(), DeliveryError> {
        match attachment {
            Some(path) => self.upload(channel, text, path).await,
            None => self.post_message(channel, text).await,
        }
    }
}

fn check(method: &'static str, response: ApiResponse) -> Result<ApiResponse, DeliveryError> {
    if response.ok {
        Ok(response)
    } else {
        Err(DeliveryError::Api {
            method,
            error: response.error.unwrap_or_else(|| "unknown error".to_string()),
        })
    }
}
