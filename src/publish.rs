use crate::caption::Caption;
use crate::credentials::Credentials;
use crate::oauth::{authorization_header, OAuthParams};
use crate::settings::PublisherSettings;
use anyhow::{anyhow, Result};
use reqwest::multipart::{Form, Part};
use serde_json::Value;
use std::path::Path;
use url::Url;

pub trait Publisher {
    async fn publish(self: &Self, image: &Path, caption: &Caption) -> Result<()>;
}

/// Posts through the Twitter media upload (v1.1) and post creation (v2) endpoints.
pub struct TwitterPublisher {
    client: reqwest::Client,
    credentials: Credentials,
    upload_api: Url,
    post_api: Url,
}

impl TwitterPublisher {
    pub fn new(credentials: Credentials, settings: &PublisherSettings) -> Result<Self> {
        Ok(Self {
            client: reqwest::Client::new(),
            credentials,
            upload_api: Url::parse(&settings.upload_api)?,
            post_api: Url::parse(&settings.post_api)?,
        })
    }

    fn authorization(self: &Self, method: &str, url: &Url) -> Result<String> {
        authorization_header(
            method,
            url,
            &[],
            &self.credentials.consumer,
            Some(&self.credentials.access),
            OAuthParams::fresh(),
        )
    }

    async fn upload_media(self: &Self, image: &Path) -> Result<String> {
        let bytes = tokio::fs::read(image).await?;
        let file_name = image
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image.jpg".to_string());
        let form = Form::new().part("media", Part::bytes(bytes).file_name(file_name));

        let response: Value = self
            .client
            .post(self.upload_api.clone())
            .header(
                reqwest::header::AUTHORIZATION,
                self.authorization("POST", &self.upload_api)?,
            )
            .multipart(form)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        media_id(&response)
    }

    async fn create_post(self: &Self, text: &str, media_id: &str) -> Result<Value> {
        let response = self
            .client
            .post(self.post_api.clone())
            .header(
                reqwest::header::AUTHORIZATION,
                self.authorization("POST", &self.post_api)?,
            )
            .json(&post_body(text, media_id))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(response)
    }
}

impl Publisher for TwitterPublisher {
    async fn publish(self: &Self, image: &Path, caption: &Caption) -> Result<()> {
        let media_id = self.upload_media(image).await?;
        tracing::debug!("Uploaded {} as media {}", image.display(), media_id);
        let post = self.create_post(&caption.to_string(), &media_id).await?;
        if let Some(id) = post.pointer("/data/id").and_then(Value::as_str) {
            tracing::info!("Created post {}", id);
        }
        Ok(())
    }
}

fn media_id(response: &Value) -> Result<String> {
    response
        .get("media_id_string")
        .and_then(Value::as_str)
        .map(str::to_owned)
        .or_else(|| response.get("media_id").and_then(Value::as_u64).map(|id| id.to_string()))
        .ok_or(anyhow!("Media upload response has no media id: {}", response))
}

fn post_body(text: &str, media_id: &str) -> Value {
    serde_json::json!({
        "text": text,
        "media": { "media_ids": [media_id] },
    })
}
