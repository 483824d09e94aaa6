use anyhow::Result;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use url::Url;
use uuid::Uuid;

pub trait Download {
    /// Fetch `url` into `output`, returning the number of bytes written.
    async fn fetch(self: &Self, url: &Url, output: &Path) -> Result<u64>;
}

pub struct HttpDownloader {
    client: reqwest::Client,
}

impl HttpDownloader {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Download for HttpDownloader {
    async fn fetch(self: &Self, url: &Url, output: &Path) -> Result<u64> {
        // Make parent directories as necessary
        if let Some(parent_dir) = output.parent() {
            fs::create_dir_all(parent_dir).await?;
        }

        let mut response = self
            .client
            .get(url.clone())
            .send()
            .await?
            .error_for_status()?;

        // Stream into a .partial file, renamed once the body is complete
        let partial = partial_path(output);
        let mut partial_file = fs::File::create(&partial).await?;
        let mut byte_count: u64 = 0;
        while let Some(bytes) = response.chunk().await? {
            partial_file.write_all(&bytes).await?;
            byte_count += bytes.len() as u64;
        }
        partial_file.flush().await?;
        drop(partial_file);

        fs::rename(&partial, output).await?;
        Ok(byte_count)
    }
}

/// `<destination>/<uuid>.jpg`
pub fn image_path(destination: &Path) -> PathBuf {
    destination.join(format!("{}.jpg", Uuid::new_v4()))
}

fn partial_path(output: &Path) -> PathBuf {
    let mut name = output.as_os_str().to_owned();
    name.push(".partial");
    PathBuf::from(name)
}
