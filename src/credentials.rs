use crate::error::BotError;
use crate::oauth::Token;
use anyhow::Result;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

pub const APP_KEY: &str = "APP_KEY";
pub const APP_SECRET: &str = "APP_SECRET";
pub const OAUTH_TOKEN: &str = "OAUTH_TOKEN";
pub const OAUTH_TOKEN_SECRET: &str = "OAUTH_TOKEN_SECRET";

/// Application (consumer) key and secret.
#[derive(Clone, PartialEq, Eq)]
pub struct ConsumerKey {
    pub key: String,
    pub secret: String,
}

impl fmt::Debug for ConsumerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConsumerKey")
            .field("key", &self.key)
            .field("secret", &"***")
            .finish()
    }
}

impl ConsumerKey {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        Ok(Self {
            key: require(&lookup, APP_KEY)?,
            secret: require(&lookup, APP_SECRET)?,
        })
    }
}

/// The four OAuth 1.0a credentials needed to post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub consumer: ConsumerKey,
    pub access: Token,
}

impl Credentials {
    /// Read all four variables from the process environment, failing on the first missing one.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let consumer = ConsumerKey::from_lookup(&lookup)?;
        let access = Token {
            key: require(&lookup, OAUTH_TOKEN)?,
            secret: require(&lookup, OAUTH_TOKEN_SECRET)?,
        };
        Ok(Self { consumer, access })
    }
}

/// Load a `.env` file from the working directory or its parents into the process
/// environment. Variables already set win. A missing file is not an error.
pub fn load_dotenv() -> Result<Option<PathBuf>> {
    match dotenv::dotenv() {
        Ok(path) => Ok(Some(path)),
        Err(dotenv::Error::Io(e)) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Like [`load_dotenv`] for an explicit file. Returns whether the file existed.
pub fn load_env_file(path: &Path) -> Result<bool> {
    match dotenv::from_path(path) {
        Ok(()) => Ok(true),
        Err(dotenv::Error::Io(e)) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

fn require(lookup: &impl Fn(&str) -> Option<String>, name: &'static str) -> Result<String> {
    match lookup(name) {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(BotError::MissingCredential(name).into()),
    }
}
