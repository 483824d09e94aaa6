//! OAuth 1.0a request signing (HMAC-SHA1) and the PIN-based token exchange.
use crate::credentials::ConsumerKey;
use crate::error::BotError;
use anyhow::{anyhow, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use hmac::{Hmac, Mac};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use rand::distr::Alphanumeric;
use rand::Rng;
use serde_json::Value;
use sha1::Sha1;
use url::Url;

const REQUEST_TOKEN_URL: &str = "https://api.twitter.com/oauth/request_token";
const AUTHORIZE_URL: &str = "https://api.twitter.com/oauth/authorize";
const ACCESS_TOKEN_URL: &str = "https://api.twitter.com/oauth/access_token";
const VERIFY_CREDENTIALS_URL: &str = "https://api.twitter.com/1.1/account/verify_credentials.json";

/// RFC 3986 unreserved characters stay as-is, everything else is escaped.
const UNRESERVED: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

type HmacSha1 = Hmac<Sha1>;

/// A token/secret pair: request token, or access token.
#[derive(Clone, PartialEq, Eq)]
pub struct Token {
    pub key: String,
    pub secret: String,
}

impl std::fmt::Debug for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Token")
            .field("key", &self.key)
            .field("secret", &"***")
            .finish()
    }
}

pub fn encode(s: &str) -> String {
    utf8_percent_encode(s, UNRESERVED).to_string()
}

/// Protocol parameters of one signed request, before the signature is added.
pub struct OAuthParams {
    pub nonce: String,
    pub timestamp: u64,
    /// Extra `oauth_*` parameters such as `oauth_callback` or `oauth_verifier`.
    pub extra: Vec<(String, String)>,
}

impl OAuthParams {
    pub fn fresh() -> Self {
        let nonce = rand::rng()
            .sample_iter(&Alphanumeric)
            .take(32)
            .map(char::from)
            .collect();
        let timestamp = chrono::Utc::now().timestamp().max(0) as u64;
        Self {
            nonce,
            timestamp,
            extra: vec![],
        }
    }

    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.extra.push((key.to_string(), value.to_string()));
        self
    }
}

/// `METHOD&url&params`, every component percent-encoded and params sorted.
pub fn signature_base_string(method: &str, url: &Url, params: &[(String, String)]) -> String {
    let mut base_url = url.clone();
    base_url.set_query(None);
    base_url.set_fragment(None);

    let mut encoded = params
        .iter()
        .map(|(k, v)| (encode(k), encode(v)))
        .collect::<Vec<_>>();
    encoded.sort();
    let param_string = encoded
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");

    format!(
        "{}&{}&{}",
        method.to_uppercase(),
        encode(base_url.as_str()),
        encode(&param_string)
    )
}

pub fn sign(base_string: &str, consumer_secret: &str, token_secret: Option<&str>) -> Result<String> {
    let key = format!(
        "{}&{}",
        encode(consumer_secret),
        encode(token_secret.unwrap_or(""))
    );
    let mut mac = HmacSha1::new_from_slice(key.as_bytes())
        .map_err(|e| anyhow!("Invalid signing key: {e}"))?;
    mac.update(base_string.as_bytes());
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

/// Value of the `Authorization` header for a request.
///
/// `body_params` are form-encoded body fields; they take part in the signature
/// but are not sent in the header. JSON and multipart bodies are never signed.
pub fn authorization_header(
    method: &str,
    url: &Url,
    body_params: &[(String, String)],
    consumer: &ConsumerKey,
    token: Option<&Token>,
    oauth: OAuthParams,
) -> Result<String> {
    let mut protocol = vec![
        ("oauth_consumer_key".to_string(), consumer.key.to_owned()),
        ("oauth_nonce".to_string(), oauth.nonce),
        ("oauth_signature_method".to_string(), "HMAC-SHA1".to_string()),
        ("oauth_timestamp".to_string(), oauth.timestamp.to_string()),
        ("oauth_version".to_string(), "1.0".to_string()),
    ];
    if let Some(token) = token {
        protocol.push(("oauth_token".to_string(), token.key.to_owned()));
    }
    protocol.extend(oauth.extra);

    let mut all_params = protocol.clone();
    all_params.extend(url.query_pairs().into_owned());
    all_params.extend(body_params.iter().cloned());

    let base_string = signature_base_string(method, url, &all_params);
    let signature = sign(&base_string, &consumer.secret, token.map(|t| t.secret.as_str()))?;
    protocol.push(("oauth_signature".to_string(), signature));
    protocol.sort();

    let fields = protocol
        .iter()
        .map(|(k, v)| format!("{}=\"{}\"", encode(k), encode(v)))
        .collect::<Vec<_>>()
        .join(", ");
    Ok(format!("OAuth {fields}"))
}

fn parse_token_response(body: &str) -> Result<Token> {
    let mut key = None;
    let mut secret = None;
    for (k, v) in url::form_urlencoded::parse(body.as_bytes()) {
        match k.as_ref() {
            "oauth_token" => key = Some(v.into_owned()),
            "oauth_token_secret" => secret = Some(v.into_owned()),
            _ => {}
        }
    }
    Ok(Token {
        key: key.ok_or(BotError::OAuthResponse("oauth_token"))?,
        secret: secret.ok_or(BotError::OAuthResponse("oauth_token_secret"))?,
    })
}

async fn post_for_token(
    client: &reqwest::Client,
    url: &str,
    consumer: &ConsumerKey,
    token: Option<&Token>,
    oauth: OAuthParams,
) -> Result<Token> {
    let url = Url::parse(url)?;
    let header = authorization_header("POST", &url, &[], consumer, token, oauth)?;
    let body = client
        .post(url)
        .header(reqwest::header::AUTHORIZATION, header)
        .send()
        .await?
        .error_for_status()?
        .text()
        .await?;
    parse_token_response(&body)
}

/// Temporary request token for the out-of-band (PIN) flow.
pub async fn request_token(client: &reqwest::Client, consumer: &ConsumerKey) -> Result<Token> {
    let oauth = OAuthParams::fresh().with("oauth_callback", "oob");
    post_for_token(client, REQUEST_TOKEN_URL, consumer, None, oauth).await
}

pub fn authorize_url(request_token: &Token) -> Result<Url> {
    let url = Url::parse_with_params(AUTHORIZE_URL, &[("oauth_token", &request_token.key)])?;
    Ok(url)
}

/// Exchange a request token and the user-entered PIN for a permanent access token.
pub async fn access_token(
    client: &reqwest::Client,
    consumer: &ConsumerKey,
    request_token: &Token,
    pin: &str,
) -> Result<Token> {
    let oauth = OAuthParams::fresh().with("oauth_verifier", pin);
    post_for_token(client, ACCESS_TOKEN_URL, consumer, Some(request_token), oauth).await
}

pub async fn verify_credentials(
    client: &reqwest::Client,
    consumer: &ConsumerKey,
    access: &Token,
) -> Result<Value> {
    let url = Url::parse(VERIFY_CREDENTIALS_URL)?;
    let header = authorization_header("GET", &url, &[], consumer, Some(access), OAuthParams::fresh())?;
    let account = client
        .get(url)
        .header(reqwest::header::AUTHORIZATION, header)
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;
    Ok(account)
}
