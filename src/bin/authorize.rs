//! One-time OAuth PIN flow printing the access token/secret to store as
//! `OAUTH_TOKEN` and `OAUTH_TOKEN_SECRET`.
use anyhow::Result;
use std::io::{self, BufRead, Write};
use synthetic_aperture_random::credentials::{self, ConsumerKey};
use synthetic_aperture_random::oauth;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().init();

    credentials::load_dotenv()?;
    let consumer = ConsumerKey::from_env()?;
    let client = reqwest::Client::new();

    let request_token = oauth::request_token(&client, &consumer).await?;
    println!("{}", oauth::authorize_url(&request_token)?);

    // Open the url above in a browser, authorize the app and paste the PIN
    print!("Enter your pin: ");
    io::stdout().flush()?;
    let mut pin = String::new();
    io::stdin().lock().read_line(&mut pin)?;

    let access = oauth::access_token(&client, &consumer, &request_token, pin.trim()).await?;
    let account = oauth::verify_credentials(&client, &consumer, &access).await?;
    println!("{}", serde_json::to_string_pretty(&account)?);

    println!("OAUTH_TOKEN={}", access.key);
    println!("OAUTH_TOKEN_SECRET={}", access.secret);
    Ok(())
}
