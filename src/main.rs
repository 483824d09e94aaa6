use anyhow::Result;
use chrono::Local;
use clap::Parser;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use synthetic_aperture_random::catalog::StacCatalog;
use synthetic_aperture_random::credentials::{self, Credentials};
use synthetic_aperture_random::download::HttpDownloader;
use synthetic_aperture_random::geocode;
use synthetic_aperture_random::pipeline::Pipeline;
use synthetic_aperture_random::publish::TwitterPublisher;
use synthetic_aperture_random::render::TilerRenderer;
use synthetic_aperture_random::schedule::{DailySchedule, Scheduler, SystemClock};
use synthetic_aperture_random::settings::BotSettings;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Post a random recent Sentinel-1 radar image as a false-color composite.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Post one image right now (default)
    #[arg(long, conflicts_with = "automatic")]
    manual: bool,

    /// Post one image every day at the configured time
    #[arg(long)]
    automatic: bool,

    /// Run everything except posting
    #[arg(long)]
    test: bool,

    /// TOML settings overriding the built-in defaults
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    if let Some(path) = credentials::load_dotenv()? {
        info!("Loaded environment from {}", path.display());
    }
    let test = cli.test;
    let automatic = cli.automatic && !cli.manual;

    let settings = BotSettings::load(cli.config.as_deref())?;
    let schedule = DailySchedule::parse(&settings.schedule.post_time)?;
    let poll_interval = Duration::from_secs(settings.schedule.poll_interval_secs);

    let publisher = if test {
        None
    } else {
        let credentials = Credentials::from_env()?;
        Some(TwitterPublisher::new(credentials, &settings.publisher)?)
    };

    fs::create_dir_all(&settings.output.destination)?;

    let geocoder = geocode::from_settings(&settings.geocoder)?;

    let pipeline = Pipeline {
        catalog: StacCatalog::new(settings.catalog.clone()),
        renderer: TilerRenderer::new(&settings.render.tiler_api)?,
        downloader: HttpDownloader::new(),
        geocoder,
        publisher,
        settings,
    };

    if !automatic {
        info!("Manual mode selected, an image will be posted now!");
        pipeline.run_once(Local::now().date_naive(), test).await?;
        return Ok(());
    }

    info!(
        "Automatic mode selected, an image will be posted at {}",
        schedule.at().format("%H:%M")
    );
    let cancel = CancellationToken::new();
    let stopper = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, stopping");
            stopper.cancel();
        }
    });

    let pipeline = &pipeline;
    let scheduler = Scheduler::new(schedule, poll_interval);
    scheduler
        .run(&SystemClock, cancel, move || {
            pipeline.run_once(Local::now().date_naive(), test)
        })
        .await?;
    Ok(())
}
