//! One end-to-end run: search, select, describe, composite, render, download, post.
use crate::caption::Caption;
use crate::catalog::{select_index, Catalog, DateWindow};
use crate::composite::{pseudocolor, SarImage};
use crate::download::{image_path, Download};
use crate::error::BotError;
use crate::geocode::Geocoder;
use crate::publish::Publisher;
use crate::render::Renderer;
use crate::scene::{BandPair, Scene};
use crate::settings::BotSettings;
use anyhow::Result;
use chrono::NaiveDate;
use std::path::PathBuf;
use tracing::{error, info};

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The search window had no matching scenes.
    NoScene,
    /// Image downloaded but not posted.
    Downloaded { image: PathBuf, caption: Caption },
    Posted { image: PathBuf, caption: Caption },
}

pub struct Pipeline<C, G, R, D, P> {
    pub settings: BotSettings,
    pub catalog: C,
    pub geocoder: G,
    pub renderer: R,
    pub downloader: D,
    /// `None` when the bot only ever runs in test mode.
    pub publisher: Option<P>,
}

impl<C, G, R, D, P> Pipeline<C, G, R, D, P>
where
    C: Catalog,
    G: Geocoder,
    R: Renderer,
    D: Download,
    P: Publisher,
{
    /// Run the job once for the window ending `today`. With `test` set nothing is posted.
    pub async fn run_once(self: &Self, today: NaiveDate, test: bool) -> Result<Outcome> {
        info!("Starting job");
        let window = DateWindow::ending(today, self.settings.catalog.days_interval);
        let items = self.catalog.search(&window).await?;

        let policy = self.settings.catalog.selection;
        let Some(idx) = select_index(items.len(), policy, &mut rand::rng()) else {
            error!("Couldn't find image in interval {}", window);
            return Ok(Outcome::NoScene);
        };
        info!("{} images found", items.len());
        info!("Image {} in the stack selected", idx);

        let scene = Scene::from_item(&items[idx])?;
        let bands = BandPair::resolve(&scene.bands)?;
        let caption = Caption::describe(&scene, &bands, &self.geocoder)?;
        info!("Image info: \n{}", caption);

        let render = &self.settings.render;
        let linear = SarImage::from_bands(&scene.bands)
            .to_decibels(render.input_units, render.calibration_db)
            .to_linear();
        let composite = pseudocolor(&linear, &bands)?;
        let url = self
            .renderer
            .thumbnail_url(&scene, &composite, &self.settings.render_params())?;

        let image = image_path(&self.settings.output.destination);
        info!("Downloading image to file {}", image.display());
        let byte_count = self.downloader.fetch(&url, &image).await?;
        info!("Image downloaded ({} bytes)", byte_count);

        if test {
            info!("This is a test, image won't be posted");
            return Ok(Outcome::Downloaded { image, caption });
        }

        let publisher = self.publisher.as_ref().ok_or(BotError::NoPublisher)?;
        info!("Posting image");
        publisher.publish(&image, &caption).await?;
        info!("Image posted!");
        Ok(Outcome::Posted { image, caption })
    }
}
