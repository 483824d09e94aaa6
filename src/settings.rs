use crate::catalog::SelectionPolicy;
use crate::composite::InputUnits;
use crate::render::RenderParams;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use toml;

/// Immutable bot configuration, built once at startup.
#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct BotSettings {
    pub catalog: CatalogSettings,
    pub render: RenderSettings,
    pub schedule: ScheduleSettings,
    pub output: OutputSettings,
    pub geocoder: GeocoderSettings,
    pub publisher: PublisherSettings,
}

#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct CatalogSettings {
    pub search_api: String,
    pub collection: String,
    pub instrument_mode: String,
    pub resolution: String,
    pub days_interval: u32,
    pub page_size: u32,
    /// Stop paging after this many results. Unset pages through the whole window.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_scenes: Option<usize>,
    pub selection: SelectionPolicy,
}

#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct RenderSettings {
    pub tiler_api: String,
    pub bands: Vec<String>,
    pub max_size: u32,
    pub format: String,
    pub input_units: InputUnits,
    /// Constant gain removed from amplitude inputs, in dB.
    pub calibration_db: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rescale: Option<(f64, f64)>,
}

#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct ScheduleSettings {
    pub post_time: String,
    pub poll_interval_secs: u64,
}

#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct OutputSettings {
    pub destination: PathBuf,
}

#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct GeocoderSettings {
    /// `latitude,longitude,city,country` CSV replacing the built-in GeoNames index.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dataset: Option<PathBuf>,
}

#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct PublisherSettings {
    pub upload_api: String,
    pub post_api: String,
}

pub fn settings_toml() -> toml::Table {
    toml::toml! {
        [catalog]
        search_api = "https://planetarycomputer.microsoft.com/api/stac/v1/search"
        collection = "sentinel-1-grd"
        instrument_mode = "IW"
        resolution = "high"
        days_interval = 2
        page_size = 250
        // "truncated" never picks the last search result, "uniform" can
        selection = "truncated"

        [render]
        tiler_api = "https://planetarycomputer.microsoft.com/api/data/v1/item/"
        bands = ["red", "green", "blue"]
        max_size = 1000
        format = "jpg"
        // sentinel-1-grd assets hold amplitude digital numbers, not dB
        input_units = "amplitude"
        calibration_db = 54.0
        rescale = [0.0, 1.0]

        [schedule]
        post_time = "15:00"
        poll_interval_secs = 60

        [output]
        destination = "images"

        [geocoder]

        [publisher]
        upload_api = "https://upload.twitter.com/1.1/media/upload.json"
        post_api = "https://api.twitter.com/2/tweets"
    }
}

impl BotSettings {
    pub fn from_template(table: &toml::Table) -> Result<Self> {
        let settings: Self = toml::from_str(&table.to_string())?;
        Ok(settings)
    }

    /// Built-in defaults, overridden key by key with the file at `path` when given.
    /// Relative paths in the file are taken relative to the file's directory.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut table = settings_toml();
        let Some(path) = path else {
            return Self::from_template(&table);
        };
        let content = fs::read_to_string(path)?;
        let overrides: toml::Table = toml::from_str(&content)?;
        merge_tables(&mut table, overrides);

        let mut settings = Self::from_template(&table)?;
        if let Some(base) = path.parent() {
            settings.resolve_paths(base);
        }
        Ok(settings)
    }

    fn resolve_paths(self: &mut Self, base: &Path) {
        let resolve = |p: &Path| {
            if p.is_relative() {
                base.join(p)
            } else {
                p.to_path_buf()
            }
        };
        self.geocoder.dataset = self.geocoder.dataset.as_deref().map(resolve);
    }

    pub fn write<P: AsRef<Path>>(self: &Self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn render_params(self: &Self) -> RenderParams {
        RenderParams {
            bands: self.render.bands.clone(),
            max_size: self.render.max_size,
            format: self.render.format.clone(),
            rescale: self.render.rescale,
        }
    }
}

fn merge_tables(base: &mut toml::Table, overrides: toml::Table) {
    for (key, value) in overrides {
        if let toml::Value::Table(section) = &value {
            if let Some(toml::Value::Table(base_section)) = base.get_mut(&key) {
                merge_tables(base_section, section.clone());
                continue;
            }
        }
        base.insert(key, value);
    }
}
