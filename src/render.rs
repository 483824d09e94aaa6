use crate::composite::Composite;
use crate::scene::Scene;
use anyhow::Result;
use url::Url;

#[derive(Debug, Clone, PartialEq)]
pub struct RenderParams {
    /// Composite channels, in output band order.
    pub bands: Vec<String>,
    pub max_size: u32,
    pub format: String,
    pub rescale: Option<(f64, f64)>,
}

pub trait Renderer {
    fn thumbnail_url(
        self: &Self,
        scene: &Scene,
        composite: &Composite,
        params: &RenderParams,
    ) -> Result<Url>;
}

/// Builds preview URLs for a TiTiler-style `item/preview.{format}` endpoint.
pub struct TilerRenderer {
    base: Url,
}

impl TilerRenderer {
    pub fn new(tiler_api: &str) -> Result<Self> {
        let mut base = Url::parse(tiler_api)?;
        // Url::join drops the last segment unless the path ends in '/'
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(Self { base })
    }
}

impl Renderer for TilerRenderer {
    fn thumbnail_url(
        self: &Self,
        scene: &Scene,
        composite: &Composite,
        params: &RenderParams,
    ) -> Result<Url> {
        let expression = composite.expression(&params.bands)?;
        let mut url = self.base.join(&format!("preview.{}", params.format))?;
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("collection", &scene.collection)
                .append_pair("item", &scene.id)
                .append_pair("expression", &expression)
                .append_pair("asset_as_band", "True")
                .append_pair("max_size", &params.max_size.to_string());
            if let Some((min, max)) = params.rescale {
                query.append_pair("rescale", &format!("{min},{max}"));
            }
        }
        Ok(url)
    }
}
