use crate::settings::CatalogSettings;
use anyhow::{anyhow, Result};
use chrono::{Days, NaiveDate};
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use stac::Item;
use std::fmt;

/// Day-granular search interval, `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    pub fn ending(today: NaiveDate, days: u32) -> Self {
        let start = today
            .checked_sub_days(Days::new(days as u64))
            .unwrap_or(NaiveDate::MIN);
        Self { start, end: today }
    }

    /// STAC `datetime` interval string.
    pub fn to_interval(&self) -> String {
        format!("{}T00:00:00Z/{}T00:00:00Z", self.start, self.end)
    }
}

impl fmt::Display for DateWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.start, self.end)
    }
}

pub trait Catalog {
    async fn search(self: &Self, window: &DateWindow) -> Result<Vec<Item>>;
}

#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SelectionPolicy {
    /// `floor(uniform[0, n-1))`: the last result is never selected.
    Truncated,
    Uniform,
}

/// Index of the scene to post, `None` for an empty result set.
pub fn select_index(n: usize, policy: SelectionPolicy, rng: &mut impl Rng) -> Option<usize> {
    match n {
        0 => None,
        1 => Some(0),
        _ => match policy {
            SelectionPolicy::Truncated => {
                let draw: f64 = rng.random_range(0.0..(n - 1) as f64);
                Some((draw as usize).min(n - 2))
            }
            SelectionPolicy::Uniform => Some(rng.random_range(0..n)),
        },
    }
}

/// STAC API `/search` client with fixed Sentinel-1 filters.
pub struct StacCatalog {
    client: reqwest::Client,
    settings: CatalogSettings,
}

impl StacCatalog {
    pub fn new(settings: CatalogSettings) -> Self {
        Self {
            client: reqwest::Client::new(),
            settings,
        }
    }

    pub fn search_body(self: &Self, window: &DateWindow) -> Value {
        serde_json::json!({
            "collections": [self.settings.collection],
            "datetime": window.to_interval(),
            "limit": self.settings.page_size,
            "query": {
                "sar:instrument_mode": {"eq": self.settings.instrument_mode},
                "s1:resolution": {"eq": self.settings.resolution},
            },
        })
    }

    async fn fetch_page(self: &Self, request: PageRequest) -> Result<Value> {
        let builder = match request {
            PageRequest::Post { href, body } => self.client.post(href).json(&body),
            PageRequest::Get { href } => self.client.get(href),
        };
        let page = builder.send().await?.error_for_status()?.json().await?;
        Ok(page)
    }
}

impl Catalog for StacCatalog {
    async fn search(self: &Self, window: &DateWindow) -> Result<Vec<Item>> {
        let mut items: Vec<Item> = vec![];
        let mut request = Some(PageRequest::Post {
            href: self.settings.search_api.to_owned(),
            body: self.search_body(window),
        });

        while let Some(current) = request.take() {
            let page = self.fetch_page(current).await?;
            let features = page
                .get("features")
                .cloned()
                .ok_or(anyhow!("Search response has no 'features'"))?;
            let mut page_items: Vec<Item> = serde_json::from_value(features)?;
            tracing::debug!("Received page of {} items", page_items.len());
            items.append(&mut page_items);

            if let Some(max_scenes) = self.settings.max_scenes {
                if items.len() >= max_scenes {
                    tracing::warn!("Search stopped at max_scenes = {}", max_scenes);
                    items.truncate(max_scenes);
                    break;
                }
            }
            request = next_page(&page);
        }
        Ok(items)
    }
}

#[derive(Debug, Clone, PartialEq)]
enum PageRequest {
    Get { href: String },
    Post { href: String, body: Value },
}

fn next_page(page: &Value) -> Option<PageRequest> {
    let link = page
        .get("links")?
        .as_array()?
        .iter()
        .find(|l| l.get("rel").and_then(Value::as_str) == Some("next"))?;
    let href = link.get("href")?.as_str()?.to_owned();
    let method = link.get("method").and_then(Value::as_str).unwrap_or("GET");
    if method.eq_ignore_ascii_case("POST") {
        let body = link.get("body").cloned().unwrap_or(Value::Null);
        Some(PageRequest::Post { href, body })
    } else {
        Some(PageRequest::Get { href })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::tests::item_json;
    use crate::settings::BotSettings;
    use crate::test_server::{Reply, TestServer};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn feature(id: &str) -> Value {
        let mut json = item_json();
        json["id"] = Value::from(id);
        json
    }

    fn catalog_at(url: &str, max_scenes: Option<usize>) -> StacCatalog {
        let mut settings = BotSettings::load(None).unwrap().catalog;
        settings.search_api = format!("{url}/search");
        settings.max_scenes = max_scenes;
        StacCatalog::new(settings)
    }

    fn window() -> DateWindow {
        DateWindow::ending(NaiveDate::from_ymd_opt(2023, 4, 2).unwrap(), 2)
    }

    fn ids(items: &[Item]) -> Vec<String> {
        items.iter().map(|item| item.id.clone()).collect()
    }

    #[tokio::test]
    async fn test_search_follows_next_links() {
        let server = TestServer::start(|url| {
            vec![
                Reply::json(serde_json::json!({
                    "type": "FeatureCollection",
                    "features": [feature("a"), feature("b")],
                    "links": [{"rel": "next", "href": format!("{url}/search"), "method": "POST",
                               "body": {"token": "next:b"}}]
                })),
                Reply::json(serde_json::json!({
                    "type": "FeatureCollection",
                    "features": [feature("c")],
                    "links": [{"rel": "next", "href": format!("{url}/search?page=3")}]
                })),
                Reply::json(serde_json::json!({
                    "type": "FeatureCollection",
                    "features": [],
                    "links": []
                })),
            ]
        })
        .await;
        let catalog = catalog_at(&server.url, None);

        let items = catalog.search(&window()).await.unwrap();
        assert_eq!(ids(&items), vec!["a", "b", "c"]);

        let requests = server.requests().await;
        assert_eq!(requests[0].method, "POST");
        assert_eq!(requests[0].target, "/search");
        let body = requests[0].json();
        assert_eq!(body["collections"][0], "sentinel-1-grd");
        assert_eq!(body["datetime"], "2023-03-31T00:00:00Z/2023-04-02T00:00:00Z");
        assert_eq!(requests[1].method, "POST");
        assert_eq!(requests[1].json(), serde_json::json!({"token": "next:b"}));
        assert_eq!(requests[2].method, "GET");
        assert_eq!(requests[2].target, "/search?page=3");
    }

    #[tokio::test]
    async fn test_search_stops_at_max_scenes() {
        let server = TestServer::start(|url| {
            vec![Reply::json(serde_json::json!({
                "type": "FeatureCollection",
                "features": [feature("a"), feature("b"), feature("c")],
                "links": [{"rel": "next", "href": format!("{url}/search?page=2")}]
            }))]
        })
        .await;
        let catalog = catalog_at(&server.url, Some(2));

        let items = catalog.search(&window()).await.unwrap();
        assert_eq!(ids(&items), vec!["a", "b"]);
        assert_eq!(server.requests().await.len(), 1);
    }

    #[tokio::test]
    async fn test_search_without_features() {
        let server =
            TestServer::start(|_| vec![Reply::json(serde_json::json!({"type": "FeatureCollection"}))])
                .await;
        let catalog = catalog_at(&server.url, None);

        let err = catalog.search(&window()).await.unwrap_err();
        assert_eq!(err.to_string(), "Search response has no 'features'");
    }

    #[tokio::test]
    async fn test_search_http_error() {
        let server = TestServer::start(|_| vec![Reply::status(502)]).await;
        let catalog = catalog_at(&server.url, None);

        let err = catalog.search(&window()).await.unwrap_err();
        let status = err.downcast_ref::<reqwest::Error>().and_then(reqwest::Error::status);
        assert_eq!(status, Some(reqwest::StatusCode::BAD_GATEWAY));
    }

    #[test]
    fn test_date_window() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let window = DateWindow::ending(today, 2);
        assert_eq!(window.start, NaiveDate::from_ymd_opt(2024, 2, 28).unwrap());
        assert_eq!(window.to_interval(), "2024-02-28T00:00:00Z/2024-03-01T00:00:00Z");
        assert_eq!(window.to_string(), "[2024-02-28, 2024-03-01]");
    }

    #[test]
    fn test_search_body() {
        let settings = BotSettings::load(None).unwrap();
        let catalog = StacCatalog::new(settings.catalog);
        let today = NaiveDate::from_ymd_opt(2024, 5, 4).unwrap();
        let body = catalog.search_body(&DateWindow::ending(today, 2));
        assert_eq!(body["collections"][0], "sentinel-1-grd");
        assert_eq!(body["datetime"], "2024-05-02T00:00:00Z/2024-05-04T00:00:00Z");
        assert_eq!(body["query"]["sar:instrument_mode"]["eq"], "IW");
        assert_eq!(body["query"]["s1:resolution"]["eq"], "high");
    }

    #[test]
    fn test_select_index_truncated_never_picks_last() {
        let mut rng = StdRng::seed_from_u64(7);
        for n in 2..12 {
            let mut seen = vec![false; n];
            for _ in 0..2000 {
                let idx = select_index(n, SelectionPolicy::Truncated, &mut rng).unwrap();
                assert!(idx <= n - 2, "n={n} idx={idx}");
                seen[idx] = true;
            }
            assert!(seen[..n - 1].iter().all(|s| *s), "n={n}");
            assert!(!seen[n - 1]);
        }
    }

    #[test]
    fn test_select_index_uniform_reaches_last() {
        let mut rng = StdRng::seed_from_u64(11);
        let hits = (0..2000)
            .filter(|_| select_index(3, SelectionPolicy::Uniform, &mut rng) == Some(2))
            .count();
        assert!(hits > 0);
    }

    #[test]
    fn test_select_index_edges() {
        let mut rng = StdRng::seed_from_u64(0);
        for policy in [SelectionPolicy::Truncated, SelectionPolicy::Uniform] {
            assert_eq!(select_index(0, policy, &mut rng), None);
            assert_eq!(select_index(1, policy, &mut rng), Some(0));
        }
    }

    #[test]
    fn test_next_page() {
        let page = serde_json::json!({
            "features": [],
            "links": [
                {"rel": "self", "href": "https://example.com/search"},
                {"rel": "next", "href": "https://example.com/search", "method": "POST",
                 "body": {"token": "next:abc"}}
            ]
        });
        assert_eq!(
            next_page(&page),
            Some(PageRequest::Post {
                href: "https://example.com/search".to_string(),
                body: serde_json::json!({"token": "next:abc"}),
            })
        );

        let page = serde_json::json!({
            "links": [{"rel": "next", "href": "https://example.com/search?page=2"}]
        });
        assert_eq!(
            next_page(&page),
            Some(PageRequest::Get { href: "https://example.com/search?page=2".to_string() })
        );

        let page = serde_json::json!({"features": [], "links": []});
        assert_eq!(next_page(&page), None);
    }
}
