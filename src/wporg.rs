//! WordPress.org remote version lookups
//!
//! Scrapes the public releases listing and per-plugin pages into two
//! in-memory caches. The caches have deliberately different fill policies:
//! the core release map is populated in one shot and kept for the rest of
//! the run even when empty, while plugin entries are recorded per slug and
//! only on success, so a failed lookup is retried on the next encounter.

use crate::error::{Error, Result};
use crate::version::PackageVersion;
use chrono::NaiveDate;
use regex::Regex;
use reqwest::blocking::Client;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashMap;
use tracing::{debug, warn};
use url::Url;

/// User agent for requests (standard Chrome on Windows)
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

/// Public WordPress.org site
const WP_ORG_BASE: &str = "https://wordpress.org";

/// Core releases listing page
const RELEASES_PATH: &str = "download/releases/";

/// Literal notice on the page of a plugin removed from the directory
const CLOSED_MARKER: &str = "This plugin has been closed";

/// Date formats seen on the releases page
const RELEASE_DATE_FORMATS: &[&str] = &["%B %e, %Y", "%B %d, %Y", "%Y-%m-%d", "%d %B %Y"];

/// Latest published state of a plugin
#[derive(Debug, Clone)]
pub struct PluginStatus {
    /// Latest version listed on the plugin's page
    pub latest: PackageVersion,
    /// Whether the plugin has been closed
    pub closed: bool,
}

/// Release dates of the newest version of every core branch.
///
/// Filled in one shot on first use and never refreshed, even when the fetch
/// failed or parsed to nothing.
#[derive(Debug, Default)]
struct CoreReleaseCache {
    entries: Option<HashMap<String, NaiveDate>>,
}

impl CoreReleaseCache {
    fn is_filled(&self) -> bool {
        self.entries.is_some()
    }

    fn fill(&mut self, entries: HashMap<String, NaiveDate>) {
        self.entries = Some(entries);
    }

    fn get(&self, version: &str) -> Option<NaiveDate> {
        self.entries.as_ref()?.get(version).copied()
    }
}

/// Latest known state per plugin slug.
///
/// Grows one slug at a time and only on success; failed lookups are not
/// recorded.
#[derive(Debug, Default)]
struct PluginCache {
    entries: HashMap<String, PluginStatus>,
}

impl PluginCache {
    fn get(&self, slug: &str) -> Option<&PluginStatus> {
        self.entries.get(slug)
    }

    fn record(&mut self, slug: &str, status: PluginStatus) {
        self.entries.insert(slug.to_string(), status);
    }
}

/// Memoized client for version data published on WordPress.org
#[derive(Debug)]
pub struct WpOrg {
    client: Client,
    base_url: Url,
    core: CoreReleaseCache,
    plugins: PluginCache,
}

impl WpOrg {
    /// Create a client for the public WordPress.org site
    pub fn new() -> Result<Self> {
        let base_url = Url::parse(WP_ORG_BASE).map_err(|e| Error::InvalidUrl(e.to_string()))?;
        Self::with_base_url(base_url)
    }

    /// Create a client against a different base URL (mock servers in tests)
    pub fn with_base_url(base_url: Url) -> Result<Self> {
        // No request timeout: a stalled remote blocks the scan until the
        // server gives up.
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| Error::HttpClient(e.to_string()))?;
        Ok(Self {
            client,
            base_url,
            core: CoreReleaseCache::default(),
            plugins: PluginCache::default(),
        })
    }

    /// Release date of the given core version, but only if it is the newest
    /// release of its branch on the releases page. `None` otherwise.
    pub fn core_release_date(&mut self, version: &str) -> Option<NaiveDate> {
        if !self.core.is_filled() {
            let releases = self.fetch_core_releases().unwrap_or_default();
            debug!("cached {} core release rows", releases.len());
            self.core.fill(releases);
        }
        self.core.get(version)
    }

    /// Latest version and closed flag for the plugin with the given slug.
    ///
    /// `None` means the lookup could not determine anything: the request
    /// failed, or the page carried no recognizable version. Such lookups
    /// are not cached and are retried on the next call.
    pub fn plugin_latest(&mut self, slug: &str) -> Option<PluginStatus> {
        if let Some(hit) = self.plugins.get(slug) {
            debug!("plugin {slug} served from cache");
            return Some(hit.clone());
        }
        let status = self.fetch_plugin_status(slug)?;
        self.plugins.record(slug, status.clone());
        Some(status)
    }

    /// Scrape the releases page into version -> release date.
    ///
    /// Every table contributes its first row only; the first two cells are
    /// the newest version of a branch and its release date.
    fn fetch_core_releases(&self) -> Option<HashMap<String, NaiveDate>> {
        let url = self.base_url.join(RELEASES_PATH).ok()?;
        let body = self.fetch_page(&url)?;
        let document = Html::parse_document(&body);
        let table_sel = Selector::parse("table").ok()?;
        let row_sel = Selector::parse("tr").ok()?;
        let cell_sel = Selector::parse("td").ok()?;

        let mut releases = HashMap::new();
        for table in document.select(&table_sel) {
            let Some(row) = table.select(&row_sel).next() else {
                continue;
            };
            let mut cells = row.select(&cell_sel);
            let (Some(version), Some(date)) = (cells.next(), cells.next()) else {
                continue;
            };
            let Some(date) = parse_release_date(&cell_text(date)) else {
                continue;
            };
            releases.insert(cell_text(version), date);
        }
        Some(releases)
    }

    fn fetch_plugin_status(&self, slug: &str) -> Option<PluginStatus> {
        let url = self.base_url.join(&format!("plugins/{slug}")).ok()?;
        let body = self.fetch_page(&url)?;
        let closed = body.contains(CLOSED_MARKER);
        let document = Html::parse_document(&body);
        let meta_sel = Selector::parse(".entry-meta").ok()?;
        let meta = document.select(&meta_sel).next()?;
        let text = meta.text().collect::<String>();
        let re = Regex::new(r"Version:\s*([0-9.]+)").ok()?;
        let caps = re.captures(&text)?;
        Some(PluginStatus {
            latest: PackageVersion::parse(&caps[1]),
            closed,
        })
    }

    /// GET a page, returning its body only on a 2xx response
    fn fetch_page(&self, url: &Url) -> Option<String> {
        debug!("GET {url}");
        let response = match self.client.get(url.as_str()).send() {
            Ok(response) => response,
            Err(e) => {
                warn!("request to {url} failed: {e}");
                return None;
            }
        };
        if !response.status().is_success() {
            debug!("{url} answered {}", response.status());
            return None;
        }
        response.text().ok()
    }
}

fn cell_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// Lenient human-date parsing for the release table
fn parse_release_date(text: &str) -> Option<NaiveDate> {
    RELEASE_DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(text, format).ok())
}
