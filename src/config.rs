use std::sync::LazyLock;
use std::time::Duration;

use scraper::{Html, Selector};

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_MAX_RETRIES: u32 = 3;
const DEFAULT_BACKOFF_MS: u64 = 2000;
const USER_AGENT: &str = concat!("case_scraper/", env!("CARGO_PKG_VERSION"));

static HEADING_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("title, h1, h2").unwrap());
static FORM_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("form[action]").unwrap());

/// Transport settings, fixed for the lifetime of one run.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub timeout: Duration,
    pub max_retries: u32,
    pub base_backoff: Duration,
    pub user_agent: String,
    pub headers: Vec<(String, String)>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_retries: DEFAULT_MAX_RETRIES,
            base_backoff: Duration::from_millis(DEFAULT_BACKOFF_MS),
            user_agent: USER_AGENT.to_string(),
            headers: vec![(
                "Accept".to_string(),
                "text/html,application/xhtml+xml".to_string(),
            )],
        }
    }
}

impl FetchConfig {
    /// Defaults, with `CASE_SCRAPER_TIMEOUT_SECS`, `CASE_SCRAPER_MAX_RETRIES`
    /// and `CASE_SCRAPER_BACKOFF_MS` applied when set and parseable.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        let parse = |key: &str| lookup(key).and_then(|v| v.trim().parse::<u64>().ok());

        if let Some(secs) = parse("CASE_SCRAPER_TIMEOUT_SECS") {
            config.timeout = Duration::from_secs(secs);
        }
        if let Some(n) = parse("CASE_SCRAPER_MAX_RETRIES") {
            if let Ok(n) = u32::try_from(n) {
                config.max_retries = n;
            }
        }
        if let Some(ms) = parse("CASE_SCRAPER_BACKOFF_MS") {
            config.base_backoff = Duration::from_millis(ms);
        }
        config
    }

    /// Delay before retry number `attempt` (0-based): `base * 2^attempt`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.base_backoff
            .checked_mul(2u32.saturating_pow(attempt.min(16)))
            .unwrap_or(Duration::MAX)
    }
}

/// Interstitial disclaimer handling for a gated portal.
#[derive(Debug, Clone)]
pub struct GateConfig {
    /// Lower-case fragments that mark the gate when found in the page title
    /// or a top-level heading. Links elsewhere on a page do not count.
    pub markers: Vec<String>,
    /// Path (relative to the base URL) that records acceptance.
    pub accept_path: String,
    /// Query parameter carrying the gated target URL.
    pub return_param: String,
    pub max_accept_attempts: u32,
}

impl GateConfig {
    /// A page is the gate when a heading names it or it carries the accept form.
    pub fn is_gate(&self, body: &str) -> bool {
        let html = Html::parse_document(body);

        let titled = html.select(&HEADING_SEL).any(|heading| {
            let text = heading.text().collect::<Vec<_>>().join(" ").to_lowercase();
            self.markers.iter().any(|m| text.contains(m.as_str()))
        });
        if titled {
            return true;
        }

        !self.accept_path.is_empty()
            && html
                .select(&FORM_SEL)
                .filter_map(|form| form.value().attr("action"))
                .any(|action| action.contains(self.accept_path.as_str()))
    }
}
