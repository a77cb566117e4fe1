/// Provider client configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct KieConfig {
    /// Base URL without trailing slash (default: `https://api.kie.ai`).
    pub base_url: String,
    /// Bearer token. Requests go out unauthenticated when unset.
    pub api_key: Option<String>,
    /// Per-request timeout in seconds (default: `2`). A status query may
    /// send up to [`crate::endpoints::max_status_candidates`] requests.
    pub request_timeout_secs: u64,
    /// Records requested per history page (default: `20`).
    pub history_page_size: u32,
}

impl KieConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                    | Default              |
    /// |----------------------------|----------------------|
    /// | `KIE_API_BASE_URL`         | `https://api.kie.ai` |
    /// | `KIE_API_KEY`              | unset                |
    /// | `KIE_REQUEST_TIMEOUT_SECS` | `2`                  |
    /// | `KIE_HISTORY_PAGE_SIZE`    | `20`                 |
    pub fn from_env() -> Self {
        let base_url = std::env::var("KIE_API_BASE_URL")
            .unwrap_or_else(|_| "https://api.kie.ai".into())
            .trim_end_matches('/')
            .to_string();

        let api_key = std::env::var("KIE_API_KEY")
            .ok()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty());

        let request_timeout_secs: u64 = std::env::var("KIE_REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "2".into())
            .parse()
            .expect("KIE_REQUEST_TIMEOUT_SECS must be a valid u64");

        let history_page_size: u32 = std::env::var("KIE_HISTORY_PAGE_SIZE")
            .unwrap_or_else(|_| "20".into())
            .parse()
            .expect("KIE_HISTORY_PAGE_SIZE must be a valid u32");

        Self {
            base_url,
            api_key,
            request_timeout_secs,
            history_page_size,
        }
    }

    /// Configuration pointing at `base_url` with defaults for everything else.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: None,
            request_timeout_secs: 2,
            history_page_size: 20,
        }
    }
}
