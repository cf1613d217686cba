//! Site characteristics and pipeline defaults
//!
//! Default values used by the configuration layer. Anything here can be
//! overridden from the config file or `TRM_*` environment variables.

/// Target site characteristics
pub mod site {
    /// Storefront root, used for search links
    pub const BASE_URL: &str = "https://trendurunlermarket.com";

    /// Prefix of derived SKUs
    pub const SKU_PREFIX: &str = "TRM";

    /// Hex digits of the URL hash kept in a derived SKU
    pub const SKU_HASH_LEN: usize = 10;
}

/// Collector defaults
pub mod collector {
    /// Delay between HTTP requests (milliseconds)
    pub const DEFAULT_REQUEST_DELAY_MS: u64 = 800;

    /// Request timeout (seconds)
    pub const DEFAULT_REQUEST_TIMEOUT_SECONDS: u64 = 20;

    /// Hard cap on pages followed per category
    pub const MAX_PAGES_PER_CATEGORY: u32 = 50;

    /// Query parameter used when a page has no "next" link
    pub const DEFAULT_PAGE_QUERY_PARAM: &str = "page";

    pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0 Safari/537.36";
}

/// Reporter defaults
pub mod reporter {
    /// Commission rate in percent applied when no category override matches
    pub const DEFAULT_COMMISSION_RATE: f64 = 10.0;
}

/// Publisher defaults
pub mod publisher {
    /// Rows delivered per run
    pub const DEFAULT_BATCH_SIZE: usize = 20;

    /// Delay between messages (milliseconds)
    pub const DEFAULT_MESSAGE_DELAY_MS: u64 = 800;

    /// Rows listed in a digest message
    pub const DEFAULT_DIGEST_LIMIT: usize = 10;

    /// Fallback wait when a 429 carries no retry_after (seconds)
    pub const DEFAULT_FLOOD_WAIT_SECONDS: u64 = 5;

    /// Telegram caption limit for media messages (characters)
    pub const CAPTION_LIMIT: usize = 1024;

    /// Telegram text message limit (characters)
    pub const TEXT_LIMIT: usize = 4096;

    /// Chunk size for long digest messages, below `TEXT_LIMIT`
    pub const DIGEST_CHUNK_CHARS: usize = 3900;
}

/// Default file locations, relative to the working directory
pub mod files {
    pub const CATEGORIES: &str = "categories.txt";
    pub const PRODUCTS_CSV: &str = "TRM_PRODUCTS.csv";
    pub const REPORT_CSV: &str = "TRM_REPORT_PRETTY.csv";
    pub const LINKS_CSV: &str = "TRM_UTM_LINKS.csv";
    pub const POST_LOG: &str = "_posted_state.json";
    pub const CONFIG_FILE: &str = "config/default";
}
