/// Application name
pub const APP_NAME: &str = "hirechat";

/// Interval between background refetches of a conversation, in seconds
pub const POLL_INTERVAL_SECS: u64 = 5;

/// Distance from the bottom (in px) under which the view counts as "at the bottom"
pub const NEAR_BOTTOM_THRESHOLD_PX: f64 = 100.0;

/// Maximum attachment size accepted for upload (10 MiB)
pub const MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Prefix of locally generated ids for messages not yet confirmed by the server
pub const PENDING_ID_PREFIX: &str = "temp-";

/// Default REST API base URL (local development backend)
pub const DEFAULT_API_URL: &str = "http://localhost:8000/api/";

/// Default HTTP request timeout in seconds
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
