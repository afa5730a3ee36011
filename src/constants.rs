/// Longest single SSE line accepted from the wire. Investigation text segments
/// can be large, anything beyond this is a fatal stream error.
pub const MAX_LINE_BYTES: usize = 1024 * 1024;

/// Event type assumed when a block carries no `event:` line.
pub const DEFAULT_EVENT_TYPE: &str = "message";

/// Payloads that are stream sentinels rather than JSON.
pub const PAYLOAD_SENTINELS: &[&str] = &["[DONE]", ":keepalive"];

/// SSE field prefixes this reader ignores.
pub const IGNORED_FIELD_PREFIXES: &[&str] = &[":", "id:", "retry:"];

/// Explicit chain-of-thought framing used by newer servers.
pub const EVENT_COT_START: &str = "cot_start";
pub const EVENT_COT_DELTA: &str = "cot_delta";
pub const EVENT_COT_END: &str = "cot_end";

/// Optional prefix on wire content types, e.g. `CONTENT_TYPE_CHAT_RESPONSE`.
pub const CONTENT_TYPE_PREFIX: &str = "CONTENT_TYPE_";

/// Chain-of-thought categories arrive as enum names; everything up to and
/// including this marker is dropped for display.
pub const CATEGORY_ENUM_MARKER: &str = "CATEGORY_";

/// Status enums may carry this prefix (`STATUS_DONE`).
pub const STATUS_ENUM_MARKER: &str = "STATUS_";

/// Noisy prefix on data source titles.
pub const SOURCE_TITLE_NOISE_PREFIXES: &[&str] = &["containerinsights_"];

/// Frames for the ephemeral activity line.
pub const ACTIVITY_FRAMES: &[char] = &['⠋', '⠙', '⠹', '⠸', '⠼', '⠴', '⠦', '⠧', '⠇', '⠏'];

/// Width of horizontal rules and table separators.
pub const RULE_WIDTH: usize = 40;

/// Default tracing filter when `RUST_LOG` is not set.
pub const DEFAULT_LOG_FILTER: &str = "sleuth=info";
pub const DEBUG_LOG_FILTER: &str = "sleuth=debug";

/// Log file name inside the log directory.
pub const LOG_FILE_NAME: &str = "sleuth.log";

/// Environment variable holding the bearer token for `--url` streams.
pub const API_TOKEN_ENV: &str = "SLEUTH_API_TOKEN";
