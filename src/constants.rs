//! App-wide constants.
//!
//! Centralises the tool name, config paths, environment variable names,
//! and file markers so a rename only requires changing this file.

/// Display name of the tool (lowercase).
pub const APP_NAME: &str = "reviewd";

/// Local config filename (e.g. `.reviewd.toml` in the workspace root).
pub const CONFIG_FILENAME: &str = ".reviewd.toml";

/// Directory name under `~/.config/` for global config.
pub const CONFIG_DIR: &str = "reviewd";

/// Per-workspace state directory holding the baseline file.
pub const STATE_DIR: &str = ".reviewd";

/// Baseline filename inside [`STATE_DIR`].
pub const BASELINE_FILENAME: &str = "baseline.json";

/// Prefix of the idempotence marker line embedded in generated test files.
/// The full line is `MARKER_PREFIX` followed by a hex checksum of the body.
pub const MARKER_PREFIX: &str = "// reviewd:generated checksum=";

// ── Environment variable names ──────────────────────────────────────

pub const ENV_PROVIDER: &str = "REVIEWD_PROVIDER";
pub const ENV_MODEL: &str = "REVIEWD_MODEL";
pub const ENV_API_KEY: &str = "REVIEWD_API_KEY";
pub const ENV_BASE_URL: &str = "REVIEWD_BASE_URL";
pub const ENV_HOST_URL: &str = "REVIEWD_HOST_URL";
pub const ENV_HOST_TOKEN: &str = "REVIEWD_HOST_TOKEN";
pub const ENV_HOST_OWNER: &str = "REVIEWD_HOST_OWNER";
pub const ENV_HOST_REPO: &str = "REVIEWD_HOST_REPO";
