use std::time::Duration;

pub(crate) const APP_DISPLAY_NAME: &str = "MeshCentral";
pub(crate) const MAIN_WINDOW_LABEL: &str = "main";
pub(crate) const MAIN_WINDOW_WIDTH: f64 = 1280.0;
pub(crate) const MAIN_WINDOW_HEIGHT: f64 = 800.0;

pub(crate) const DEFAULT_SERVER_PORT: u16 = 8086;
pub(crate) const SERVER_LOOPBACK_HOST: &str = "127.0.0.1";
pub(crate) const SERVER_DATA_DIR_NAME: &str = "meshcentral-data";

pub(crate) const HEADLESS_FLAG: &str = "--headless";
pub(crate) const LAUNCH_FLAG: &str = "--launch";
pub(crate) const PORT_FLAG: &str = "--port";
pub(crate) const REDIRECT_PORT_FLAG: &str = "--redirport";
// The server treats a redirect port of 0 as "no redirect listener".
pub(crate) const DISABLED_REDIRECT_PORT: &str = "0";

pub(crate) const DEFAULT_READY_TIMEOUT_MS: u64 = 30_000;
pub(crate) const READY_TIMEOUT_MIN_MS: u64 = 1_000;
pub(crate) const READY_TIMEOUT_MAX_MS: u64 = 10 * 60 * 1000;
pub(crate) const READY_TIMEOUT_ENV: &str = "MESHCENTRAL_DESKTOP_READY_TIMEOUT_MS";
pub(crate) const DEFAULT_READY_POLL_INTERVAL_MS: u64 = 500;
pub(crate) const READY_POLL_INTERVAL_MIN_MS: u64 = 50;
pub(crate) const READY_POLL_INTERVAL_MAX_MS: u64 = 10_000;
pub(crate) const READY_POLL_INTERVAL_ENV: &str = "MESHCENTRAL_DESKTOP_READY_POLL_INTERVAL_MS";
pub(crate) const READY_PROBE_MIN_BUDGET: Duration = Duration::from_millis(50);

pub(crate) const DESKTOP_ROOT_ENV: &str = "MESHCENTRAL_DESKTOP_ROOT";
pub(crate) const DESKTOP_ROOT_DIR_NAME: &str = ".meshcentral-desktop";
pub(crate) const DESKTOP_LOG_FILE: &str = "desktop.log";
pub(crate) const DESKTOP_LOG_MAX_BYTES: u64 = 5 * 1024 * 1024;
pub(crate) const LOG_BACKUP_COUNT: usize = 5;
