use tauri::{async_runtime::JoinHandle, WebviewWindow};
use url::Url;

use crate::{
    backend_readiness::ReadinessOptions,
    launch_args::LaunchArgs,
    window_controller::{PendingWait, WindowSlot},
};

/// Shell state shared by the Tauri callbacks. Port, URL and readiness options
/// are fixed at startup; the window slot and pending wait are the only parts
/// that change afterwards.
pub(crate) struct LauncherState {
    pub(crate) launch: LaunchArgs,
    pub(crate) server_url: Url,
    pub(crate) readiness: ReadinessOptions,
    pub(crate) main_window: WindowSlot<WebviewWindow>,
    pub(crate) pending_wait: PendingWait<JoinHandle<()>>,
}

impl LauncherState {
    pub(crate) fn new(launch: LaunchArgs, server_url: Url, readiness: ReadinessOptions) -> Self {
        Self {
            launch,
            server_url,
            readiness,
            main_window: WindowSlot::default(),
            pending_wait: PendingWait::default(),
        }
    }
}
