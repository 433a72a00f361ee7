use tauri::{AppHandle, Manager};

use crate::{append_shutdown_log, LauncherState};

pub(crate) fn handle_exit_event(app_handle: &AppHandle) {
    let Some(state) = app_handle.try_state::<LauncherState>() else {
        append_shutdown_log("exit event received before launcher state was registered");
        return;
    };

    if state.pending_wait.abort() {
        append_shutdown_log("aborted in-flight readiness wait");
    }
    if state.main_window.clear().is_some() {
        append_shutdown_log("released main window handle");
    }
    append_shutdown_log("desktop process exiting");
}
