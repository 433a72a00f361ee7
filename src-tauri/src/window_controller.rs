use std::sync::{Mutex, MutexGuard};

use tauri::{async_runtime, AppHandle, Manager};

use crate::{
    append_desktop_log, append_startup_log, backend_readiness, main_window, LauncherState,
    APP_DISPLAY_NAME,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WindowRequest {
    Startup,
    #[cfg_attr(not(target_os = "macos"), allow(dead_code))]
    Reactivate,
}

impl WindowRequest {
    fn as_str(self) -> &'static str {
        match self {
            Self::Startup => "startup",
            Self::Reactivate => "reactivate",
        }
    }
}

fn lock_or_recover<'a, T>(mutex: &'a Mutex<T>, what: &str) -> MutexGuard<'a, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(error) => {
            append_desktop_log(&format!("{what} lock poisoned: {error}"));
            error.into_inner()
        }
    }
}

/// Owner of the single main window handle. Only this type mutates it.
#[derive(Debug)]
pub(crate) struct WindowSlot<W> {
    window: Mutex<Option<W>>,
}

impl<W> Default for WindowSlot<W> {
    fn default() -> Self {
        Self {
            window: Mutex::new(None),
        }
    }
}

impl<W> WindowSlot<W> {
    pub(crate) fn is_empty(&self) -> bool {
        lock_or_recover(&self.window, "main window").is_none()
    }

    /// Stores `window`, handing back whatever was there before.
    pub(crate) fn install(&self, window: W) -> Option<W> {
        lock_or_recover(&self.window, "main window").replace(window)
    }

    pub(crate) fn clear(&self) -> Option<W> {
        lock_or_recover(&self.window, "main window").take()
    }
}

pub(crate) trait TaskHandle {
    fn is_finished(&self) -> bool;
    fn abort(&self);
}

impl<T> TaskHandle for async_runtime::JoinHandle<T> {
    fn is_finished(&self) -> bool {
        self.inner().is_finished()
    }

    fn abort(&self) {
        async_runtime::JoinHandle::abort(self)
    }
}

/// At most one readiness wait runs at a time. A request that arrives while a
/// wait is still running is dropped; the running wait opens the window.
#[derive(Debug)]
pub(crate) struct PendingWait<H> {
    handle: Mutex<Option<H>>,
}

impl<H> Default for PendingWait<H> {
    fn default() -> Self {
        Self {
            handle: Mutex::new(None),
        }
    }
}

impl<H: TaskHandle> PendingWait<H> {
    /// Calls `spawn` unless a previous wait is still running. Returns whether
    /// a new wait was started.
    pub(crate) fn begin_with<F>(&self, spawn: F) -> bool
    where
        F: FnOnce() -> H,
    {
        let mut guard = lock_or_recover(&self.handle, "readiness wait");
        if guard.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return false;
        }
        *guard = Some(spawn());
        true
    }

    /// Aborts a running wait. Returns whether there was one to abort.
    pub(crate) fn abort(&self) -> bool {
        match lock_or_recover(&self.handle, "readiness wait").take() {
            Some(handle) if !handle.is_finished() => {
                handle.abort();
                true
            }
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RequestOutcome {
    Headless,
    WindowOpen,
    WaitStarted,
    JoinedWait,
}

/// Decides what a main window request does. `spawn` is only called when the
/// request has to start a new readiness wait.
pub(crate) fn route_window_request<W, H, F>(
    headless: bool,
    window: &WindowSlot<W>,
    pending: &PendingWait<H>,
    spawn: F,
) -> RequestOutcome
where
    H: TaskHandle,
    F: FnOnce() -> H,
{
    if headless {
        return RequestOutcome::Headless;
    }
    if !window.is_empty() {
        return RequestOutcome::WindowOpen;
    }
    if pending.begin_with(spawn) {
        RequestOutcome::WaitStarted
    } else {
        RequestOutcome::JoinedWait
    }
}

/// Waits for the embedded server and then opens the main window. No-op in
/// headless mode, when the window already exists, or when a wait is running.
pub(crate) fn request_main_window(app_handle: &AppHandle, request: WindowRequest) {
    let state = app_handle.state::<LauncherState>();
    let outcome = route_window_request(
        state.launch.headless,
        &state.main_window,
        &state.pending_wait,
        || {
            let task_handle = app_handle.clone();
            async_runtime::spawn(async move {
                wait_then_open_main_window(task_handle, request).await;
            })
        },
    );
    match outcome {
        RequestOutcome::Headless => append_desktop_log(&format!(
            "main window request ({}) ignored in headless mode",
            request.as_str()
        )),
        RequestOutcome::JoinedWait => append_desktop_log(&format!(
            "main window request ({}) joined the readiness wait already in progress",
            request.as_str()
        )),
        RequestOutcome::WindowOpen | RequestOutcome::WaitStarted => {}
    }
}

async fn wait_then_open_main_window(app_handle: AppHandle, request: WindowRequest) {
    let (server_url, readiness) = {
        let state = app_handle.state::<LauncherState>();
        (state.server_url.clone(), state.readiness)
    };
    append_startup_log(&format!(
        "waiting for server at {} ({}; timeout {}ms, interval {}ms)",
        server_url,
        request.as_str(),
        readiness.timeout.as_millis(),
        readiness.poll_interval.as_millis()
    ));

    match backend_readiness::wait_for_server_url(server_url.clone(), readiness).await {
        Ok(attempts) => {
            append_startup_log(&format!(
                "server reachable at {server_url} after {attempts} attempt(s)"
            ));
            open_main_window(&app_handle);
        }
        Err(error) => {
            eprintln!("Failed to start {APP_DISPLAY_NAME}: {error}");
            append_startup_log(&format!(
                "readiness wait ({}) failed: {error}; exiting",
                request.as_str()
            ));
            app_handle.exit(1);
        }
    }
}

fn open_main_window(app_handle: &AppHandle) {
    let state = app_handle.state::<LauncherState>();
    if !state.main_window.is_empty() {
        return;
    }

    match main_window::create_main_window(app_handle, &state.server_url) {
        Ok(window) => {
            state.main_window.install(window);
        }
        Err(error) => {
            eprintln!("Failed to open {APP_DISPLAY_NAME} window: {error}");
            append_desktop_log(&format!("failed to create main window: {error}; exiting"));
            app_handle.exit(1);
        }
    }
}

pub(crate) fn handle_main_window_destroyed(app_handle: &AppHandle) {
    let state = app_handle.state::<LauncherState>();
    if state.main_window.clear().is_some() {
        append_desktop_log("main window closed");
    }
}
