use std::sync::{Arc, Mutex};

use tauri::{webview::PageLoadEvent, AppHandle, WebviewUrl, WebviewWindow, WebviewWindowBuilder};
use url::Url;

use crate::{
    append_desktop_log, certificate_trust, APP_DISPLAY_NAME, MAIN_WINDOW_HEIGHT,
    MAIN_WINDOW_LABEL, MAIN_WINDOW_WIDTH,
};

const BLANK_PAGE_URL: &str = "about:blank";

pub(crate) fn is_server_page(server_url: &Url, loaded_url: &Url) -> bool {
    loaded_url.scheme() == server_url.scheme()
        && loaded_url.host_str() == server_url.host_str()
        && loaded_url.port_or_known_default() == server_url.port_or_known_default()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RevealState {
    Hidden,
    CertificateRetryPending,
    Retrying,
    Revealed,
}

/// Decides when the hidden main window may be shown. A load that failed on a
/// certificate error still reports `Finished`, so after a certificate retry
/// only the load started by the retry can reveal the window.
#[derive(Debug)]
pub(crate) struct RevealGate {
    state: Mutex<RevealState>,
}

impl Default for RevealGate {
    fn default() -> Self {
        Self {
            state: Mutex::new(RevealState::Hidden),
        }
    }
}

impl RevealGate {
    fn state(&self) -> std::sync::MutexGuard<'_, RevealState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub(crate) fn certificate_retry(&self) {
        let mut state = self.state();
        if *state != RevealState::Revealed {
            *state = RevealState::CertificateRetryPending;
        }
    }

    pub(crate) fn load_started(&self) {
        let mut state = self.state();
        if *state == RevealState::CertificateRetryPending {
            *state = RevealState::Retrying;
        }
    }

    /// Returns true exactly once, for the load that should reveal the window.
    pub(crate) fn load_finished(&self, is_server_page: bool) -> bool {
        let mut state = self.state();
        match *state {
            RevealState::Hidden | RevealState::Retrying if is_server_page => {
                *state = RevealState::Revealed;
                true
            }
            _ => false,
        }
    }
}

/// Builds the hidden main window, hooks certificate handling, then navigates
/// to the server. The window is revealed on the first finished load of a
/// server page so the user never sees a blank frame.
pub(crate) fn create_main_window(
    app_handle: &AppHandle,
    server_url: &Url,
) -> Result<WebviewWindow, String> {
    let blank_url = Url::parse(BLANK_PAGE_URL)
        .map_err(|error| format!("Invalid placeholder url {BLANK_PAGE_URL}: {error}"))?;
    let gate = Arc::new(RevealGate::default());
    let page_gate = Arc::clone(&gate);
    let reveal_url = server_url.clone();

    let window = WebviewWindowBuilder::new(
        app_handle,
        MAIN_WINDOW_LABEL,
        WebviewUrl::External(blank_url),
    )
    .title(APP_DISPLAY_NAME)
    .inner_size(MAIN_WINDOW_WIDTH, MAIN_WINDOW_HEIGHT)
    .visible(false)
    .on_page_load(move |window, payload| {
        if matches!(payload.event(), PageLoadEvent::Started) {
            page_gate.load_started();
            return;
        }
        append_desktop_log(&format!("page-load finished: {}", payload.url()));
        if !page_gate.load_finished(is_server_page(&reveal_url, payload.url())) {
            return;
        }
        if let Err(error) = window.show() {
            append_desktop_log(&format!("failed to show main window: {error}"));
        }
        if let Err(error) = window.set_focus() {
            append_desktop_log(&format!("failed to focus main window: {error}"));
        }
    })
    .build()
    .map_err(|error| format!("Failed to build main window: {error}"))?;

    if let Err(error) = certificate_trust::install_certificate_error_hook(
        &window,
        append_desktop_log,
        move || gate.certificate_retry(),
    ) {
        append_desktop_log(&error);
    }

    window
        .navigate(server_url.clone())
        .map_err(|error| format!("Failed to navigate main window to {server_url}: {error}"))?;
    append_desktop_log(&format!("main window navigating to {server_url}"));
    Ok(window)
}
