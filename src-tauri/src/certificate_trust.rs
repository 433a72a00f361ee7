use tauri::WebviewWindow;
use url::Url;

const TRUSTED_LOCAL_HOSTS: [&str; 2] = ["127.0.0.1", "localhost"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CertificateDecision {
    Trust,
    Reject,
}

pub(crate) fn is_trusted_local_host(host: &str) -> bool {
    let host = host.trim().trim_end_matches('.');
    TRUSTED_LOCAL_HOSTS
        .iter()
        .any(|trusted| host.eq_ignore_ascii_case(trusted))
}

pub(crate) fn certificate_decision_for_host(host: &str) -> CertificateDecision {
    if is_trusted_local_host(host) {
        CertificateDecision::Trust
    } else {
        CertificateDecision::Reject
    }
}

/// Decision for a certificate error raised while loading `raw_url`. URLs that
/// do not parse or carry no host are rejected.
pub(crate) fn certificate_decision_for_url(raw_url: &str) -> CertificateDecision {
    Url::parse(raw_url.trim())
        .ok()
        .and_then(|url| url.host_str().map(str::to_string))
        .map(|host| certificate_decision_for_host(&host))
        .unwrap_or(CertificateDecision::Reject)
}

/// Registers the certificate-error hook on the window's webview. Allowances
/// land on the webview's browsing context, so in-page fetch/XHR calls to the
/// same host are covered as well as navigations. `on_retry` runs when a
/// trusted load is restarted after its certificate was allowed.
pub(crate) fn install_certificate_error_hook<F, R>(
    window: &WebviewWindow,
    log: F,
    on_retry: R,
) -> Result<(), String>
where
    F: Fn(&str) + Send + Sync + 'static,
    R: Fn() + Send + Sync + 'static,
{
    platform::install(window, log, on_retry)
}

#[cfg(target_os = "linux")]
mod platform {
    use tauri::WebviewWindow;
    use url::Url;
    use webkit2gtk::{WebContextExt, WebViewExt};

    use super::{certificate_decision_for_url, CertificateDecision};

    pub(super) fn install<F, R>(window: &WebviewWindow, log: F, on_retry: R) -> Result<(), String>
    where
        F: Fn(&str) + Send + Sync + 'static,
        R: Fn() + Send + Sync + 'static,
    {
        window
            .with_webview(move |platform_webview| {
                let webview = platform_webview.inner().clone();
                webview.connect_load_failed_with_tls_errors(
                    move |webview, failing_uri, certificate, _errors| {
                        if certificate_decision_for_url(failing_uri) != CertificateDecision::Trust {
                            log(&format!("rejected untrusted certificate for {failing_uri}"));
                            return false;
                        }
                        let Some(host) = Url::parse(failing_uri)
                            .ok()
                            .and_then(|url| url.host_str().map(str::to_string))
                        else {
                            return false;
                        };
                        let Some(context) = webview.web_context() else {
                            log("certificate error hook: webview has no web context");
                            return false;
                        };
                        context.allow_tls_certificate_for_host(certificate, &host);
                        log(&format!("trusted local certificate for host {host}"));
                        on_retry();
                        webview.load_uri(failing_uri);
                        true
                    },
                );
            })
            .map_err(|error| format!("Failed to install certificate error hook: {error}"))
    }
}

#[cfg(target_os = "windows")]
mod platform {
    use std::sync::Arc;

    use tauri::WebviewWindow;
    use webview2_com::{
        take_pwstr,
        Microsoft::Web::WebView2::Win32::{
            ICoreWebView2_14, COREWEBVIEW2_SERVER_CERTIFICATE_ERROR_ACTION,
            COREWEBVIEW2_SERVER_CERTIFICATE_ERROR_ACTION_ALWAYS_ALLOW,
            COREWEBVIEW2_SERVER_CERTIFICATE_ERROR_ACTION_CANCEL,
        },
        ServerCertificateErrorDetectedEventHandler,
    };
    use windows_core::{Interface, PWSTR};

    use super::{certificate_decision_for_url, CertificateDecision};

    fn certificate_error_action(
        request_uri: &str,
        log: &dyn Fn(&str),
    ) -> COREWEBVIEW2_SERVER_CERTIFICATE_ERROR_ACTION {
        match certificate_decision_for_url(request_uri) {
            CertificateDecision::Trust => {
                COREWEBVIEW2_SERVER_CERTIFICATE_ERROR_ACTION_ALWAYS_ALLOW
            }
            CertificateDecision::Reject => {
                log(&format!("rejected untrusted certificate for {request_uri}"));
                COREWEBVIEW2_SERVER_CERTIFICATE_ERROR_ACTION_CANCEL
            }
        }
    }

    // Allowing the certificate resumes the same navigation, so there is no
    // retried load to report.
    pub(super) fn install<F, R>(window: &WebviewWindow, log: F, _on_retry: R) -> Result<(), String>
    where
        F: Fn(&str) + Send + Sync + 'static,
        R: Fn() + Send + Sync + 'static,
    {
        let log = Arc::new(log);
        window
            .with_webview(move |platform_webview| {
                let handler_log = Arc::clone(&log);
                let registered = unsafe {
                    platform_webview
                        .controller()
                        .CoreWebView2()
                        .and_then(|core| core.cast::<ICoreWebView2_14>())
                        .and_then(|core14| {
                            let mut token: i64 = 0;
                            core14.add_ServerCertificateErrorDetected(
                                &ServerCertificateErrorDetectedEventHandler::create(Box::new(
                                    move |_, args| {
                                        let Some(args) = args else {
                                            return Ok(());
                                        };
                                        let mut uri = PWSTR::null();
                                        args.RequestUri(&mut uri)?;
                                        let request_uri = take_pwstr(uri);
                                        args.SetAction(certificate_error_action(
                                            &request_uri,
                                            handler_log.as_ref(),
                                        ))
                                    },
                                )),
                                &mut token,
                            )
                        })
                };
                if let Err(error) = registered {
                    log(&format!("failed to register certificate error hook: {error}"));
                }
            })
            .map_err(|error| format!("Failed to install certificate error hook: {error}"))
    }
}

#[cfg(not(any(target_os = "linux", target_os = "windows")))]
mod platform {
    use tauri::WebviewWindow;

    pub(super) fn install<F, R>(_window: &WebviewWindow, log: F, _on_retry: R) -> Result<(), String>
    where
        F: Fn(&str) + Send + Sync + 'static,
        R: Fn() + Send + Sync + 'static,
    {
        // WKWebView exposes no certificate-error hook; the local certificate
        // has to be trusted in the system keychain.
        log("certificate error hook unavailable on this platform; relying on system trust");
        Ok(())
    }
}
