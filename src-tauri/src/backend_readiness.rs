use std::{future::Future, time::Duration};

use tokio::time::{sleep, Instant};
use url::Url;

use crate::{DEFAULT_READY_POLL_INTERVAL_MS, DEFAULT_READY_TIMEOUT_MS, READY_PROBE_MIN_BUDGET};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ReadinessOptions {
    pub(crate) timeout: Duration,
    pub(crate) poll_interval: Duration,
}

impl Default for ReadinessOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(DEFAULT_READY_TIMEOUT_MS),
            poll_interval: Duration::from_millis(DEFAULT_READY_POLL_INTERVAL_MS),
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub(crate) enum ReadinessError {
    #[error("Server did not start within {timeout_ms}ms ({attempts} attempts)")]
    Timeout { timeout_ms: u128, attempts: u32 },
    #[error("Failed to build readiness probe client: {0}")]
    Client(String),
}

/// One liveness check against the embedded server. `budget` is the longest
/// the attempt may take before it must report failure.
pub(crate) trait ReadinessProbe {
    fn probe(&self, budget: Duration) -> impl Future<Output = bool> + Send;
}

/// HTTPS GET against the server root. Certificate validation is off: the
/// server presents a self-signed certificate and this is only a liveness
/// check. Any HTTP response, whatever its status, means the server is up.
pub(crate) struct HttpsProbe {
    client: reqwest::Client,
    url: Url,
}

impl HttpsProbe {
    pub(crate) fn new(url: Url) -> Result<Self, ReadinessError> {
        let client = reqwest::Client::builder()
            .danger_accept_invalid_certs(true)
            .no_proxy()
            .build()
            .map_err(|error| ReadinessError::Client(error.to_string()))?;
        Ok(Self { client, url })
    }
}

impl ReadinessProbe for HttpsProbe {
    fn probe(&self, budget: Duration) -> impl Future<Output = bool> + Send {
        let request = self.client.get(self.url.clone()).timeout(budget);
        async move { request.send().await.is_ok() }
    }
}

/// Retries `probe` every `poll_interval` until it succeeds. The wait fails on
/// the first failed attempt made after `timeout` has elapsed. Returns the
/// number of attempts it took.
pub(crate) async fn wait_for_server<P>(
    probe: &P,
    options: ReadinessOptions,
) -> Result<u32, ReadinessError>
where
    P: ReadinessProbe,
{
    let started = Instant::now();
    let deadline = started + options.timeout;
    let mut attempts = 0_u32;

    loop {
        attempts += 1;
        let budget = deadline
            .saturating_duration_since(Instant::now())
            .max(READY_PROBE_MIN_BUDGET);
        if probe.probe(budget).await {
            return Ok(attempts);
        }

        if started.elapsed() > options.timeout {
            return Err(ReadinessError::Timeout {
                timeout_ms: options.timeout.as_millis(),
                attempts,
            });
        }

        sleep(options.poll_interval).await;
    }
}

pub(crate) async fn wait_for_server_url(
    url: Url,
    options: ReadinessOptions,
) -> Result<u32, ReadinessError> {
    let probe = HttpsProbe::new(url)?;
    wait_for_server(&probe, options).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{
        atomic::{AtomicU32, Ordering},
        Mutex,
    };

    struct ScriptedProbe {
        ready_at: Option<Instant>,
        attempts: AtomicU32,
        budgets: Mutex<Vec<Duration>>,
    }

    impl ScriptedProbe {
        fn never() -> Self {
            Self {
                ready_at: None,
                attempts: AtomicU32::new(0),
                budgets: Mutex::new(Vec::new()),
            }
        }

        fn ready_after(delay: Duration) -> Self {
            Self {
                ready_at: Some(Instant::now() + delay),
                ..Self::never()
            }
        }
    }

    impl ReadinessProbe for ScriptedProbe {
        fn probe(&self, budget: Duration) -> impl Future<Output = bool> + Send {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            self.budgets.lock().expect("budgets lock").push(budget);
            let ready = self.ready_at.is_some_and(|ready_at| Instant::now() >= ready_at);
            async move { ready }
        }
    }

    fn options(timeout_ms: u64, interval_ms: u64) -> ReadinessOptions {
        ReadinessOptions {
            timeout: Duration::from_millis(timeout_ms),
            poll_interval: Duration::from_millis(interval_ms),
        }
    }

    #[test]
    fn readiness_options_default_to_thirty_seconds_and_half_second_interval() {
        let defaults = ReadinessOptions::default();
        assert_eq!(defaults.timeout, Duration::from_millis(30_000));
        assert_eq!(defaults.poll_interval, Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn wait_for_server_resolves_on_first_successful_probe() {
        let probe = ScriptedProbe::ready_after(Duration::ZERO);
        let started = Instant::now();

        assert_eq!(wait_for_server(&probe, options(2_000, 500)).await, Ok(1));
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn wait_for_server_times_out_within_one_interval_of_the_deadline() {
        let probe = ScriptedProbe::never();
        let started = Instant::now();

        let result = wait_for_server(&probe, options(2_000, 500)).await;

        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(2_000), "gave up early: {elapsed:?}");
        assert!(elapsed <= Duration::from_millis(2_500), "gave up late: {elapsed:?}");
        assert_eq!(
            result,
            Err(ReadinessError::Timeout {
                timeout_ms: 2_000,
                attempts: 6
            })
        );
        assert_eq!(probe.attempts.load(Ordering::SeqCst), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn wait_for_server_resolves_once_server_comes_up_before_deadline() {
        let probe = ScriptedProbe::ready_after(Duration::from_millis(1_200));
        let started = Instant::now();

        let result = wait_for_server(&probe, options(30_000, 500)).await;

        assert_eq!(result, Ok(4));
        assert_eq!(started.elapsed(), Duration::from_millis(1_500));
    }

    #[tokio::test(start_paused = true)]
    async fn wait_for_server_bounds_each_attempt_by_remaining_time() {
        let probe = ScriptedProbe::never();

        let _ = wait_for_server(&probe, options(1_000, 500)).await;

        let budgets = probe.budgets.lock().expect("budgets lock").clone();
        assert_eq!(budgets[0], Duration::from_millis(1_000));
        assert_eq!(budgets[1], Duration::from_millis(500));
        assert!(budgets
            .iter()
            .skip(2)
            .all(|budget| *budget == READY_PROBE_MIN_BUDGET));
    }

    #[tokio::test]
    async fn https_probe_reports_refused_connection_as_not_ready() {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind probe port");
            listener.local_addr().expect("local addr").port()
        };
        let url = Url::parse(&format!("https://127.0.0.1:{port}/")).expect("url");
        let probe = HttpsProbe::new(url).expect("client");

        assert!(!probe.probe(Duration::from_millis(500)).await);
    }

    /// Serves one HTTPS request with a fresh self-signed certificate and
    /// answers `500 Internal Server Error`.
    async fn serve_one_self_signed_500() -> u16 {
        use std::sync::Arc;
        use tokio::io::{AsyncReadExt, AsyncWriteExt};
        use tokio_rustls::{
            rustls::{
                crypto::ring,
                pki_types::{PrivateKeyDer, PrivatePkcs8KeyDer},
                ServerConfig,
            },
            TlsAcceptor,
        };

        let certified = rcgen::generate_simple_self_signed(vec![
            "127.0.0.1".to_string(),
            "localhost".to_string(),
        ])
        .expect("self-signed certificate");
        let key = PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(
            certified.key_pair.serialize_der(),
        ));
        let config = ServerConfig::builder_with_provider(Arc::new(ring::default_provider()))
            .with_safe_default_protocol_versions()
            .expect("protocol versions")
            .with_no_client_auth()
            .with_single_cert(vec![certified.cert.der().clone()], key)
            .expect("server config");
        let acceptor = TlsAcceptor::from(Arc::new(config));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind tls listener");
        let port = listener.local_addr().expect("local addr").port();
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.expect("accept");
            let mut tls = acceptor.accept(stream).await.expect("tls handshake");
            let mut request = Vec::new();
            let mut chunk = [0_u8; 1024];
            while !request.windows(4).any(|window| window == b"\r\n\r\n") {
                let read = tls.read(&mut chunk).await.expect("read request");
                if read == 0 {
                    return;
                }
                request.extend_from_slice(&chunk[..read]);
            }
            tls.write_all(
                b"HTTP/1.1 500 Internal Server Error\r\ncontent-length: 0\r\nconnection: close\r\n\r\n",
            )
            .await
            .expect("write response");
            let _ = tls.shutdown().await;
        });
        port
    }

    #[tokio::test]
    async fn https_probe_accepts_self_signed_server_answering_with_error_status() {
        let port = serve_one_self_signed_500().await;
        let url = Url::parse(&format!("https://127.0.0.1:{port}/")).expect("url");
        let probe = HttpsProbe::new(url).expect("client");

        assert!(probe.probe(Duration::from_secs(5)).await);
    }

    #[tokio::test]
    async fn https_probe_does_not_treat_bare_tcp_accept_as_ready() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind probe port");
        let port = listener.local_addr().expect("local addr").port();
        let url = Url::parse(&format!("https://127.0.0.1:{port}/")).expect("url");
        let probe = HttpsProbe::new(url).expect("client");

        assert!(!probe.probe(Duration::from_millis(300)).await);
        drop(listener);
    }
}
