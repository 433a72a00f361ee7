use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::{launch_args::LaunchArgs, SERVER_DATA_DIR_NAME};

/// Everything the embedded server needs from the desktop shell, handed to its
/// entry point directly instead of through process environment variables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ServerLaunchConfig {
    pub(crate) args: Vec<String>,
    pub(crate) port: u16,
    pub(crate) data_dir: PathBuf,
    pub(crate) launched_from_desktop: bool,
}

impl ServerLaunchConfig {
    pub(crate) fn new(launch_args: &LaunchArgs, app_data_dir: &Path) -> Self {
        Self {
            args: launch_args.server_args.clone(),
            port: launch_args.port,
            data_dir: server_data_dir(app_data_dir),
            launched_from_desktop: true,
        }
    }
}

pub(crate) fn server_data_dir(app_data_dir: &Path) -> PathBuf {
    app_data_dir.join(SERVER_DATA_DIR_NAME)
}

/// In-process entry point of the server wrapped by the desktop shell.
///
/// `main_start` consumes the server, so it can run at most once. It is called
/// synchronously on the main thread; it should hand long-running work to its
/// own threads and return. Panics are not caught.
pub(crate) trait EmbeddedServer {
    fn main_start(self, config: ServerLaunchConfig);
}

impl<F> EmbeddedServer for F
where
    F: FnOnce(ServerLaunchConfig),
{
    fn main_start(self, config: ServerLaunchConfig) {
        self(config)
    }
}

pub(crate) fn start_embedded_server<S, L>(server: S, config: ServerLaunchConfig, log: L)
where
    S: EmbeddedServer,
    L: Fn(&str),
{
    match serde_json::to_string(&config) {
        Ok(serialized) => log(&format!("starting embedded server: {serialized}")),
        Err(error) => log(&format!(
            "starting embedded server on port {} (config not serializable: {error})",
            config.port
        )),
    }
    server.main_start(config);
    log("embedded server entry point returned");
}

/// Stand-in used when no server implementation is linked into the binary.
/// Nothing will listen on the port, so the readiness wait runs into its
/// timeout and the shell quits.
pub(crate) fn unlinked_server(config: ServerLaunchConfig) {
    crate::append_startup_log(&format!(
        "no embedded server is linked into this build; nothing will listen on port {}",
        config.port
    ));
}
