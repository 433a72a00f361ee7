use std::env;

use tauri::{Manager, RunEvent, WindowEvent};

use crate::{
    append_startup_log,
    embedded_server::{self, EmbeddedServer, ServerLaunchConfig},
    exit_events, launch_args, launcher_config,
    window_controller::{self, WindowRequest},
    LauncherState, APP_DISPLAY_NAME, DESKTOP_LOG_FILE, MAIN_WINDOW_LABEL,
};

pub(crate) fn run<S>(server: S)
where
    S: EmbeddedServer + Send + 'static,
{
    append_startup_log("desktop process starting");
    append_startup_log(&format!(
        "desktop log path: {}",
        crate::logging::resolve_desktop_log_path(
            crate::runtime_paths::default_desktop_root_dir(),
            DESKTOP_LOG_FILE,
        )
        .display()
    ));

    let raw_args: Vec<String> = env::args_os()
        .skip(1)
        .map(|arg| arg.to_string_lossy().into_owned())
        .collect();
    let launch = launch_args::translate_launch_args(&raw_args);
    append_startup_log(&format!(
        "server port {} ({}), headless={}",
        launch.port,
        if launch.explicit_port {
            "from command line"
        } else {
            "default"
        },
        launch.headless
    ));

    let server_url = match launcher_config::server_url(launch.port) {
        Ok(url) => url,
        Err(error) => {
            eprintln!("Failed to start {APP_DISPLAY_NAME}: {error}");
            append_startup_log(&error);
            std::process::exit(1);
        }
    };
    let readiness = launcher_config::resolve_readiness_options();

    tauri::Builder::default()
        .manage(LauncherState::new(launch, server_url, readiness))
        .on_window_event(|window, event| {
            if window.label() != MAIN_WINDOW_LABEL {
                return;
            }
            if let WindowEvent::Destroyed = event {
                window_controller::handle_main_window_destroyed(window.app_handle());
            }
        })
        .setup(move |app| {
            let app_handle = app.handle().clone();
            let state = app_handle.state::<LauncherState>();
            let app_data_dir = app_handle
                .path()
                .app_data_dir()
                .map_err(|error| format!("Failed to resolve app data directory: {error}"))?;

            let config = ServerLaunchConfig::new(&state.launch, &app_data_dir);
            embedded_server::start_embedded_server(server, config, append_startup_log);

            if state.launch.headless {
                println!(
                    "{APP_DISPLAY_NAME} running headless on port {}",
                    state.launch.port
                );
                append_startup_log(&format!(
                    "headless mode: no window will be created (port {})",
                    state.launch.port
                ));
                return Ok(());
            }

            window_controller::request_main_window(&app_handle, WindowRequest::Startup);
            Ok(())
        })
        .build(tauri::generate_context!())
        .expect("error while building tauri application")
        .run(|app_handle, event| match event {
            #[cfg(target_os = "macos")]
            RunEvent::Reopen { .. } => {
                crate::append_desktop_log("application reactivated");
                window_controller::request_main_window(app_handle, WindowRequest::Reactivate);
            }
            RunEvent::Exit => {
                exit_events::handle_exit_event(app_handle);
            }
            _ => {}
        });
}
