use crate::{
    DEFAULT_SERVER_PORT, DISABLED_REDIRECT_PORT, HEADLESS_FLAG, LAUNCH_FLAG, PORT_FLAG,
    REDIRECT_PORT_FLAG,
};

/// Result of translating the launcher's command line into the argument list
/// forwarded to the embedded server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LaunchArgs {
    pub(crate) headless: bool,
    pub(crate) port: u16,
    pub(crate) explicit_port: bool,
    pub(crate) server_args: Vec<String>,
}

fn parse_port_value(raw: &str) -> Option<u16> {
    if raw.is_empty() || !raw.bytes().all(|byte| byte.is_ascii_digit()) {
        return None;
    }
    raw.parse::<u16>().ok().filter(|port| *port != 0)
}

/// Finds the first well-formed `--port <n>` or `--port=<n>`. Malformed values
/// are skipped rather than reported.
pub(crate) fn resolve_explicit_port(raw: &[String]) -> Option<u16> {
    let prefix = format!("{PORT_FLAG}=");
    for (index, arg) in raw.iter().enumerate() {
        if arg == PORT_FLAG {
            if let Some(port) = raw.get(index + 1).and_then(|value| parse_port_value(value)) {
                return Some(port);
            }
            continue;
        }
        if let Some(port) = arg.strip_prefix(&prefix).and_then(parse_port_value) {
            return Some(port);
        }
    }
    None
}

fn has_redirect_port_flag(raw: &[String]) -> bool {
    raw.iter().any(|arg| arg.starts_with(REDIRECT_PORT_FLAG))
}

/// Number of tokens taken by a `--port` flag at `index` whose value does not
/// parse, or 0 when the token is not such a flag. A following token that is
/// itself a flag is left alone.
fn malformed_port_flag_len(raw: &[String], index: usize) -> usize {
    let arg = &raw[index];
    if arg == PORT_FLAG {
        return match raw.get(index + 1) {
            Some(value) if parse_port_value(value).is_some() => 0,
            Some(value) if !value.starts_with("--") => 2,
            _ => 1,
        };
    }
    match arg.strip_prefix(PORT_FLAG).and_then(|rest| rest.strip_prefix('=')) {
        Some(value) if parse_port_value(value).is_none() => 1,
        _ => 0,
    }
}

pub(crate) fn translate_launch_args(raw: &[String]) -> LaunchArgs {
    let headless = raw.iter().any(|arg| arg == HEADLESS_FLAG);
    let explicit_port = resolve_explicit_port(raw);

    let mut server_args = Vec::with_capacity(raw.len() + 5);
    let mut has_launch_flag = false;
    let mut index = 0;
    while index < raw.len() {
        let arg = &raw[index];
        index += 1;
        if arg == HEADLESS_FLAG {
            continue;
        }
        // Malformed port flags are dropped so the server sees exactly one
        // port, the same one the readiness wait polls.
        if explicit_port.is_none() {
            let skip = malformed_port_flag_len(raw, index - 1);
            if skip > 0 {
                index += skip - 1;
                continue;
            }
        }
        if arg == LAUNCH_FLAG {
            if has_launch_flag {
                continue;
            }
            has_launch_flag = true;
        }
        server_args.push(arg.clone());
    }

    // Without --launch the server forks a watchdog child instead of serving in-process.
    if !has_launch_flag {
        server_args.push(LAUNCH_FLAG.to_string());
    }

    let port = explicit_port.unwrap_or(DEFAULT_SERVER_PORT);
    if explicit_port.is_none() {
        server_args.push(PORT_FLAG.to_string());
        server_args.push(port.to_string());
    }

    if !has_redirect_port_flag(raw) {
        server_args.push(REDIRECT_PORT_FLAG.to_string());
        server_args.push(DISABLED_REDIRECT_PORT.to_string());
    }

    LaunchArgs {
        headless,
        port,
        explicit_port: explicit_port.is_some(),
        server_args,
    }
}
