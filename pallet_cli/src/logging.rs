//! Tracing subscriber setup: console (pretty or JSON) plus an optional file layer.

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::cli::FILE_GUARD;

/// `--log-level`, else `[logging].level`, else `info`.
fn resolve_level<'a>(flag: Option<&'a str>, logging: &'a pallet_config::Logging) -> &'a str {
    flag.or(logging.level.as_deref()).unwrap_or("info")
}

/// Install the global subscriber. `RUST_LOG` overrides the resolved level.
///
/// Console output goes to stderr so stdout carries only event records.
pub fn init_tracing(json: bool, flag_level: Option<&str>, logging: &pallet_config::Logging) {
    let level = resolve_level(flag_level, logging);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let file_layer = logging.file.as_deref().map(|path| {
        let path = std::path::Path::new(path);
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| std::path::Path::new("."));
        let name = path
            .file_name()
            .map_or_else(|| "pallet.log".into(), |n| n.to_string_lossy().into_owned());
        let appender = match logging.rotation.as_deref() {
            Some("daily") => tracing_appender::rolling::daily(dir, name),
            Some("hourly") => tracing_appender::rolling::hourly(dir, name),
            _ => tracing_appender::rolling::never(dir, name),
        };
        let (nb, guard) = tracing_appender::non_blocking(appender);
        let _ = FILE_GUARD.set(guard);
        fmt::layer().json().with_writer(nb).with_ansi(false)
    });

    let registry = tracing_subscriber::registry().with(filter).with(file_layer);
    let res = if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
    } else {
        registry
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .try_init()
    };
    if let Err(e) = res {
        eprintln!("tracing already initialised: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn logging(level: Option<&str>) -> pallet_config::Logging {
        pallet_config::Logging {
            level: level.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn flag_beats_config_level() {
        assert_eq!(resolve_level(Some("warn"), &logging(Some("debug"))), "warn");
    }

    #[test]
    fn config_level_applies_without_flag() {
        assert_eq!(resolve_level(None, &logging(Some("debug"))), "debug");
        assert_eq!(resolve_level(None, &logging(None)), "info");
    }
}
