use std::path::Path;
#[cfg(all(feature = "app", not(test)))]
use std::path::PathBuf;

pub const LOG_FILE_BASENAME: &str = "taskflow";
pub const LOG_FILE_SUFFIX: &str = "log";
pub const LOG_ROTATE_SIZE_BYTES: u64 = 10 * 1024 * 1024;
pub const LOG_ROTATE_KEEP_FILES: usize = 10;
pub const ENV_LOG: &str = "TASKFLOW_LOG";

/// Log files live next to the task data.
pub fn log_directory(data_dir: &Path) -> &Path {
    data_dir
}

/// Picks the logger spec: `TASKFLOW_LOG`, then `RUST_LOG`, then a default
/// that keeps dependencies at WARN.
pub fn log_spec(lookup: impl Fn(&str) -> Option<String>) -> String {
    let default_spec = if cfg!(debug_assertions) {
        "warn,taskflow=debug"
    } else {
        "warn,taskflow=info"
    };
    lookup(ENV_LOG)
        .filter(|value| !value.trim().is_empty())
        .or_else(|| lookup("RUST_LOG").filter(|value| !value.trim().is_empty()))
        .unwrap_or_else(|| default_spec.to_string())
}

#[cfg(all(feature = "app", not(test)))]
pub fn init_logging(
    data_dir: &Path,
) -> Result<flexi_logger::LoggerHandle, flexi_logger::FlexiLoggerError> {
    use flexi_logger::{
        detailed_format, Cleanup, Criterion, Duplicate, FileSpec, Logger, Naming, WriteMode,
    };

    std::fs::create_dir_all(data_dir)?;

    let handle = Logger::try_with_str(log_spec(|key| std::env::var(key).ok()))?
        .log_to_file(
            FileSpec::default()
                .directory(log_directory(data_dir))
                .basename(LOG_FILE_BASENAME)
                .suffix(LOG_FILE_SUFFIX),
        )
        .write_mode(WriteMode::BufferAndFlush)
        .format_for_files(detailed_format)
        .rotate(
            Criterion::Size(LOG_ROTATE_SIZE_BYTES),
            Naming::Numbers,
            Cleanup::KeepLogFiles(LOG_ROTATE_KEEP_FILES),
        )
        // stdout belongs to the task list; only errors go to stderr.
        .duplicate_to_stderr(Duplicate::Error)
        .start()?;

    install_panic_hook(log_directory(data_dir).to_path_buf());

    log::info!(
        "logger initialized dir={} rotate_size_bytes={} keep_files={}",
        log_directory(data_dir).display(),
        LOG_ROTATE_SIZE_BYTES,
        LOG_ROTATE_KEEP_FILES
    );
    Ok(handle)
}

/// Where to look after a crash, printed once on stderr next to the default
/// panic message.
pub fn crash_hint(log_dir: &Path) -> String {
    format!(
        "taskflow crashed; details in {}",
        log_dir
            .join(format!("{LOG_FILE_BASENAME}*.{LOG_FILE_SUFFIX}"))
            .display()
    )
}

#[cfg(all(feature = "app", not(test)))]
fn install_panic_hook(log_dir: PathBuf) {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info: &std::panic::PanicHookInfo<'_>| {
        log::error!(
            "taskflow panicked: {info}\n{}",
            std::backtrace::Backtrace::force_capture()
        );
        log::logger().flush();
        eprintln!("{}", crash_hint(&log_dir));
        default_hook(info);
    }));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_spec_prefers_app_variable_then_rust_log() {
        let spec = log_spec(|key| match key {
            ENV_LOG => Some("trace".to_string()),
            "RUST_LOG" => Some("info".to_string()),
            _ => None,
        });
        assert_eq!(spec, "trace");

        let spec = log_spec(|key| match key {
            ENV_LOG => Some("  ".to_string()),
            "RUST_LOG" => Some("info".to_string()),
            _ => None,
        });
        assert_eq!(spec, "info");
    }

    #[test]
    fn log_spec_falls_back_to_default() {
        let spec = log_spec(|_| None);
        assert!(spec.starts_with("warn,taskflow="));
    }

    #[test]
    fn crash_hint_points_at_the_log_files() {
        let hint = crash_hint(Path::new("/tmp/taskflow"));
        assert!(hint.starts_with("taskflow crashed; details in "));
        assert!(hint.ends_with("taskflow*.log"));
        assert!(hint.contains("/tmp/taskflow"));
    }

    #[test]
    fn logs_share_the_data_directory() {
        let dir = Path::new("/tmp/taskflow");
        assert_eq!(log_directory(dir), dir);
    }
}
