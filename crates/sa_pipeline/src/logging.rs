use chrono::{Local, NaiveDate};
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, Once};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

static INIT: Once = Once::new();

const CONSOLE_FILTER: &str = "info,hyper=warn,reqwest=warn";
const FILE_FILTER: &str = "debug,hyper=warn,reqwest=warn,h2=warn,rustls=warn";

pub fn log_file_path(log_dir: &Path, date: NaiveDate) -> PathBuf {
    log_dir.join(format!("run_{}.log", date.format("%Y-%m-%d")))
}

fn open_log_file(log_dir: &Path) -> io::Result<(PathBuf, File)> {
    fs::create_dir_all(log_dir)?;
    let path = log_file_path(log_dir, Local::now().date_naive());
    let file = OpenOptions::new().create(true).append(true).open(&path)?;
    Ok((path, file))
}

/// Console at INFO (or `RUST_LOG`), plus a daily DEBUG file under `log_dir`.
///
/// Safe to call more than once; only the first call installs anything.
pub fn init_logging(log_dir: &Path) {
    INIT.call_once(|| {
        let console_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(CONSOLE_FILTER));
        let console = fmt::layer().with_target(false).with_filter(console_filter);

        let (file_layer, file_result) = match open_log_file(log_dir) {
            Ok((path, file)) => {
                let layer = fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file))
                    .with_filter(EnvFilter::new(FILE_FILTER));
                (Some(layer), Ok(path))
            }
            Err(e) => (None, Err(e)),
        };

        if tracing_subscriber::registry()
            .with(console)
            .with(file_layer)
            .try_init()
            .is_err()
        {
            // someone else owns the global subscriber
            return;
        }

        match file_result {
            Ok(path) => tracing::debug!("Logging to {}", path.display()),
            Err(e) => tracing::warn!("⚠️ File logging disabled ({}): {}", log_dir.display(), e),
        }
    });
}
