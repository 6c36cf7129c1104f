use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Initialize structured logging with tracing-subscriber.
///
/// Uses the `RUST_LOG` env var if set, otherwise falls back to the provided level.
/// With `log_dir`, events are also appended to `<log_dir>/dvbench-<date>.log`,
/// switching files when the local date changes.
pub fn init(log_level: &str, log_dir: Option<&Path>) -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let file_layer = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory: {}", dir.display()))?;
            let file = DailyFile::open(dir)
                .with_context(|| format!("Failed to open log file in {}", dir.display()))?;
            Some(
                fmt::layer()
                    .with_target(false)
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(false))
        .with(file_layer)
        .init();
    Ok(())
}

fn today() -> String {
    chrono::Local::now().format("%Y-%m-%d").to_string()
}

/// Append-only log file named by local date, reopened when the date changes.
struct DailyFile {
    dir: PathBuf,
    date: String,
    file: File,
}

impl DailyFile {
    fn open(dir: &Path) -> io::Result<Self> {
        let date = today();
        let file = Self::open_for(dir, &date)?;
        Ok(Self {
            dir: dir.to_path_buf(),
            date,
            file,
        })
    }

    fn path_for(dir: &Path, date: &str) -> PathBuf {
        dir.join(format!("dvbench-{date}.log"))
    }

    fn open_for(dir: &Path, date: &str) -> io::Result<File> {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(Self::path_for(dir, date))
    }

    fn rotate_to(&mut self, date: String) -> io::Result<()> {
        self.file.flush()?;
        self.file = Self::open_for(&self.dir, &date)?;
        self.date = date;
        Ok(())
    }
}

impl Write for DailyFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let date = today();
        if date != self.date {
            self.rotate_to(date)?;
        }
        self.file.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}
