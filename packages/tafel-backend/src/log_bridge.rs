/// Process logger: `env_logger` filtering, with every accepted record kept in
/// a bounded in-memory ring, appended to `backend.log` and fanned out to
/// live subscribers.
use env_logger::{Logger, Target};
use log::{Log, Metadata, Record, SetLoggerError};
use serde::Serialize;
use std::collections::VecDeque;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{LazyLock, Mutex, OnceLock, PoisonError};
use tokio::sync::broadcast;

const MAX_LOG_ENTRIES: usize = 2000;
const LIVE_CAPACITY: usize = 512;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub timestamp_ms: u64,
    pub level: String,
    pub target: String,
    pub message: String,
}

impl LogEntry {
    fn now(level: &str, target: &str, message: String) -> Self {
        Self {
            timestamp_ms: std::time::SystemTime::now()
                .duration_since(std::time::SystemTime::UNIX_EPOCH)
                .unwrap_or_default()
                .as_millis() as u64,
            level: level.to_string(),
            target: target.to_string(),
            message,
        }
    }

    fn to_line(&self) -> String {
        format!(
            "{} [{}] [{}] {}",
            self.timestamp_ms,
            self.level.to_uppercase(),
            self.target,
            self.message.replace('\n', "\\n")
        )
    }
}

struct LogHub {
    entries: Mutex<VecDeque<LogEntry>>,
    capacity: usize,
    tx: broadcast::Sender<LogEntry>,
}

impl LogHub {
    fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(LIVE_CAPACITY);
        Self {
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
            tx,
        }
    }

    fn push(&self, entry: LogEntry) {
        {
            let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
            entries.push_back(entry.clone());
            while entries.len() > self.capacity {
                entries.pop_front();
            }
        }
        let _ = self.tx.send(entry);
    }

    /// Oldest first; with `limit`, only the newest `limit` entries.
    fn recent(&self, limit: Option<usize>) -> Vec<LogEntry> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let skip = limit.map_or(0, |n| entries.len().saturating_sub(n));
        entries.iter().skip(skip).cloned().collect()
    }
}

static HUB: LazyLock<LogHub> = LazyLock::new(|| LogHub::new(MAX_LOG_ENTRIES));

/// Append-only log file, reopened lazily after a failed open.
struct LogFile {
    path: PathBuf,
    file: Mutex<Option<File>>,
}

impl LogFile {
    fn new(path: PathBuf) -> Self {
        let file = Self::open(&path).ok();
        Self {
            path,
            file: Mutex::new(file),
        }
    }

    fn open(path: &Path) -> io::Result<File> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        OpenOptions::new().create(true).append(true).open(path)
    }

    fn append(&self, entry: &LogEntry) {
        let mut guard = self.file.lock().unwrap_or_else(PoisonError::into_inner);
        if guard.is_none() {
            *guard = Self::open(&self.path).ok();
        }
        if let Some(file) = guard.as_mut() {
            let _ = writeln!(file, "{}", entry.to_line());
            let _ = file.flush();
        }
    }
}

static FILE: OnceLock<LogFile> = OnceLock::new();

/// Default log file: ~/.config/tafel/logs/backend.log
pub fn default_log_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tafel")
        .join("logs")
        .join("backend.log")
}

fn record(entry: LogEntry) {
    if let Some(file) = FILE.get() {
        file.append(&entry);
    }
    HUB.push(entry);
}

struct BridgeLogger {
    inner: Logger,
}

impl Log for BridgeLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        self.inner.enabled(metadata)
    }

    fn log(&self, rec: &Record<'_>) {
        if !self.enabled(rec.metadata()) {
            return;
        }
        record(LogEntry::now(
            &rec.level().to_string().to_lowercase(),
            rec.target(),
            rec.args().to_string(),
        ));
    }

    fn flush(&self) {
        self.inner.flush();
    }
}

/// Install the process logger. `RUST_LOG` filters as usual (default `warn`).
pub fn init(log_path: PathBuf) -> Result<(), SetLoggerError> {
    let _ = FILE.set(LogFile::new(log_path));
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    builder.target(Target::Pipe(Box::new(io::sink())));
    let logger = Box::leak(Box::new(BridgeLogger {
        inner: builder.build(),
    }));
    log::set_logger(logger)?;
    log::set_max_level(log::LevelFilter::Trace);
    Ok(())
}

pub fn recent_entries(limit: Option<usize>) -> Vec<LogEntry> {
    HUB.recent(limit)
}

pub fn subscribe() -> broadcast::Receiver<LogEntry> {
    HUB.tx.subscribe()
}

pub fn log_file_path() -> Option<String> {
    FILE.get().map(|f| f.path.display().to_string())
}

/// Record a line even when no logger could be installed.
pub fn write_fallback_line(message: &str) {
    record(LogEntry::now("error", "tafel.log_bridge", message.to_string()));
}
