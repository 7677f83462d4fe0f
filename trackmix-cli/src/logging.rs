use log::{LevelFilter, Log, Metadata, Record};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, OnceLock};

const LOG_CAPACITY: usize = 500;

struct SharedLogger {
    level: LevelFilter,
    buffer: Arc<Mutex<VecDeque<String>>>,
    echo_stderr: bool,
}

impl Log for SharedLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let line = format!("[{}] {}: {}", record.level(), record.target(), record.args());
        if self.echo_stderr {
            eprintln!("{}", line);
        }

        let mut buffer = self
            .buffer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if buffer.len() >= LOG_CAPACITY {
            buffer.pop_front();
        }
        buffer.push_back(line);
    }

    fn flush(&self) {}
}

static LOGGER: OnceLock<SharedLogger> = OnceLock::new();

fn level_from_env() -> LevelFilter {
    match std::env::var("RUST_LOG") {
        Ok(level) => match level.to_lowercase().as_str() {
            "off" => LevelFilter::Off,
            "error" => LevelFilter::Error,
            "warn" => LevelFilter::Warn,
            "debug" => LevelFilter::Debug,
            "trace" => LevelFilter::Trace,
            _ => LevelFilter::Info,
        },
        Err(_) => LevelFilter::Info,
    }
}

/// Install the process logger. `quiet` disables the stderr echo.
pub fn init(quiet: bool) -> Arc<Mutex<VecDeque<String>>> {
    let echo_stderr = !quiet
        && std::env::var("TRACKMIX_LOG_STDERR")
            .map(|value| value != "0")
            .unwrap_or(false);
    let level = level_from_env();

    let logger = LOGGER.get_or_init(|| SharedLogger {
        level,
        buffer: Arc::new(Mutex::new(VecDeque::with_capacity(LOG_CAPACITY))),
        echo_stderr,
    });
    if log::set_logger(logger).is_ok() {
        log::set_max_level(level);
    }

    logger.buffer.clone()
}

/// Return `true` when log lines are already written to stderr.
pub fn echoes_stderr() -> bool {
    LOGGER.get().map(|logger| logger.echo_stderr).unwrap_or(false)
}

/// Most recent log lines, oldest first.
pub fn snapshot(buffer: &Arc<Mutex<VecDeque<String>>>) -> Vec<String> {
    buffer
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .iter()
        .cloned()
        .collect()
}
