//! `log` backend that writes to the browser console (stderr on native).

use std::sync::Once;

use log::{Level, LevelFilter, Log, Metadata, Record};

struct ConsoleLogger;

static LOGGER: ConsoleLogger = ConsoleLogger;
static INIT: Once = Once::new();

impl Log for ConsoleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = format!("[{}] {}: {}", record.level(), record.target(), record.args());
        emit(record.level(), &line);
    }

    fn flush(&self) {}
}

#[cfg(target_arch = "wasm32")]
fn emit(level: Level, line: &str) {
    match level {
        Level::Error => web_sys::console::error_1(&line.into()),
        Level::Warn => web_sys::console::warn_1(&line.into()),
        _ => web_sys::console::log_1(&line.into()),
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn emit(_level: Level, line: &str) {
    eprintln!("{line}");
}

/// Install the console logger. Only the first call installs; later calls
/// just update the level filter.
pub fn init(level: LevelFilter) {
    INIT.call_once(|| {
        // Fails only when another logger is already installed; keep that one.
        let _ = log::set_logger(&LOGGER);
    });
    log::set_max_level(level);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_is_idempotent_and_sets_level() {
        init(LevelFilter::Warn);
        init(LevelFilter::Debug);
        assert_eq!(log::max_level(), LevelFilter::Debug);
        log::debug!("logger smoke test");
    }
}
