//! `tracing` output routed to the browser console.

use crate::config::{AppConfig, DEFAULT_LOG_LEVEL};
use std::io;
use tracing::{Level, Metadata};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::EnvFilter;

/// Install the global subscriber. Safe to call more than once; later calls are no-ops.
pub fn init(config: &AppConfig) {
    let result = tracing_subscriber::fmt()
        .with_env_filter(env_filter(&config.log_level))
        .with_ansi(false)
        .without_time()
        .with_writer(ConsoleMakeWriter)
        .try_init();

    if result.is_ok() {
        tracing::debug!(log_level = %config.log_level, "logging initialised");
    }
}

fn env_filter(directives: &str) -> EnvFilter {
    EnvFilter::try_new(directives).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_LEVEL))
}

#[derive(Clone, Copy, Debug, Default)]
pub struct ConsoleMakeWriter;

impl<'a> MakeWriter<'a> for ConsoleMakeWriter {
    type Writer = ConsoleWriter;

    fn make_writer(&'a self) -> Self::Writer {
        ConsoleWriter::new(Level::INFO)
    }

    fn make_writer_for(&'a self, meta: &Metadata<'_>) -> Self::Writer {
        ConsoleWriter::new(*meta.level())
    }
}

/// Buffers one formatted event and hands it to the console on drop.
pub struct ConsoleWriter {
    level: Level,
    buf: Vec<u8>,
}

impl ConsoleWriter {
    fn new(level: Level) -> Self {
        Self {
            level,
            buf: Vec::new(),
        }
    }

    fn take_line(&mut self) -> Option<String> {
        if self.buf.is_empty() {
            return None;
        }
        let text = String::from_utf8_lossy(&self.buf)
            .trim_end_matches('\n')
            .to_string();
        self.buf.clear();
        Some(text)
    }
}

impl io::Write for ConsoleWriter {
    fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(bytes);
        Ok(bytes.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if let Some(line) = self.take_line() {
            emit(self.level, &line);
        }
        Ok(())
    }
}

impl Drop for ConsoleWriter {
    fn drop(&mut self) {
        if let Some(line) = self.take_line() {
            emit(self.level, &line);
        }
    }
}

#[cfg(target_arch = "wasm32")]
fn emit(level: Level, line: &str) {
    use web_sys::console;

    let line = line.into();
    match level {
        Level::ERROR => console::error_1(&line),
        Level::WARN => console::warn_1(&line),
        Level::INFO => console::info_1(&line),
        _ => console::debug_1(&line),
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn emit(_level: Level, line: &str) {
    eprintln!("{line}");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_env_filter_accepts_directives() {
        assert_eq!(env_filter("debug").to_string(), "debug");
        assert_eq!(
            env_filter("pagetree_app=trace").to_string(),
            "pagetree_app=trace"
        );
    }

    #[test]
    fn test_env_filter_falls_back_on_garbage() {
        assert_eq!(env_filter("pagetree_app=loud").to_string(), DEFAULT_LOG_LEVEL);
    }

    #[test]
    fn test_writer_buffers_until_flushed() {
        let mut w = ConsoleWriter::new(Level::WARN);
        write!(w, "autosave: ").expect("write");
        writeln!(w, "save failed").expect("write");
        assert_eq!(w.take_line().as_deref(), Some("autosave: save failed"));
        assert_eq!(w.take_line(), None);
    }
}
