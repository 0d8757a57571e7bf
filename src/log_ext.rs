//! A thin facade around the `log` crate's macros (§2, §4.9 of `SPEC_FULL.md`).
//!
//! This crate never calls `log::set_logger` itself outside of tests — which
//! subscriber receives `trace!`/`debug!`/`warn!`/`error!` records is the host
//! kernel's decision, the same way the teacher's own `klog`-style crates
//! leave the sink (serial port, framebuffer console, ...) to whoever owns the
//! hardware. What this module provides is the other half: a couple of
//! reference [`log::Log`] implementations so a host (or this crate's own
//! tests) doesn't have to hand-roll one to get started.

#[cfg(feature = "std")]
pub use console::ConsoleLogger;

#[cfg(feature = "std")]
mod console {
    use log::{Level, Log, Metadata, Record};

    /// A `log::Log` that writes to stderr, gated behind the `std` feature
    /// since formatting a line and writing it needs an allocator-backed
    /// `String` and a byte sink this crate doesn't assume in `no_std` builds.
    /// Mirrors the teacher's own serial-console logger shape (level tag,
    /// then the formatted message) without adopting its color codes, since
    /// this crate has no framebuffer to colorize.
    pub struct ConsoleLogger {
        level: Level,
    }

    impl ConsoleLogger {
        pub const fn new(level: Level) -> Self {
            Self { level }
        }

        /// Installs this logger as the global `log` subscriber. Idempotent
        /// per-process; a second call returns the `SetLoggerError` from
        /// `log::set_boxed_logger` so callers can decide whether a
        /// double-install is a bug.
        pub fn install(level: Level) -> Result<(), log::SetLoggerError> {
            log::set_boxed_logger(alloc::boxed::Box::new(Self::new(level)))?;
            log::set_max_level(level.to_level_filter());
            Ok(())
        }
    }

    impl Log for ConsoleLogger {
        fn enabled(&self, metadata: &Metadata) -> bool {
            metadata.level() <= self.level
        }

        fn log(&self, record: &Record) {
            if self.enabled(record.metadata()) {
                std::eprintln!("[{:<5} {}] {}", record.level(), record.target(), record.args());
            }
        }

        fn flush(&self) {}
    }
}

/// An in-memory capturing sink used only by this crate's own tests, so a
/// test can assert that (say) a fatal halt actually emitted an `error!`
/// record rather than silently panicking, without parsing stdout.
#[cfg(test)]
pub mod test_sink {
    use std::string::{String, ToString};
    use std::sync::Mutex;
    use std::vec::Vec;

    use log::{Level, Log, Metadata, Record};

    /// One captured record: level plus the fully formatted message.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct Captured {
        pub level: Level,
        pub message: String,
    }

    struct CapturingLogger {
        records: Mutex<Vec<Captured>>,
    }

    impl Log for CapturingLogger {
        fn enabled(&self, _metadata: &Metadata) -> bool {
            true
        }

        fn log(&self, record: &Record) {
            self.records.lock().unwrap().push(Captured {
                level: record.level(),
                message: record.args().to_string(),
            });
        }

        fn flush(&self) {}
    }

    static LOGGER: CapturingLogger = CapturingLogger {
        records: Mutex::new(Vec::new()),
    };

    /// Installs the capturing sink as the global logger. Safe to call more
    /// than once across a test binary's run (every `#[test]` shares one
    /// process); repeated installs are ignored rather than treated as an
    /// error, since tests only care that *a* capturing sink is active.
    pub fn install() {
        let _ = log::set_logger(&LOGGER);
        log::set_max_level(log::LevelFilter::Trace);
    }

    /// Returns every record captured so far and clears the buffer, so each
    /// test that calls this starts from an empty slate regardless of what
    /// other tests logged earlier in the same process.
    pub fn drain() -> Vec<Captured> {
        let mut records = LOGGER.records.lock().unwrap();
        core::mem::take(&mut *records)
    }
}
