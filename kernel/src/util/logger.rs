//! Boot logger.
//!
//! Routes the `log` facade to whatever console sink is registered.
//! Records logged before a sink exists are dropped.

use core::fmt::{self, Write};

use spin::Once;

use crate::console::{self, Console};

struct KernelLogger;

/// `fmt::Write` adapter over a console sink.
struct ConsoleWriter<'a> {
    sink: &'a mut dyn Console,
}

impl fmt::Write for ConsoleWriter<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.sink.print_str(s);
        Ok(())
    }
}

impl log::Log for KernelLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &log::Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        console::with_console(|sink| {
            let mut writer = ConsoleWriter { sink };
            // Formatting failures have nowhere to go; drop them.
            let _ = writeln!(writer, "[{:5}] {}", record.level(), record.args());
        });
    }

    fn flush(&self) {}
}

static LOGGER: KernelLogger = KernelLogger;
static INIT: Once = Once::new();

/// Install the logger. Safe to call more than once; only the first
/// call takes effect.
pub fn init() {
    INIT.call_once(|| {
        if log::set_logger(&LOGGER).is_ok() {
            log::set_max_level(log::LevelFilter::Info);
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::Color;

    struct Captured {
        text: String,
    }

    impl Console for Captured {
        fn print_str(&mut self, s: &str) {
            self.text.push_str(s);
        }
        fn set_color(&mut self, _fg: Color, _bg: Color) {}
        fn clear(&mut self) {
            self.text.clear();
        }
    }

    #[test]
    fn writer_passes_text_through() {
        let mut sink = Captured {
            text: String::new(),
        };
        let mut writer = ConsoleWriter { sink: &mut sink };
        write!(writer, "tick {}", 7).unwrap();
        assert_eq!(sink.text, "tick 7");
    }
}
