//! Console sink interface.
//!
//! The text-mode driver itself lives outside this crate; the core only
//! needs somewhere to put boot logs and the exception report. Drivers
//! implement [`Console`] and register themselves; the logger and the
//! panic path render through whatever sink is registered, or silently
//! drop output when none is.

use crate::sync::SpinLock;

/// The 16-color VGA text palette.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[repr(u8)]
pub enum Color {
    Black = 0,
    Blue = 1,
    Green = 2,
    Cyan = 3,
    Red = 4,
    Magenta = 5,
    Brown = 6,
    LightGray = 7,
    DarkGray = 8,
    LightBlue = 9,
    LightGreen = 10,
    LightCyan = 11,
    LightRed = 12,
    Pink = 13,
    Yellow = 14,
    White = 15,
}

/// Palette the exception report switches to before printing: impossible
/// to mistake for ordinary boot output.
pub const ATTENTION_FG: Color = Color::White;
pub const ATTENTION_BG: Color = Color::Cyan;

/// An output sink for kernel text.
pub trait Console {
    fn print_str(&mut self, s: &str);

    fn print_char(&mut self, c: char) {
        let mut buf = [0u8; 4];
        self.print_str(c.encode_utf8(&mut buf));
    }

    /// Print a 32-bit value as exactly 8 hex digits.
    fn print_hex(&mut self, value: u32) {
        const DIGITS: &[u8; 16] = b"0123456789ABCDEF";
        for shift in (0..8).rev() {
            let nibble = ((value >> (shift * 4)) & 0xF) as usize;
            self.print_char(DIGITS[nibble] as char);
        }
    }

    fn set_color(&mut self, fg: Color, bg: Color);

    fn clear(&mut self);
}

/// The registered sink. `None` until a driver registers; output before
/// that point is dropped rather than buffered.
static CONSOLE: SpinLock<Option<&'static mut (dyn Console + Send)>> = SpinLock::new(None);

/// Register the system console. Last registration wins.
pub fn register(sink: &'static mut (dyn Console + Send)) {
    *CONSOLE.lock() = Some(sink);
}

/// Run `f` against the registered console, if any.
///
/// Takes the console lock; a trap raised while the current core already
/// holds it will deadlock here rather than interleave output. That is the
/// accepted trade: the exception path prefers a hung report over a
/// corrupted one.
pub fn with_console<R>(f: impl FnOnce(&mut dyn Console) -> R) -> Option<R> {
    let mut guard = CONSOLE.lock();
    guard.as_deref_mut().map(|sink| f(sink))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
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
    fn print_hex_is_exactly_eight_digits() {
        let mut sink = Captured::default();
        sink.print_hex(0x2A);
        assert_eq!(sink.text, "0000002A");
        sink.clear();
        sink.print_hex(0xDEAD_BEEF);
        assert_eq!(sink.text, "DEADBEEF");
    }

    #[test]
    fn with_console_returns_none_when_unregistered() {
        // The global sink is process-wide state; this test only asserts
        // the no-sink path never panics.
        let _ = with_console(|c| c.print_str("boot"));
    }
}
