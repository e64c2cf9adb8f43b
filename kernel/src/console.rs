/// Console abstraction — the seam between the shell and the UART.
///
/// The shell core reads and echoes through this trait so host-target tests
/// can script keystrokes and capture output. The kernel wires
/// `SerialConsole` (COM1); kernel-internal logging keeps going through
/// `serial_print!`/`serial_println!` directly.
use core::fmt;

pub trait Console {
    /// Read one byte, blocking until input arrives.
    fn read_byte(&mut self) -> u8;

    /// Write one byte.
    fn write_byte(&mut self, byte: u8);

    /// Write a string.
    fn write_str(&mut self, s: &str);
}

impl<'a> fmt::Write for dyn Console + 'a {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        Console::write_str(self, s);
        Ok(())
    }
}

/// ANSI: clear screen and home the cursor.
pub const CLEAR_SCREEN: &str = "\x1b[2J\x1b[H";

/// Print to a console handle.
#[macro_export]
macro_rules! con_print {
    ($con:expr, $($arg:tt)*) => {
        {
            use core::fmt::Write as _;
            let _ = write!($con, $($arg)*);
        }
    };
}

/// Print to a console handle with a newline.
#[macro_export]
macro_rules! con_println {
    ($con:expr) => ($crate::con_print!($con, "\n"));
    ($con:expr, $($arg:tt)*) => {
        $crate::con_print!($con, "{}\n", format_args!($($arg)*))
    };
}

/// The COM1-backed console used by the running kernel.
#[cfg(not(test))]
pub struct SerialConsole;

#[cfg(not(test))]
impl Console for SerialConsole {
    fn read_byte(&mut self) -> u8 {
        crate::arch::x86_64::serial::SERIAL.lock().read_byte()
    }

    fn write_byte(&mut self, byte: u8) {
        crate::arch::x86_64::serial::SERIAL.lock().write_byte(byte);
    }

    fn write_str(&mut self, s: &str) {
        crate::arch::x86_64::serial::SERIAL.lock().write_str_raw(s);
    }
}
