//! Native console backends.
//!
//! A [`NativeConsole`] performs, through platform calls, what a recognized
//! escape sequence would have done on a terminal that understands ANSI.
//! Every operation defaults to failing with
//! [`Error::UnsupportedPlatformOperation`](crate::Error), which the
//! wrapper logs and ignores.

use std::io;

use crate::error::unsupported;
use crate::sequence::{ClearMode, Direction};
use crate::types::Style;

/// Console operations a wrapper can translate escape sequences into.
///
/// The wrapper flushes its inner writer before every call, so text already
/// written appears before the console state changes.
pub trait NativeConsole {
    /// Make `style` the attributes of subsequently written text.
    fn set_style(&mut self, _style: &Style) -> io::Result<()> {
        Err(unsupported("setting text attributes"))
    }

    fn move_cursor(&mut self, _direction: Direction, _n: u16) -> io::Result<()> {
        Err(unsupported("relative cursor movement"))
    }

    /// Move the cursor to a 1-indexed row and column.
    fn set_cursor_position(&mut self, _row: u16, _col: u16) -> io::Result<()> {
        Err(unsupported("cursor positioning"))
    }

    fn clear_screen(&mut self, _mode: ClearMode) -> io::Result<()> {
        Err(unsupported("clearing the screen"))
    }

    fn clear_line(&mut self, _mode: ClearMode) -> io::Result<()> {
        Err(unsupported("clearing a line"))
    }

    fn set_title(&mut self, _title: &str) -> io::Result<()> {
        Err(unsupported("setting the window title"))
    }
}

impl<T: ?Sized + NativeConsole> NativeConsole for &mut T {
    fn set_style(&mut self, style: &Style) -> io::Result<()> {
        (**self).set_style(style)
    }
    fn move_cursor(&mut self, direction: Direction, n: u16) -> io::Result<()> {
        (**self).move_cursor(direction, n)
    }
    fn set_cursor_position(&mut self, row: u16, col: u16) -> io::Result<()> {
        (**self).set_cursor_position(row, col)
    }
    fn clear_screen(&mut self, mode: ClearMode) -> io::Result<()> {
        (**self).clear_screen(mode)
    }
    fn clear_line(&mut self, mode: ClearMode) -> io::Result<()> {
        (**self).clear_line(mode)
    }
    fn set_title(&mut self, title: &str) -> io::Result<()> {
        (**self).set_title(title)
    }
}

impl<T: ?Sized + NativeConsole> NativeConsole for Box<T> {
    fn set_style(&mut self, style: &Style) -> io::Result<()> {
        (**self).set_style(style)
    }
    fn move_cursor(&mut self, direction: Direction, n: u16) -> io::Result<()> {
        (**self).move_cursor(direction, n)
    }
    fn set_cursor_position(&mut self, row: u16, col: u16) -> io::Result<()> {
        (**self).set_cursor_position(row, col)
    }
    fn clear_screen(&mut self, mode: ClearMode) -> io::Result<()> {
        (**self).clear_screen(mode)
    }
    fn clear_line(&mut self, mode: ClearMode) -> io::Result<()> {
        (**self).clear_line(mode)
    }
    fn set_title(&mut self, title: &str) -> io::Result<()> {
        (**self).set_title(title)
    }
}

/// A console that supports nothing. Every translated sequence is dropped.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoConsole;

impl NativeConsole for NoConsole {}

/// The standard stream a platform console is attached to.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum StdStream {
    Stdout,
    Stderr,
}

/// The console backend for the current platform.
#[cfg(windows)]
pub type PlatformConsole = windows::WinConsole;

/// The console backend for the current platform.
#[cfg(not(windows))]
pub type PlatformConsole = NoConsole;

#[cfg(windows)]
mod windows {
    use std::io;
    use std::os::windows::io::AsRawHandle;

    use winapi::shared::minwindef::{BOOL, DWORD};
    use winapi::um::wincon::{
        FillConsoleOutputAttribute, FillConsoleOutputCharacterW,
        SetConsoleCursorPosition, SetConsoleTitleW,
    };
    use winapi::um::wincontypes::COORD;
    use winapi::um::winnt::HANDLE;
    use winapi_util::HandleRef;
    use winapi_util::console::{self as wincon, Console, Intense};

    use super::{NativeConsole, StdStream};
    use crate::sequence::{ClearMode, Direction};
    use crate::types::{Brightness, Color, Style};

    /// A legacy Windows console, driven through the console API.
    #[derive(Debug)]
    pub struct WinConsole {
        console: Console,
        stream: StdStream,
    }

    impl WinConsole {
        pub fn open(stream: StdStream) -> io::Result<WinConsole> {
            let console = match stream {
                StdStream::Stdout => Console::stdout()?,
                StdStream::Stderr => Console::stderr()?,
            };
            Ok(WinConsole { console, stream })
        }

        /// Ask the console to interpret ANSI sequences itself. This fails
        /// on consoles older than Windows 10 build 14931.
        pub fn enable_virtual_terminal(&mut self) -> io::Result<()> {
            self.console.set_virtual_terminal_processing(true)
        }

        fn handle(&self) -> HandleRef {
            match self.stream {
                StdStream::Stdout => HandleRef::stdout(),
                StdStream::Stderr => HandleRef::stderr(),
            }
        }

        fn raw(&self) -> HANDLE {
            self.handle().as_raw_handle() as HANDLE
        }

        /// Cursor position and buffer size, both as (x, y).
        fn geometry(&self) -> io::Result<((i16, i16), (i16, i16))> {
            let info = wincon::screen_buffer_info(self.handle())?;
            Ok((info.cursor_position(), info.size()))
        }

        fn goto(&self, x: i16, y: i16) -> io::Result<()> {
            let coord = COORD { X: x.max(0), Y: y.max(0) };
            check(unsafe { SetConsoleCursorPosition(self.raw(), coord) })
        }

        fn fill(&self, x: i16, y: i16, len: i32) -> io::Result<()> {
            if len <= 0 {
                return Ok(());
            }
            let start = COORD { X: x, Y: y };
            let len = len as DWORD;
            let attrs = wincon::screen_buffer_info(self.handle())?.attributes();
            let mut written: DWORD = 0;
            check(unsafe {
                FillConsoleOutputCharacterW(
                    self.raw(),
                    u16::from(b' '),
                    len,
                    start,
                    &mut written,
                )
            })?;
            check(unsafe {
                FillConsoleOutputAttribute(
                    self.raw(),
                    attrs,
                    len,
                    start,
                    &mut written,
                )
            })
        }
    }

    fn check(ok: BOOL) -> io::Result<()> {
        if ok == 0 { Err(io::Error::last_os_error()) } else { Ok(()) }
    }

    /// Maps a color onto the console's eight colors plus intensity. Palette
    /// entries beyond the first sixteen have no console equivalent.
    fn console_color(color: Color) -> Option<(wincon::Color, bool)> {
        let (index, light) = match color {
            Color::Ansi256(n) if n < 16 => (n % 8, n >= 8),
            other => other.basic_index()?,
        };
        let color = match index {
            0 => wincon::Color::Black,
            1 => wincon::Color::Red,
            2 => wincon::Color::Green,
            3 => wincon::Color::Yellow,
            4 => wincon::Color::Blue,
            5 => wincon::Color::Magenta,
            6 => wincon::Color::Cyan,
            _ => wincon::Color::White,
        };
        Some((color, light))
    }

    fn intense(yes: bool) -> Intense {
        if yes { Intense::Yes } else { Intense::No }
    }

    impl NativeConsole for WinConsole {
        fn set_style(&mut self, style: &Style) -> io::Result<()> {
            self.console.reset()?;
            let bright = style.brightness() == Brightness::Bright;
            if let Some((color, light)) = style.fg().and_then(console_color) {
                self.console.fg(intense(light || bright), color)?;
            } else if bright {
                self.console.fg(Intense::Yes, wincon::Color::White)?;
            }
            if let Some((color, light)) = style.bg().and_then(console_color) {
                self.console.bg(intense(light), color)?;
            }
            Ok(())
        }

        fn move_cursor(&mut self, direction: Direction, n: u16) -> io::Result<()> {
            let ((x, y), _) = self.geometry()?;
            let n = i16::try_from(n).unwrap_or(i16::MAX);
            let (x, y) = match direction {
                Direction::Up => (x, y.saturating_sub(n)),
                Direction::Down => (x, y.saturating_add(n)),
                Direction::Forward => (x.saturating_add(n), y),
                Direction::Back => (x.saturating_sub(n), y),
            };
            self.goto(x, y)
        }

        fn set_cursor_position(&mut self, row: u16, col: u16) -> io::Result<()> {
            let to_zero_based =
                |v: u16| i16::try_from(v.saturating_sub(1)).unwrap_or(i16::MAX);
            self.goto(to_zero_based(col), to_zero_based(row))
        }

        fn clear_screen(&mut self, mode: ClearMode) -> io::Result<()> {
            let ((x, y), (w, h)) = self.geometry()?;
            let (w, h, x, y) = (i32::from(w), i32::from(h), i32::from(x), i32::from(y));
            let cursor = y * w + x;
            match mode {
                ClearMode::ToEnd => self.fill(x as i16, y as i16, w * h - cursor),
                ClearMode::ToStart => self.fill(0, 0, cursor + 1),
                ClearMode::All => {
                    self.fill(0, 0, w * h)?;
                    self.goto(0, 0)
                }
            }
        }

        fn clear_line(&mut self, mode: ClearMode) -> io::Result<()> {
            let ((x, y), (w, _)) = self.geometry()?;
            match mode {
                ClearMode::ToEnd => self.fill(x, y, i32::from(w) - i32::from(x)),
                ClearMode::ToStart => self.fill(0, y, i32::from(x) + 1),
                ClearMode::All => self.fill(0, y, i32::from(w)),
            }
        }

        fn set_title(&mut self, title: &str) -> io::Result<()> {
            let wide: Vec<u16> =
                title.encode_utf16().chain(std::iter::once(0)).collect();
            check(unsafe { SetConsoleTitleW(wide.as_ptr()) })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_console_reports_unsupported() {
        let mut console = NoConsole;
        let err = console.move_cursor(Direction::Up, 1).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::Unsupported);
        assert!(console.set_title("t").is_err());
        assert!(console.set_style(&Style::new()).is_err());
    }
}
