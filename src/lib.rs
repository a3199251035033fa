//! Terminal styling with ANSI escape sequences, and a shim that makes them
//! work on consoles that do not understand them.
//!
//! Named colors and attributes live in [`codes`], composite sequences in
//! [`sequence`]. Writing through a [`WrappedStream`] keeps track of the style
//! in effect and, where needed, translates sequences into native console
//! calls.
//!
//! ```no_run
//! use std::io::Write;
//! use colorshim::{Fore, StyleCode, WrapOptions};
//!
//! let _guard = colorshim::init(WrapOptions::new().autoreset(true));
//! let mut out = colorshim::stdout();
//! writeln!(out, "{}{}warning:{} disk almost full", Fore::Yellow, StyleCode::Bright, StyleCode::ResetAll)?;
//! # Ok::<(), std::io::Error>(())
//! ```

pub mod codes;
mod console;
mod context;
mod error;
pub mod scanner;
pub mod sequence;
mod state;
mod traits;
mod types;
mod writers;

// Re-export core traits and types
pub use codes::{
    Back, Category, CodeKind, ColorCode, EscapeSequence, Fore, Palette,
    StyleCode, lookup, names,
};
pub use console::{NativeConsole, NoConsole, PlatformConsole, StdStream};
pub use context::{StyleScope, with_style};
pub use error::{Error, Result};
pub use sequence::{
    ClearMode, Cursor, Direction, clear_line, clear_screen, cursor_move,
    cursor_position, set_title,
};
pub use state::StyleState;
pub use traits::WriteColor;
pub use types::{Brightness, Color, ColorChoice, Style};
pub use writers::{
    InitGuard, IoStandardStream, StandardStreamLock, StreamMode, WrapOptions,
    WrappedStream, deinit, init, just_fix_console, stderr, stdout,
};
