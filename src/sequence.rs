//! Builders for the parameterized sequences: cursor movement, cursor
//! positioning, screen and line clearing, and the window title.
//!
//! None of these validate beyond their types. Odd values are handed to the
//! terminal, which is free to ignore them.

use crate::codes::{BEL, CSI, EscapeSequence, OSC};

/// A relative cursor movement.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Direction {
    Up,
    Down,
    Forward,
    Back,
}

impl Direction {
    /// The final byte of the CSI sequence for this direction.
    pub fn final_byte(self) -> char {
        match self {
            Direction::Up => 'A',
            Direction::Down => 'B',
            Direction::Forward => 'C',
            Direction::Back => 'D',
        }
    }

    pub(crate) fn from_final_byte(b: u8) -> Option<Direction> {
        match b {
            b'A' => Some(Direction::Up),
            b'B' => Some(Direction::Down),
            b'C' => Some(Direction::Forward),
            b'D' => Some(Direction::Back),
            _ => None,
        }
    }
}

/// The region erased by a clear sequence.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
#[repr(u8)]
pub enum ClearMode {
    /// From the cursor to the end of the screen or line.
    ToEnd = 0,
    /// From the start of the screen or line to the cursor.
    ToStart = 1,
    /// The whole screen or line.
    #[default]
    All = 2,
}

impl ClearMode {
    pub fn code(self) -> u8 {
        self as u8
    }

    pub(crate) fn from_code(code: u16) -> Option<ClearMode> {
        match code {
            0 => Some(ClearMode::ToEnd),
            1 => Some(ClearMode::ToStart),
            2 => Some(ClearMode::All),
            _ => None,
        }
    }
}

/// `CSI <n> <A|B|C|D>`.
///
/// `n = 0` is emitted as is. Many terminals treat it like `1`; that is left
/// to the terminal.
pub fn cursor_move(direction: Direction, n: u16) -> EscapeSequence {
    EscapeSequence::from_string(format!(
        "{CSI}{n}{}",
        direction.final_byte()
    ))
}

/// `CSI <y>;<x> H`, with 1-indexed column `x` and row `y`.
pub fn cursor_position(x: u16, y: u16) -> EscapeSequence {
    EscapeSequence::from_string(format!("{CSI}{y};{x}H"))
}

/// `OSC 2;<title> BEL`.
///
/// The title is embedded verbatim. Control characters inside it, BEL in
/// particular, will end the sequence early on a real terminal.
pub fn set_title(title: &str) -> EscapeSequence {
    EscapeSequence::from_string(format!("{OSC}2;{title}{BEL}"))
}

/// `CSI <mode> J`.
pub fn clear_screen(mode: ClearMode) -> EscapeSequence {
    EscapeSequence::from_string(format!("{CSI}{}J", mode.code()))
}

/// `CSI <mode> K`.
pub fn clear_line(mode: ClearMode) -> EscapeSequence {
    EscapeSequence::from_string(format!("{CSI}{}K", mode.code()))
}

/// Shorthand constructors for cursor sequences.
#[derive(Clone, Copy, Debug, Default)]
pub struct Cursor;

impl Cursor {
    pub fn up(n: u16) -> EscapeSequence {
        cursor_move(Direction::Up, n)
    }

    pub fn down(n: u16) -> EscapeSequence {
        cursor_move(Direction::Down, n)
    }

    pub fn forward(n: u16) -> EscapeSequence {
        cursor_move(Direction::Forward, n)
    }

    pub fn back(n: u16) -> EscapeSequence {
        cursor_move(Direction::Back, n)
    }

    pub fn pos(x: u16, y: u16) -> EscapeSequence {
        cursor_position(x, y)
    }
}
