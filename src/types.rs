use std::env;
use std::fmt;
use std::str::FromStr;

use crate::codes::{CSI, EscapeSequence, PALETTE_BG_PREFIX, PALETTE_FG_PREFIX};
use crate::error::{Error, Result};

/// ColorChoice represents the color preferences of an end user.
///
/// The `Default` implementation for this type will select `Auto`, which tries
/// to do the right thing based on the current environment.
///
/// The `FromStr` implementation for this type converts a lowercase kebab-case
/// string of the variant name to the corresponding variant. Any other string
/// results in an error.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum ColorChoice {
    /// Try very hard to emit colors. This includes translating sequences
    /// through the native console on Windows when virtual terminal
    /// processing cannot be enabled.
    Always,
    /// AlwaysAnsi is like Always, except it never tries to use anything other
    /// than emitting ANSI color codes.
    AlwaysAnsi,
    /// Try to use colors, but don't force the issue. If the stream isn't a
    /// terminal, or if TERM=dumb, or if `NO_COLOR` is defined, for example,
    /// then don't use colors.
    #[default]
    Auto,
    /// Never emit colors. Sequences written through a wrapper are stripped.
    Never,
}

impl FromStr for ColorChoice {
    type Err = Error;

    fn from_str(s: &str) -> Result<ColorChoice> {
        match s.to_lowercase().as_str() {
            "always" => Ok(ColorChoice::Always),
            "always-ansi" => Ok(ColorChoice::AlwaysAnsi),
            "never" => Ok(ColorChoice::Never),
            "auto" => Ok(ColorChoice::Auto),
            unknown => Err(Error::InvalidChoice(unknown.to_string())),
        }
    }
}

impl ColorChoice {
    /// Returns true if we should attempt to write colored output to a stream
    /// that is (or isn't) attached to a terminal.
    pub(crate) fn should_attempt_color(&self, is_terminal: bool) -> bool {
        match *self {
            ColorChoice::Always => true,
            ColorChoice::AlwaysAnsi => true,
            ColorChoice::Never => false,
            ColorChoice::Auto => is_terminal && self.env_allows_color(),
        }
    }

    #[cfg(not(windows))]
    fn env_allows_color(&self) -> bool {
        match env::var_os("TERM") {
            // If TERM isn't set, then we are in a weird environment that
            // probably doesn't support colors.
            None => return false,
            Some(k) => {
                if k == "dumb" {
                    return false;
                }
            }
        }
        // If TERM != dumb, then the only way we don't allow colors at this
        // point is if NO_COLOR is set.
        if env::var_os("NO_COLOR").is_some() {
            return false;
        }
        true
    }

    #[cfg(windows)]
    fn env_allows_color(&self) -> bool {
        // On Windows, if TERM isn't set, then we shouldn't automatically
        // assume that colors aren't allowed. This is unlike Unix environments
        // where TERM is more rigorously set.
        if let Some(k) = env::var_os("TERM") {
            if k == "dumb" {
                return false;
            }
        }
        if env::var_os("NO_COLOR").is_some() {
            return false;
        }
        true
    }

    /// Returns true if this choice should forcefully use ANSI color codes
    /// rather than translating them for the native console.
    #[cfg(windows)]
    pub(crate) fn should_force_ansi(&self) -> bool {
        match *self {
            ColorChoice::Always => false,
            ColorChoice::AlwaysAnsi => true,
            ColorChoice::Never => false,
            ColorChoice::Auto => {
                if let Ok(term) = env::var("TERM") {
                    term != "dumb" && term != "cygwin"
                } else {
                    false
                }
            }
        }
    }
}

/// The set of colors a wrapper tracks for the foreground and background.
///
/// The first sixteen map onto SGR codes `30..=37`/`90..=97` (foreground) and
/// `40..=47`/`100..=107` (background). `Ansi256` selects from the extended
/// palette with `38;5;n` or `48;5;n`.
///
/// This type has a `FromStr` impl that accepts:
///
/// 1. Any of the eight basic colors in English, optionally prefixed with
///    `light` (and optionally suffixed with `_ex`). Matched case
///    insensitively.
/// 2. A single 8-bit integer, in either decimal or hexadecimal format, which
///    selects from the 256-color palette.
///
/// Hexadecimal numbers are written with a `0x` prefix.
#[allow(missing_docs)]
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Color {
    Black,
    Red,
    Green,
    Yellow,
    Blue,
    Magenta,
    Cyan,
    White,
    LightBlack,
    LightRed,
    LightGreen,
    LightYellow,
    LightBlue,
    LightMagenta,
    LightCyan,
    LightWhite,
    Ansi256(u8),
}

const BASIC: [Color; 8] = [
    Color::Black,
    Color::Red,
    Color::Green,
    Color::Yellow,
    Color::Blue,
    Color::Magenta,
    Color::Cyan,
    Color::White,
];

const LIGHT: [Color; 8] = [
    Color::LightBlack,
    Color::LightRed,
    Color::LightGreen,
    Color::LightYellow,
    Color::LightBlue,
    Color::LightMagenta,
    Color::LightCyan,
    Color::LightWhite,
];

impl Color {
    /// Returns the 0-7 index of a basic color and whether it is the light
    /// variant, or `None` for palette colors.
    pub fn basic_index(self) -> Option<(u8, bool)> {
        if let Some(i) = BASIC.iter().position(|&c| c == self) {
            return Some((i as u8, false));
        }
        LIGHT.iter().position(|&c| c == self).map(|i| (i as u8, true))
    }

    /// Builds a basic color from its 0-7 index.
    pub(crate) fn from_index(i: u8, light: bool) -> Option<Color> {
        let table = if light { &LIGHT } else { &BASIC };
        table.get(usize::from(i)).copied()
    }

    /// The SGR parameters selecting this color as foreground or background.
    pub fn sgr_params(self, background: bool) -> String {
        if let Color::Ansi256(n) = self {
            let prefix =
                if background { PALETTE_BG_PREFIX } else { PALETTE_FG_PREFIX };
            return format!("{prefix}{n}");
        }
        let (i, light) = self.basic_index().unwrap_or((0, false));
        let base = match (light, background) {
            (false, false) => 30,
            (true, false) => 90,
            (false, true) => 40,
            (true, true) => 100,
        };
        (base + i).to_string()
    }
}

impl FromStr for Color {
    type Err = Error;

    fn from_str(s: &str) -> Result<Color> {
        fn parse_number(s: &str) -> Option<u8> {
            if let Some(hex_str) = s.strip_prefix("0x") {
                u8::from_str_radix(hex_str, 16).ok()
            } else {
                s.parse::<u8>().ok()
            }
        }

        let lower = s.to_lowercase();
        let name = lower.strip_suffix("_ex").unwrap_or(&lower);
        let (name, light) = match name.strip_prefix("light") {
            Some(rest) => (rest, true),
            None => (name, false),
        };
        let index = match name {
            "black" => Some(0),
            "red" => Some(1),
            "green" => Some(2),
            "yellow" => Some(3),
            "blue" => Some(4),
            "magenta" => Some(5),
            "cyan" => Some(6),
            "white" => Some(7),
            _ => None,
        };
        if let Some(color) = index.and_then(|i| Color::from_index(i, light)) {
            return Ok(color);
        }
        parse_number(&lower).map(Color::Ansi256).ok_or_else(|| {
            Error::InvalidStyle {
                given: s.to_string(),
                reason: "expected a color name or a number in [0-255]",
            }
        })
    }
}

/// The brightness attribute of a style.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub enum Brightness {
    #[default]
    Normal,
    Bright,
    Dim,
}

impl Brightness {
    pub fn code(self) -> u8 {
        match self {
            Brightness::Normal => 22,
            Brightness::Bright => 1,
            Brightness::Dim => 2,
        }
    }
}

/// A style: foreground, background and brightness.
///
/// This is both what callers ask for through [`WriteColor::set_color`] and
/// what a wrapper records as the style currently in effect. The default
/// value has no colors and normal brightness, which is the full-reset state.
///
/// [`WriteColor::set_color`]: crate::WriteColor::set_color
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub struct Style {
    pub(crate) fg: Option<Color>,
    pub(crate) bg: Option<Color>,
    pub(crate) brightness: Brightness,
}

impl Style {
    /// Create a new style that has no colors and normal brightness.
    pub fn new() -> Style {
        Style::default()
    }

    /// Get the foreground color.
    pub fn fg(&self) -> Option<Color> {
        self.fg
    }

    /// Set the foreground color.
    pub fn set_fg(&mut self, color: Option<Color>) -> &mut Style {
        self.fg = color;
        self
    }

    /// Get the background color.
    pub fn bg(&self) -> Option<Color> {
        self.bg
    }

    /// Set the background color.
    pub fn set_bg(&mut self, color: Option<Color>) -> &mut Style {
        self.bg = color;
        self
    }

    pub fn brightness(&self) -> Brightness {
        self.brightness
    }

    pub fn set_brightness(&mut self, brightness: Brightness) -> &mut Style {
        self.brightness = brightness;
        self
    }

    /// Returns true if this style has no colors and normal brightness.
    pub fn is_reset(&self) -> bool {
        *self == Style::default()
    }

    /// Clears this style back to the full-reset state.
    pub fn clear(&mut self) {
        *self = Style::default();
    }

    /// Renders the sequences that take a terminal from the full-reset state
    /// to this style: a full reset followed by one SGR sequence per set
    /// attribute.
    pub fn sequence(&self) -> EscapeSequence {
        EscapeSequence::from_string(self.to_string())
    }
}

impl fmt::Display for Style {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{CSI}0m")?;
        if self.brightness != Brightness::Normal {
            write!(f, "{CSI}{}m", self.brightness.code())?;
        }
        if let Some(c) = self.fg {
            write!(f, "{CSI}{}m", c.sgr_params(false))?;
        }
        if let Some(c) = self.bg {
            write!(f, "{CSI}{}m", c.sgr_params(true))?;
        }
        Ok(())
    }
}

impl FromStr for Style {
    type Err = Error;

    /// Parses a comma separated description such as `fg:red,bg:blue,bright`.
    /// A bare color sets the foreground.
    fn from_str(spec: &str) -> Result<Style> {
        let mut style = Style::new();
        for part in spec.split(',') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }

            if let Some(color_str) = part.strip_prefix("fg:") {
                style.set_fg(Some(color_str.parse()?));
            } else if let Some(color_str) = part.strip_prefix("bg:") {
                style.set_bg(Some(color_str.parse()?));
            } else if part == "bright" || part == "bold" {
                style.set_brightness(Brightness::Bright);
            } else if part == "dim" || part == "dimmed" {
                style.set_brightness(Brightness::Dim);
            } else if part == "normal" {
                style.set_brightness(Brightness::Normal);
            } else {
                style.set_fg(Some(part.parse()?));
            }
        }
        Ok(style)
    }
}
