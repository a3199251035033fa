//! The escape code table.
//!
//! Every symbolic name maps to a numeric SGR code through a plain enum
//! discriminant or a static array, and every code formats to a sequence of
//! the form `CSI <code> m`. Nothing here has side effects, so the table may
//! be read from any number of threads.

use std::fmt;
use std::str::FromStr;

use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::error::{Error, Result};
use crate::sequence::{Direction, cursor_move, cursor_position};

/// Control sequence introducer.
pub const CSI: &str = "\x1B[";
/// Operating system command introducer.
pub const OSC: &str = "\x1B]";
/// Terminator for OSC sequences.
pub const BEL: &str = "\x07";
/// Parameter prefix selecting a foreground color from the 256-color palette.
pub const PALETTE_FG_PREFIX: &str = "38;5;";
/// Parameter prefix selecting a background color from the 256-color palette.
pub const PALETTE_BG_PREFIX: &str = "48;5;";

/// A formatted escape sequence.
///
/// Values are only built by this crate, which keeps them well formed: an
/// introducer, `;` separated numeric parameters and a single final byte.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct EscapeSequence(String);

impl EscapeSequence {
    pub(crate) fn from_string(seq: String) -> EscapeSequence {
        EscapeSequence(seq)
    }

    /// Builds `CSI <params> m`.
    pub(crate) fn sgr(params: impl fmt::Display) -> EscapeSequence {
        EscapeSequence(format!("{CSI}{params}m"))
    }

    /// The full-reset sequence, `CSI 0 m`.
    pub fn reset_all() -> EscapeSequence {
        EscapeSequence::sgr(StyleCode::ResetAll.code())
    }

    /// Returns this sequence as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the raw bytes of this sequence.
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    /// Consume this sequence and return the underlying string.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for EscapeSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for EscapeSequence {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl AsRef<[u8]> for EscapeSequence {
    fn as_ref(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl From<EscapeSequence> for String {
    fn from(seq: EscapeSequence) -> String {
        seq.0
    }
}

/// The kind of a numeric code, which decides how it is rendered.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum CodeKind {
    Foreground,
    Background,
    Attribute,
    Palette,
}

/// A numeric SGR code tagged with its kind.
///
/// Palette codes render with the `38;5;` prefix. All other kinds render as
/// the bare number.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct ColorCode {
    kind: CodeKind,
    value: u8,
}

impl ColorCode {
    /// Creates a code, returning `None` when `value` is outside the range
    /// defined for `kind`.
    pub fn new(kind: CodeKind, value: u8) -> Option<ColorCode> {
        let valid = match kind {
            CodeKind::Foreground => {
                matches!(value, 30..=37 | 39 | 90..=97)
            }
            CodeKind::Background => {
                matches!(value, 40..=47 | 49 | 100..=107)
            }
            CodeKind::Attribute => matches!(value, 0 | 1 | 2 | 22),
            CodeKind::Palette => true,
        };
        valid.then_some(ColorCode { kind, value })
    }

    pub fn kind(&self) -> CodeKind {
        self.kind
    }

    pub fn value(&self) -> u8 {
        self.value
    }

    /// Formats this code as a complete SGR sequence.
    pub fn sequence(&self) -> EscapeSequence {
        EscapeSequence::sgr(self)
    }
}

impl fmt::Display for ColorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            CodeKind::Palette => write!(f, "{PALETTE_FG_PREFIX}{}", self.value),
            _ => write!(f, "{}", self.value),
        }
    }
}

/// The categories of symbolic names understood by [`lookup`].
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Display, EnumIter)]
pub enum Category {
    #[strum(to_string = "palette")]
    Palette,
    #[strum(to_string = "fore")]
    Fore,
    #[strum(to_string = "back")]
    Back,
    #[strum(to_string = "style")]
    Style,
    #[strum(to_string = "cursor")]
    Cursor,
}

impl FromStr for Category {
    type Err = Error;

    fn from_str(s: &str) -> Result<Category> {
        match &*s.to_ascii_lowercase() {
            "palette" | "sgr" => Ok(Category::Palette),
            "fore" | "foreground" => Ok(Category::Fore),
            "back" | "background" => Ok(Category::Back),
            "style" => Ok(Category::Style),
            "cursor" => Ok(Category::Cursor),
            _ => Err(Error::UnknownCategory(s.to_string())),
        }
    }
}

/// Standard and light foreground colors.
#[derive(
    Clone, Copy, Debug, Eq, PartialEq, Hash, EnumString, EnumIter, IntoStaticStr,
)]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
#[repr(u8)]
pub enum Fore {
    Black = 30,
    Red = 31,
    Green = 32,
    Yellow = 33,
    Blue = 34,
    Magenta = 35,
    Cyan = 36,
    White = 37,
    Reset = 39,
    #[strum(serialize = "LIGHTBLACK_EX")]
    LightBlack = 90,
    #[strum(serialize = "LIGHTRED_EX")]
    LightRed = 91,
    #[strum(serialize = "LIGHTGREEN_EX")]
    LightGreen = 92,
    #[strum(serialize = "LIGHTYELLOW_EX")]
    LightYellow = 93,
    #[strum(serialize = "LIGHTBLUE_EX")]
    LightBlue = 94,
    #[strum(serialize = "LIGHTMAGENTA_EX")]
    LightMagenta = 95,
    #[strum(serialize = "LIGHTCYAN_EX")]
    LightCyan = 96,
    #[strum(serialize = "LIGHTWHITE_EX")]
    LightWhite = 97,
}

/// Standard and light background colors.
#[derive(
    Clone, Copy, Debug, Eq, PartialEq, Hash, EnumString, EnumIter, IntoStaticStr,
)]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
#[repr(u8)]
pub enum Back {
    Black = 40,
    Red = 41,
    Green = 42,
    Yellow = 43,
    Blue = 44,
    Magenta = 45,
    Cyan = 46,
    White = 47,
    Reset = 49,
    #[strum(serialize = "LIGHTBLACK_EX")]
    LightBlack = 100,
    #[strum(serialize = "LIGHTRED_EX")]
    LightRed = 101,
    #[strum(serialize = "LIGHTGREEN_EX")]
    LightGreen = 102,
    #[strum(serialize = "LIGHTYELLOW_EX")]
    LightYellow = 103,
    #[strum(serialize = "LIGHTBLUE_EX")]
    LightBlue = 104,
    #[strum(serialize = "LIGHTMAGENTA_EX")]
    LightMagenta = 105,
    #[strum(serialize = "LIGHTCYAN_EX")]
    LightCyan = 106,
    #[strum(serialize = "LIGHTWHITE_EX")]
    LightWhite = 107,
}

/// Brightness attributes and the full reset.
#[derive(
    Clone, Copy, Debug, Eq, PartialEq, Hash, EnumString, EnumIter, IntoStaticStr,
)]
#[strum(ascii_case_insensitive)]
#[repr(u8)]
pub enum StyleCode {
    #[strum(serialize = "BRIGHT")]
    Bright = 1,
    #[strum(serialize = "DIM")]
    Dim = 2,
    #[strum(serialize = "NORMAL")]
    Normal = 22,
    #[strum(serialize = "RESET_ALL")]
    ResetAll = 0,
}

macro_rules! impl_table_entry {
    ($ty:ident, $kind:expr) => {
        impl $ty {
            /// The numeric SGR code.
            pub fn code(self) -> u8 {
                self as u8
            }

            /// The tagged code for this entry.
            pub fn color_code(self) -> ColorCode {
                ColorCode { kind: $kind, value: self.code() }
            }

            /// The symbolic name, as accepted by [`lookup`].
            pub fn name(self) -> &'static str {
                self.into()
            }

            /// The formatted escape sequence.
            pub fn sequence(self) -> EscapeSequence {
                self.color_code().sequence()
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{CSI}{}m", self.code())
            }
        }

        impl From<$ty> for EscapeSequence {
            fn from(entry: $ty) -> EscapeSequence {
                entry.sequence()
            }
        }
    };
}

impl_table_entry!(Fore, CodeKind::Foreground);
impl_table_entry!(Back, CodeKind::Background);
impl_table_entry!(StyleCode, CodeKind::Attribute);

/// A named entry of the 256-color palette.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct Palette(u8);

impl Palette {
    pub fn new(index: u8) -> Palette {
        Palette(index)
    }

    pub fn index(self) -> u8 {
        self.0
    }

    pub fn name(self) -> &'static str {
        PALETTE_NAMES[usize::from(self.0)]
    }

    pub fn color_code(self) -> ColorCode {
        ColorCode { kind: CodeKind::Palette, value: self.0 }
    }

    pub fn sequence(self) -> EscapeSequence {
        self.color_code().sequence()
    }

    /// All 256 entries in index order.
    pub fn iter() -> impl Iterator<Item = Palette> {
        (0..=u8::MAX).map(Palette)
    }
}

impl FromStr for Palette {
    type Err = Error;

    /// Accepts a palette name (case insensitive) or a plain decimal index
    /// in `0..=255`, without sign or leading zeros.
    fn from_str(s: &str) -> Result<Palette> {
        let is_index = !s.is_empty()
            && s.bytes().all(|b| b.is_ascii_digit())
            && (s == "0" || !s.starts_with('0'));
        let found = if is_index {
            s.parse::<u8>().ok()
        } else {
            PALETTE_NAMES
                .iter()
                .position(|name| name.eq_ignore_ascii_case(s))
                .and_then(|i| u8::try_from(i).ok())
        };
        found.map(Palette).ok_or_else(|| Error::UnknownName {
            category: Category::Palette,
            name: s.to_string(),
        })
    }
}

impl fmt::Display for Palette {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{CSI}{PALETTE_FG_PREFIX}{}m", self.0)
    }
}

impl From<Palette> for EscapeSequence {
    fn from(entry: Palette) -> EscapeSequence {
        entry.sequence()
    }
}

/// Looks up a symbolic name within a category and returns its sequence.
///
/// Names are matched case insensitively. Cursor names produce their
/// sequences with default arguments: a move of one cell for `UP`, `DOWN`,
/// `FORWARD` and `BACK`, and the home position for `POS`.
pub fn lookup(category: Category, name: &str) -> Result<EscapeSequence> {
    let unknown = || Error::UnknownName { category, name: name.to_string() };
    match category {
        Category::Palette => Ok(name.parse::<Palette>()?.sequence()),
        Category::Fore => {
            name.parse::<Fore>().map(Fore::sequence).map_err(|_| unknown())
        }
        Category::Back => {
            name.parse::<Back>().map(Back::sequence).map_err(|_| unknown())
        }
        Category::Style => name
            .parse::<StyleCode>()
            .map(StyleCode::sequence)
            .map_err(|_| unknown()),
        Category::Cursor => match &*name.to_ascii_uppercase() {
            "UP" => Ok(cursor_move(Direction::Up, 1)),
            "DOWN" => Ok(cursor_move(Direction::Down, 1)),
            "FORWARD" => Ok(cursor_move(Direction::Forward, 1)),
            "BACK" => Ok(cursor_move(Direction::Back, 1)),
            "POS" => Ok(cursor_position(1, 1)),
            _ => Err(unknown()),
        },
    }
}

/// Returns every name defined for a category.
pub fn names(category: Category) -> Vec<&'static str> {
    match category {
        Category::Palette => PALETTE_NAMES.to_vec(),
        Category::Fore => Fore::iter().map(Fore::name).collect(),
        Category::Back => Back::iter().map(Back::name).collect(),
        Category::Style => StyleCode::iter().map(StyleCode::name).collect(),
        Category::Cursor => vec!["UP", "DOWN", "FORWARD", "BACK", "POS"],
    }
}

/// Names of the xterm 256-color palette, by index.
#[rustfmt::skip]
pub static PALETTE_NAMES: [&str; 256] = [
    "BLACK", "MAROON", "GREEN", "OLIVE", "NAVY", "PURPLE", "TEAL", "SILVER",
    "GREY", "RED", "LIME", "YELLOW", "BLUE", "FUCHSIA", "AQUA", "WHITE",
    "GREY0", "NAVYBLUE", "DARKBLUE", "BLUE3", "BLUE4", "BLUE1", "DARKGREEN",
    "DEEPSKYBLUE4", "DEEPSKYBLUE5", "DEEPSKYBLUE6", "DODGERBLUE3",
    "DODGERBLUE2", "GREEN4", "SPRINGGREEN4", "TURQUOISE4", "DEEPSKYBLUE3",
    "DEEPSKYBLUE7", "DODGERBLUE1", "GREEN3", "SPRINGGREEN3", "DARKCYAN",
    "LIGHTSEAGREEN", "DEEPSKYBLUE2", "DEEPSKYBLUE1", "GREEN5", "SPRINGGREEN5",
    "SPRINGGREEN2", "CYAN3", "DARKTURQUOISE", "TURQUOISE2", "GREEN1",
    "SPRINGGREEN6", "SPRINGGREEN1", "MEDIUMSPRINGGREEN", "CYAN2", "CYAN1",
    "DARKRED", "DEEPPINK4", "PURPLE4", "PURPLE5", "PURPLE3", "BLUEVIOLET",
    "ORANGE4", "GREY37", "MEDIUMPURPLE4", "SLATEBLUE3", "SLATEBLUE4",
    "ROYALBLUE1", "CHARTREUSE4", "DARKSEAGREEN4", "PALETURQUOISE4",
    "STEELBLUE", "STEELBLUE3", "CORNFLOWERBLUE", "CHARTREUSE3",
    "DARKSEAGREEN5", "CADETBLUE", "CADETBLUE2", "SKYBLUE3", "STEELBLUE1",
    "CHARTREUSE5", "PALEGREEN3", "SEAGREEN3", "AQUAMARINE3",
    "MEDIUMTURQUOISE", "STEELBLUE2", "CHARTREUSE2", "SEAGREEN2", "SEAGREEN1",
    "SEAGREEN4", "AQUAMARINE1", "DARKSLATEGRAY2", "DARKRED2", "DEEPPINK5",
    "DARKMAGENTA", "DARKMAGENTA2", "DARKVIOLET", "PURPLE2", "ORANGE5",
    "LIGHTPINK4", "PLUM4", "MEDIUMPURPLE3", "MEDIUMPURPLE5", "SLATEBLUE1",
    "YELLOW4", "WHEAT4", "GREY53", "LIGHTSLATEGREY", "MEDIUMPURPLE",
    "LIGHTSLATEBLUE", "YELLOW5", "DARKOLIVEGREEN3", "DARKSEAGREEN",
    "LIGHTSKYBLUE3", "LIGHTSKYBLUE4", "SKYBLUE2", "CHARTREUSE6",
    "DARKOLIVEGREEN4", "PALEGREEN4", "DARKSEAGREEN3", "DARKSLATEGRAY3",
    "SKYBLUE1", "CHARTREUSE1", "LIGHTGREEN", "LIGHTGREEN2", "PALEGREEN1",
    "AQUAMARINE2", "DARKSLATEGRAY1", "RED3", "DEEPPINK6", "MEDIUMVIOLETRED",
    "MAGENTA3", "DARKVIOLET2", "PURPLE6", "DARKORANGE3", "INDIANRED",
    "HOTPINK3", "MEDIUMORCHID3", "MEDIUMORCHID", "MEDIUMPURPLE2",
    "DARKGOLDENROD", "LIGHTSALMON3", "ROSYBROWN", "GREY63", "MEDIUMPURPLE6",
    "MEDIUMPURPLE1", "GOLD3", "DARKKHAKI", "NAVAJOWHITE3", "GREY69",
    "LIGHTSTEELBLUE3", "LIGHTSTEELBLUE", "YELLOW3", "DARKOLIVEGREEN5",
    "DARKSEAGREEN6", "DARKSEAGREEN2", "LIGHTCYAN3", "LIGHTSKYBLUE1",
    "GREENYELLOW", "DARKOLIVEGREEN2", "PALEGREEN2", "DARKSEAGREEN7",
    "DARKSEAGREEN1", "PALETURQUOISE1", "RED4", "DEEPPINK3", "DEEPPINK7",
    "MAGENTA4", "MAGENTA5", "MAGENTA2", "DARKORANGE4", "INDIANRED2",
    "HOTPINK4", "HOTPINK2", "ORCHID", "MEDIUMORCHID1", "ORANGE3",
    "LIGHTSALMON4", "LIGHTPINK3", "PINK3", "PLUM3", "VIOLET", "GOLD4",
    "LIGHTGOLDENROD3", "TAN", "MISTYROSE3", "THISTLE3", "PLUM2", "YELLOW6",
    "KHAKI3", "LIGHTGOLDENROD2", "LIGHTYELLOW3", "GREY84", "LIGHTSTEELBLUE1",
    "YELLOW2", "DARKOLIVEGREEN1", "DARKOLIVEGREEN6", "DARKSEAGREEN8",
    "HONEYDEW2", "LIGHTCYAN1", "RED1", "DEEPPINK2", "DEEPPINK1", "DEEPPINK8",
    "MAGENTA6", "MAGENTA1", "ORANGERED1", "INDIANRED1", "INDIANRED3",
    "HOTPINK", "HOTPINK5", "MEDIUMORCHID2", "DARKORANGE", "SALMON1",
    "LIGHTCORAL", "PALEVIOLETRED1", "ORCHID2", "ORCHID1", "ORANGE1",
    "SANDYBROWN", "LIGHTSALMON1", "LIGHTPINK1", "PINK1", "PLUM1", "GOLD1",
    "LIGHTGOLDENROD4", "LIGHTGOLDENROD5", "NAVAJOWHITE1", "MISTYROSE1",
    "THISTLE1", "YELLOW1", "LIGHTGOLDENROD1", "KHAKI1", "WHEAT1", "CORNSILK1",
    "GREY100", "GREY3", "GREY7", "GREY11", "GREY15", "GREY19", "GREY23",
    "GREY27", "GREY30", "GREY35", "GREY39", "GREY42", "GREY46", "GREY50",
    "GREY54", "GREY58", "GREY62", "GREY66", "GREY70", "GREY74", "GREY78",
    "GREY82", "GREY85", "GREY89", "GREY93",
];

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    #[test_case(Category::Fore, "red", "\x1B[31m")]
    #[test_case(Category::Fore, "RESET", "\x1B[39m")]
    #[test_case(Category::Fore, "lightwhite_ex", "\x1B[97m")]
    #[test_case(Category::Back, "BLUE", "\x1B[44m")]
    #[test_case(Category::Back, "RESET", "\x1B[49m")]
    #[test_case(Category::Back, "LIGHTBLACK_EX", "\x1B[100m")]
    #[test_case(Category::Style, "BRIGHT", "\x1B[1m")]
    #[test_case(Category::Style, "dim", "\x1B[2m")]
    #[test_case(Category::Style, "NORMAL", "\x1B[22m")]
    #[test_case(Category::Style, "RESET_ALL", "\x1B[0m")]
    #[test_case(Category::Palette, "MAROON", "\x1B[38;5;1m")]
    #[test_case(Category::Palette, "grey93", "\x1B[38;5;255m")]
    #[test_case(Category::Palette, "208", "\x1B[38;5;208m")]
    #[test_case(Category::Cursor, "up", "\x1B[1A")]
    #[test_case(Category::Cursor, "POS", "\x1B[1;1H")]
    fn lookup_known_names(category: Category, name: &str, expected: &str) {
        assert_eq!(lookup(category, name).unwrap().as_str(), expected);
    }

    #[test]
    fn lookup_unknown_name_fails() {
        let err = lookup(Category::Fore, "PUCE").unwrap_err();
        assert!(matches!(
            err,
            Error::UnknownName { category: Category::Fore, ref name }
                if name == "PUCE"
        ));
        assert!(lookup(Category::Style, "BLINK").is_err());
        assert!(lookup(Category::Palette, "256").is_err());
    }

    #[test_case("+5")]
    #[test_case("007")]
    #[test_case("00")]
    #[test_case("-1")]
    #[test_case(" 5")]
    #[test_case("")]
    fn palette_index_must_be_plain_decimal(given: &str) {
        assert!(given.parse::<Palette>().is_err());
    }

    #[test]
    fn palette_index_bounds() {
        assert_eq!("0".parse::<Palette>().unwrap().index(), 0);
        assert_eq!("255".parse::<Palette>().unwrap().index(), 255);
        assert_eq!("10".parse::<Palette>().unwrap().index(), 10);
    }

    #[test]
    fn every_sgr_name_matches_grammar() {
        for category in [
            Category::Palette,
            Category::Fore,
            Category::Back,
            Category::Style,
        ] {
            for name in names(category) {
                let seq = lookup(category, name).unwrap();
                let body = seq
                    .as_str()
                    .strip_prefix(CSI)
                    .and_then(|s| s.strip_suffix('m'))
                    .unwrap_or_else(|| panic!("bad sequence for {name}"));
                assert!(
                    body.split(';').all(|p| p.parse::<u8>().is_ok()),
                    "bad parameters {body:?} for {name}"
                );
            }
        }
    }

    #[test]
    fn palette_names_are_unique() {
        for (i, name) in PALETTE_NAMES.iter().enumerate() {
            let parsed: Palette = name.parse().unwrap();
            assert_eq!(usize::from(parsed.index()), i, "{name}");
        }
    }

    #[test]
    fn color_code_ranges() {
        assert!(ColorCode::new(CodeKind::Foreground, 38).is_none());
        assert!(ColorCode::new(CodeKind::Background, 48).is_none());
        assert!(ColorCode::new(CodeKind::Attribute, 3).is_none());
        let code = ColorCode::new(CodeKind::Palette, 17).unwrap();
        assert_eq!(code.to_string(), "38;5;17");
        let code = ColorCode::new(CodeKind::Foreground, 91).unwrap();
        assert_eq!(code.to_string(), "91");
    }

    #[test]
    fn display_renders_sequences() {
        assert_eq!(format!("{}text", Fore::Green), "\x1B[32mtext");
        assert_eq!(Palette::new(9).to_string(), "\x1B[38;5;9m");
        assert_eq!(Back::LightRed.name(), "LIGHTRED_EX");
        assert_eq!(StyleCode::ResetAll.name(), "RESET_ALL");
    }

    #[test]
    fn category_parses_aliases() {
        assert_eq!("SGR".parse::<Category>().unwrap(), Category::Palette);
        assert_eq!("foreground".parse::<Category>().unwrap(), Category::Fore);
        assert_eq!(Category::Back.to_string(), "back");
        assert!(matches!(
            "colour".parse::<Category>(),
            Err(Error::UnknownCategory(_))
        ));
    }
}
