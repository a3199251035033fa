use crate::types::{Brightness, Color, Style};

/// The style most recently applied through a wrapper.
///
/// It starts out reset when a stream is wrapped, follows every SGR sequence
/// written through the wrapper and returns to reset on `CSI 0 m` or when
/// the wrapper is released.
pub type StyleState = Style;

impl Style {
    /// Folds the parameters of one SGR sequence into this state.
    ///
    /// Parameters this crate does not model (italic, underline, truecolor
    /// and so on) are skipped, including the arguments of `38;2;r;g;b`.
    pub fn apply_sgr(&mut self, params: &[u16]) {
        if params.is_empty() {
            self.clear();
            return;
        }
        let mut params = params.iter().copied();
        while let Some(p) = params.next() {
            match p {
                0 => self.clear(),
                1 => self.brightness = Brightness::Bright,
                2 => self.brightness = Brightness::Dim,
                22 => self.brightness = Brightness::Normal,
                30..=37 => self.fg = basic(p - 30, false),
                39 => self.fg = None,
                90..=97 => self.fg = basic(p - 90, true),
                40..=47 => self.bg = basic(p - 40, false),
                49 => self.bg = None,
                100..=107 => self.bg = basic(p - 100, true),
                38 | 48 => {
                    let color = extended(&mut params);
                    if let Some(color) = color {
                        if p == 38 {
                            self.fg = Some(color);
                        } else {
                            self.bg = Some(color);
                        }
                    }
                }
                _ => {}
            }
        }
    }
}

fn basic(offset: u16, light: bool) -> Option<Color> {
    u8::try_from(offset).ok().and_then(|i| Color::from_index(i, light))
}

/// Consumes the arguments of an extended color selector. Only the palette
/// form (`5;n`) yields a color.
fn extended(params: &mut impl Iterator<Item = u16>) -> Option<Color> {
    match params.next()? {
        5 => params.next().and_then(|n| u8::try_from(n).ok()).map(Color::Ansi256),
        2 => {
            params.by_ref().take(3).for_each(drop);
            None
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn applied(params: &[u16]) -> StyleState {
        let mut state = StyleState::new();
        state.apply_sgr(params);
        state
    }

    #[test]
    fn basic_layers() {
        let state = applied(&[31, 104, 1]);
        assert_eq!(state.fg(), Some(Color::Red));
        assert_eq!(state.bg(), Some(Color::LightBlue));
        assert_eq!(state.brightness(), Brightness::Bright);
    }

    #[test]
    fn layer_resets() {
        let mut state = applied(&[31, 41, 2]);
        state.apply_sgr(&[39]);
        assert_eq!(state.fg(), None);
        assert_eq!(state.bg(), Some(Color::Red));
        state.apply_sgr(&[49, 22]);
        assert!(state.is_reset());
    }

    #[test]
    fn full_reset() {
        let mut state = applied(&[32, 1]);
        state.apply_sgr(&[0]);
        assert!(state.is_reset());
        let mut state = applied(&[32]);
        state.apply_sgr(&[]);
        assert!(state.is_reset());
    }

    #[test]
    fn extended_palette() {
        let state = applied(&[38, 5, 208, 48, 5, 17]);
        assert_eq!(state.fg(), Some(Color::Ansi256(208)));
        assert_eq!(state.bg(), Some(Color::Ansi256(17)));
    }

    #[test]
    fn truecolor_arguments_are_skipped() {
        let state = applied(&[38, 2, 1, 2, 3, 33]);
        assert_eq!(state.fg(), Some(Color::Yellow));
    }

    #[test]
    fn unmodeled_attributes_are_ignored() {
        assert!(applied(&[3, 4, 9]).is_reset());
    }
}
