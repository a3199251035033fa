//! Styling scoped to a block.
//!
//! [`StyleScope`] writes a style when it is entered and a full reset when it
//! is left, whether the block finishes normally, returns early through `?`
//! or panics.
//!
//! Scopes do not nest. Leaving an inner scope emits a full reset, not the
//! outer scope's style, so the outer style is lost for the rest of the
//! outer block:
//!
//! ```
//! use std::io::Write;
//! use colorshim::{Back, Fore, StyleScope, WrappedStream};
//!
//! let mut out = vec![];
//! {
//!     let mut w = WrappedStream::passthrough(&mut out);
//!     let mut outer = StyleScope::enter(&mut w, &Back::Blue.into()).unwrap();
//!     {
//!         let mut inner =
//!             StyleScope::enter(&mut *outer, &Fore::Red.into()).unwrap();
//!         write!(inner, "red on blue").unwrap();
//!     }
//!     // The blue background is gone here.
//!     write!(outer, "plain").unwrap();
//! }
//! assert!(out.ends_with(b"\x1B[0mplain\x1B[0m"));
//! ```

use std::io;
use std::ops::{Deref, DerefMut};

use crate::codes::EscapeSequence;

/// Applies a style for as long as it is alive.
#[derive(Debug)]
#[must_use = "the style is reset as soon as the scope is dropped"]
pub struct StyleScope<'a, W: io::Write + ?Sized> {
    wtr: &'a mut W,
    exited: bool,
}

impl<'a, W: io::Write + ?Sized> StyleScope<'a, W> {
    /// Writes `style` to `wtr` and returns a guard that resets it.
    pub fn enter(
        wtr: &'a mut W,
        style: &EscapeSequence,
    ) -> io::Result<StyleScope<'a, W>> {
        wtr.write_all(style.as_bytes())?;
        Ok(StyleScope { wtr, exited: false })
    }

    /// Writes the full reset now and reports any error doing so. Dropping
    /// the scope does the same but has to ignore errors.
    pub fn exit(mut self) -> io::Result<()> {
        self.exited = true;
        self.write_reset()
    }

    fn write_reset(&mut self) -> io::Result<()> {
        self.wtr.write_all(EscapeSequence::reset_all().as_bytes())?;
        self.wtr.flush()
    }
}

impl<W: io::Write + ?Sized> Deref for StyleScope<'_, W> {
    type Target = W;

    fn deref(&self) -> &W {
        self.wtr
    }
}

impl<W: io::Write + ?Sized> DerefMut for StyleScope<'_, W> {
    fn deref_mut(&mut self) -> &mut W {
        self.wtr
    }
}

impl<W: io::Write + ?Sized> io::Write for StyleScope<'_, W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.wtr.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.wtr.flush()
    }
}

impl<W: io::Write + ?Sized> Drop for StyleScope<'_, W> {
    fn drop(&mut self) {
        if self.exited {
            return;
        }
        if let Err(err) = self.write_reset() {
            tracing::debug!(%err, "failed to reset style on scope exit");
        }
    }
}

/// Runs `f` with `style` applied to `wtr`, then writes a full reset.
///
/// The reset is written even if `f` panics. The value returned by `f` is
/// passed through once the reset has been written.
pub fn with_style<W, F, R>(
    wtr: &mut W,
    style: &EscapeSequence,
    f: F,
) -> io::Result<R>
where
    W: io::Write + ?Sized,
    F: FnOnce(&mut W) -> R,
{
    let mut scope = StyleScope::enter(wtr, style)?;
    let result = f(&mut *scope);
    scope.exit()?;
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codes::Fore;
    use crate::writers::WrappedStream;
    use pretty_assertions::assert_eq;
    use std::io::Write;
    use std::panic::{AssertUnwindSafe, catch_unwind};

    #[test]
    fn enter_and_exit() {
        let mut out = vec![];
        let scope = StyleScope::enter(&mut out, &Fore::Green.into()).unwrap();
        scope.exit().unwrap();
        assert_eq!(out, b"\x1B[32m\x1B[0m".to_vec());
    }

    #[test]
    fn drop_resets_on_early_return() {
        fn styled(out: &mut Vec<u8>) -> io::Result<()> {
            let mut scope = StyleScope::enter(out, &Fore::Red.into())?;
            write!(scope, "x")?;
            Err(io::Error::other("bail"))
        }
        let mut out = vec![];
        assert!(styled(&mut out).is_err());
        assert_eq!(out, b"\x1B[31mx\x1B[0m".to_vec());
    }

    #[test]
    fn with_style_returns_closure_value() {
        let mut out = vec![];
        let n = with_style(&mut out, &Fore::Blue.into(), |w| {
            w.write_all(b"hi").map(|()| 2)
        })
        .unwrap()
        .unwrap();
        assert_eq!(n, 2);
        assert_eq!(out, b"\x1B[34mhi\x1B[0m".to_vec());
    }

    #[test]
    fn state_is_reset_after_panic() {
        let mut w = WrappedStream::passthrough(vec![]);
        let result = catch_unwind(AssertUnwindSafe(|| {
            with_style(&mut w, &Fore::Red.into(), |w| {
                assert_eq!(w.style().fg(), Some(crate::Color::Red));
                panic!("boom");
            })
        }));
        assert!(result.is_err());
        assert!(w.style().is_reset());
        assert_eq!(w.get_ref().as_slice(), b"\x1B[31m\x1B[0m");
    }
}
