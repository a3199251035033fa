use crate::Style;
use std::io;

/// This trait describes the behavior of writers that support styled output.
pub trait WriteColor: io::Write {
    /// Returns true if and only if the underlying writer supports colors.
    fn supports_color(&self) -> bool;

    /// Set the style of the writer.
    ///
    /// The writer is fully reset first, then each attribute of `style` is
    /// applied. Subsequent writes use this style until either `reset` is
    /// called or a new style is set.
    ///
    /// If there was a problem setting the style, then an error is returned.
    fn set_color(&mut self, style: &Style) -> io::Result<()>;

    /// Reset the current style to the terminal's defaults.
    ///
    /// If there was a problem resetting the style, then an error is
    /// returned.
    fn reset(&mut self) -> io::Result<()>;

    /// Returns true if and only if the underlying writer must synchronously
    /// interact with an end user's device in order to control colors. By
    /// default, this always returns `false`.
    ///
    /// In particular, this returns true when escape sequences are being
    /// translated into native console calls.
    fn is_synchronous(&self) -> bool {
        false
    }
}

impl<T: ?Sized + WriteColor> WriteColor for &mut T {
    fn supports_color(&self) -> bool {
        (**self).supports_color()
    }
    fn set_color(&mut self, style: &Style) -> io::Result<()> {
        (**self).set_color(style)
    }
    fn reset(&mut self) -> io::Result<()> {
        (**self).reset()
    }
    fn is_synchronous(&self) -> bool {
        (**self).is_synchronous()
    }
}

impl<T: ?Sized + WriteColor> WriteColor for Box<T> {
    fn supports_color(&self) -> bool {
        (**self).supports_color()
    }
    fn set_color(&mut self, style: &Style) -> io::Result<()> {
        (**self).set_color(style)
    }
    fn reset(&mut self) -> io::Result<()> {
        (**self).reset()
    }
    fn is_synchronous(&self) -> bool {
        (**self).is_synchronous()
    }
}

impl WriteColor for io::Sink {
    fn supports_color(&self) -> bool {
        false
    }

    fn set_color(&mut self, _: &Style) -> io::Result<()> {
        Ok(())
    }

    fn reset(&mut self) -> io::Result<()> {
        Ok(())
    }
}
