use std::cell::RefCell;
use std::io::{self, IsTerminal, Write};
use std::sync::OnceLock;

use parking_lot::{ReentrantMutex, ReentrantMutexGuard};

use crate::codes::EscapeSequence;
use crate::console::{NativeConsole, NoConsole, PlatformConsole, StdStream};
use crate::scanner::{Command, Event, Scanner};
use crate::state::StyleState;
use crate::types::{ColorChoice, Style};
use crate::WriteColor;

#[cfg(windows)]
use crate::console::PlatformConsole as WinConsole;

/// How a wrapper delivers the sequences written through it.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum StreamMode {
    /// Every byte reaches the inner writer unchanged.
    PassThrough,
    /// Recognized sequences are removed. Text and anything unrecognized
    /// still reach the inner writer.
    Strip,
    /// Recognized sequences are replaced with native console calls.
    Translate,
}

#[derive(Debug)]
enum Target<C> {
    PassThrough,
    Strip,
    Translate(C),
}

/// An `io::Write` adapter that understands the escape sequences written
/// through it.
///
/// Every write is scanned, even in pass-through mode, so the wrapper always
/// knows which style is in effect. Sequences may be split across writes.
/// Anything the wrapper does not translate, including malformed sequences,
/// is written to the inner writer verbatim.
///
/// Problems talking to the native console are logged and ignored. Only
/// errors from the inner writer are returned.
///
/// A `WrappedStream` has no internal locking. Callers sharing one between
/// threads must serialize writes themselves, otherwise a sequence split
/// across two writes may interleave with another thread's output.
///
/// On drop, any unfinished sequence is written out raw and, if a style is
/// still in effect, a full reset is emitted.
#[derive(Debug)]
pub struct WrappedStream<W: io::Write, C: NativeConsole = NoConsole> {
    wtr: W,
    target: Target<C>,
    scanner: Scanner,
    state: StyleState,
    autoreset: bool,
}

impl<W: io::Write> WrappedStream<W, NoConsole> {
    /// Create a wrapper that writes every byte through unchanged.
    pub fn passthrough(wtr: W) -> WrappedStream<W, NoConsole> {
        WrappedStream::with_target(wtr, Target::PassThrough)
    }

    /// Create a wrapper that removes recognized sequences.
    pub fn strip(wtr: W) -> WrappedStream<W, NoConsole> {
        WrappedStream::with_target(wtr, Target::Strip)
    }
}

impl<W: io::Write, C: NativeConsole> WrappedStream<W, C> {
    /// Create a wrapper that translates recognized sequences into calls on
    /// `console`.
    pub fn translate(wtr: W, console: C) -> WrappedStream<W, C> {
        WrappedStream::with_target(wtr, Target::Translate(console))
    }

    fn with_target(wtr: W, target: Target<C>) -> WrappedStream<W, C> {
        WrappedStream {
            wtr,
            target,
            scanner: Scanner::new(),
            state: StyleState::default(),
            autoreset: false,
        }
    }

    /// When enabled, a full reset is emitted after every newline written
    /// while a style is in effect. Takes effect on the next write.
    pub fn set_autoreset(&mut self, yes: bool) -> &mut WrappedStream<W, C> {
        self.autoreset = yes;
        self
    }

    pub fn autoreset(&self) -> bool {
        self.autoreset
    }

    pub fn mode(&self) -> StreamMode {
        match self.target {
            Target::PassThrough => StreamMode::PassThrough,
            Target::Strip => StreamMode::Strip,
            Target::Translate(_) => StreamMode::Translate,
        }
    }

    /// The style currently in effect, as seen through this wrapper.
    pub fn style(&self) -> &StyleState {
        &self.state
    }

    /// Return a reference to the inner writer.
    pub fn get_ref(&self) -> &W {
        &self.wtr
    }

    /// Return a mutable reference to the inner writer.
    ///
    /// Bytes written directly to it bypass the wrapper's style tracking.
    pub fn get_mut(&mut self) -> &mut W {
        &mut self.wtr
    }

    /// Return the console used for translation, if any.
    pub fn console(&self) -> Option<&C> {
        match self.target {
            Target::Translate(ref console) => Some(console),
            _ => None,
        }
    }

    /// Writes out any unfinished sequence raw, resets the style if one is in
    /// effect and flushes.
    pub fn release(&mut self) -> io::Result<()> {
        let pending = self.scanner.take_pending();
        if !pending.is_empty() {
            self.wtr.write_all(&pending)?;
        }
        if !self.state.is_reset() {
            Output::from(&mut *self).reset_style()?;
        }
        self.wtr.flush()
    }
}

/// The pieces of a wrapper the scanner's events act on. Borrowed apart from
/// the scanner itself so both can be used at once.
struct Output<'a, W, C> {
    wtr: &'a mut W,
    target: &'a mut Target<C>,
    state: &'a mut StyleState,
    autoreset: bool,
}

impl<'a, W: io::Write, C: NativeConsole> From<&'a mut WrappedStream<W, C>>
    for Output<'a, W, C>
{
    fn from(stream: &'a mut WrappedStream<W, C>) -> Output<'a, W, C> {
        Output {
            wtr: &mut stream.wtr,
            target: &mut stream.target,
            state: &mut stream.state,
            autoreset: stream.autoreset,
        }
    }
}

impl<W: io::Write, C: NativeConsole> Output<'_, W, C> {
    fn handle(&mut self, event: Event<'_>) -> io::Result<()> {
        match event {
            Event::Text(text) => self.text(text),
            Event::Malformed(raw) => self.wtr.write_all(raw),
            Event::Sequence { command: None, raw } => self.wtr.write_all(raw),
            Event::Sequence { command: Some(command), raw } => {
                if let Command::Sgr(ref params) = command {
                    self.state.apply_sgr(params);
                }
                match *self.target {
                    Target::PassThrough => self.wtr.write_all(raw),
                    Target::Strip => Ok(()),
                    Target::Translate(_) => self.native(&command),
                }
            }
        }
    }

    fn text(&mut self, text: &[u8]) -> io::Result<()> {
        if !self.autoreset {
            return self.wtr.write_all(text);
        }
        for line in text.split_inclusive(|&b| b == b'\n') {
            self.wtr.write_all(line)?;
            if line.ends_with(b"\n") && !self.state.is_reset() {
                self.reset_style()?;
            }
        }
        Ok(())
    }

    fn reset_style(&mut self) -> io::Result<()> {
        self.state.clear();
        match *self.target {
            Target::PassThrough => {
                self.wtr.write_all(EscapeSequence::reset_all().as_bytes())
            }
            Target::Strip => Ok(()),
            Target::Translate(_) => self.native(&Command::Sgr(vec![0])),
        }
    }

    /// Performs `command` on the console. The inner writer is flushed first
    /// so pending text is drawn with the attributes it was written under.
    fn native(&mut self, command: &Command) -> io::Result<()> {
        let Target::Translate(ref mut console) = *self.target else {
            return Ok(());
        };
        self.wtr.flush()?;
        let result = match *command {
            Command::Sgr(_) => console.set_style(&*self.state),
            Command::CursorMove(direction, n) => console.move_cursor(direction, n),
            Command::CursorPosition { row, col } => {
                console.set_cursor_position(row, col)
            }
            Command::ClearScreen(mode) => console.clear_screen(mode),
            Command::ClearLine(mode) => console.clear_line(mode),
            Command::SetTitle(ref title) => console.set_title(title),
        };
        if let Err(err) = result {
            tracing::debug!(?command, %err, "ignoring failed console operation");
        }
        Ok(())
    }
}

impl<W: io::Write, C: NativeConsole> io::Write for WrappedStream<W, C> {
    /// Scans and writes all of `buf`.
    ///
    /// If the inner writer fails, scanning stops at the piece that failed.
    /// Sequences before it have been applied to the style, the rest of `buf`
    /// has neither been written nor applied.
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut out = Output {
            wtr: &mut self.wtr,
            target: &mut self.target,
            state: &mut self.state,
            autoreset: self.autoreset,
        };
        self.scanner.feed(buf, |event| out.handle(event))?;
        Ok(buf.len())
    }

    /// Flushes the inner writer. An unfinished sequence stays buffered until
    /// the write that completes it.
    fn flush(&mut self) -> io::Result<()> {
        self.wtr.flush()
    }
}

impl<W: io::Write, C: NativeConsole> WriteColor for WrappedStream<W, C> {
    fn supports_color(&self) -> bool {
        self.mode() != StreamMode::Strip
    }

    fn set_color(&mut self, style: &Style) -> io::Result<()> {
        self.write_all(style.sequence().as_bytes())
    }

    fn reset(&mut self) -> io::Result<()> {
        self.write_all(EscapeSequence::reset_all().as_bytes())
    }

    fn is_synchronous(&self) -> bool {
        self.mode() == StreamMode::Translate
    }
}

impl<W: io::Write, C: NativeConsole> Drop for WrappedStream<W, C> {
    fn drop(&mut self) {
        if let Err(err) = self.release() {
            tracing::debug!(%err, "failed to release wrapped stream");
        }
    }
}

/// `std::io` implements `Stdout` and `Stderr` as separate types, which makes
/// it difficult to abstract over them. We use a simple internal enum type to
/// work around this.
#[derive(Debug)]
pub struct IoStandardStream(IoStandardStreamInner);

#[derive(Debug)]
enum IoStandardStreamInner {
    Stdout(io::Stdout),
    Stderr(io::Stderr),
}

impl IoStandardStream {
    fn new(sty: StdStream) -> IoStandardStream {
        IoStandardStream(match sty {
            StdStream::Stdout => IoStandardStreamInner::Stdout(io::stdout()),
            StdStream::Stderr => IoStandardStreamInner::Stderr(io::stderr()),
        })
    }

    fn is_terminal(&self) -> bool {
        match self.0 {
            IoStandardStreamInner::Stdout(ref s) => s.is_terminal(),
            IoStandardStreamInner::Stderr(ref s) => s.is_terminal(),
        }
    }
}

impl io::Write for IoStandardStream {
    #[inline(always)]
    fn write(&mut self, b: &[u8]) -> io::Result<usize> {
        match self.0 {
            IoStandardStreamInner::Stdout(ref mut s) => s.write(b),
            IoStandardStreamInner::Stderr(ref mut s) => s.write(b),
        }
    }

    #[inline(always)]
    fn flush(&mut self) -> io::Result<()> {
        match self.0 {
            IoStandardStreamInner::Stdout(ref mut s) => s.flush(),
            IoStandardStreamInner::Stderr(ref mut s) => s.flush(),
        }
    }
}

/// Options for wrapping the standard streams.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct WrapOptions {
    autoreset: bool,
    convert: Option<bool>,
    strip: Option<bool>,
    choice: ColorChoice,
}

impl WrapOptions {
    pub fn new() -> WrapOptions {
        WrapOptions::default()
    }

    /// Emit a full reset after every newline written while styled.
    pub fn autoreset(mut self, yes: bool) -> WrapOptions {
        self.autoreset = yes;
        self
    }

    /// Force translation through the native console on or off. By default
    /// it is used only where the console cannot interpret ANSI itself.
    pub fn convert(mut self, yes: bool) -> WrapOptions {
        self.convert = Some(yes);
        self
    }

    /// Force stripping on or off. By default sequences are stripped when
    /// the color choice says not to emit colors.
    pub fn strip(mut self, yes: bool) -> WrapOptions {
        self.strip = Some(yes);
        self
    }

    pub fn choice(mut self, choice: ColorChoice) -> WrapOptions {
        self.choice = choice;
        self
    }
}

type StandardWrapped = WrappedStream<IoStandardStream, PlatformConsole>;

/// A wrapped standard stream. The lock is reentrant so that a thread holding
/// a `StandardStreamLock` can still call `stdout()`, `init()` or `deinit()`.
/// The `RefCell` is only borrowed for the duration of a single operation.
type Slot = ReentrantMutex<RefCell<StandardWrapped>>;

static STDOUT: OnceLock<Slot> = OnceLock::new();
static STDERR: OnceLock<Slot> = OnceLock::new();

fn slot(sty: StdStream) -> &'static OnceLock<Slot> {
    match sty {
        StdStream::Stdout => &STDOUT,
        StdStream::Stderr => &STDERR,
    }
}

fn create(sty: StdStream, options: &WrapOptions) -> StandardWrapped {
    let wtr = IoStandardStream::new(sty);
    let strip = options
        .strip
        .unwrap_or_else(|| !options.choice.should_attempt_color(wtr.is_terminal()));
    let target = if strip { Target::Strip } else { console_target(sty, options) };
    let mut stream = WrappedStream::with_target(wtr, target);
    stream.set_autoreset(options.autoreset);
    tracing::debug!(stream = ?sty, mode = ?stream.mode(), "wrapped standard stream");
    stream
}

#[cfg(not(windows))]
fn console_target(
    _sty: StdStream,
    options: &WrapOptions,
) -> Target<PlatformConsole> {
    if options.convert == Some(true) {
        Target::Translate(NoConsole)
    } else {
        Target::PassThrough
    }
}

#[cfg(windows)]
fn console_target(
    sty: StdStream,
    options: &WrapOptions,
) -> Target<PlatformConsole> {
    if options.convert == Some(false) || options.choice == ColorChoice::AlwaysAnsi
    {
        return Target::PassThrough;
    }
    let mut con = match WinConsole::open(sty) {
        Ok(con) => con,
        // Not attached to a console, e.g. redirected to a file or pipe.
        Err(_) => return Target::PassThrough,
    };
    if options.convert == Some(true) {
        return Target::Translate(con);
    }
    let enabled_virtual = con.enable_virtual_terminal().is_ok();
    tracing::debug!(stream = ?sty, enabled_virtual, "probed console");
    if enabled_virtual || options.choice.should_force_ansi() {
        Target::PassThrough
    } else {
        Target::Translate(con)
    }
}

fn lock(sty: StdStream, options: &WrapOptions) -> StandardStreamLock<'static> {
    let wtr = slot(sty)
        .get_or_init(|| ReentrantMutex::new(RefCell::new(create(sty, options))))
        .lock();
    StandardStreamLock { wtr }
}

/// Wraps standard output and standard error.
///
/// Each stream is wrapped at most once per process. Later calls never wrap
/// again; they only apply the `autoreset` setting to the existing wrappers.
///
/// The returned guard calls [`deinit`] when dropped, which makes it easy to
/// scope styled output to a block.
pub fn init(options: WrapOptions) -> InitGuard {
    for sty in [StdStream::Stdout, StdStream::Stderr] {
        lock(sty, &options).set_autoreset(options.autoreset);
    }
    InitGuard { _priv: () }
}

/// Makes escape sequences written to the standard streams work, without any
/// other behavior change: no stripping and no automatic resets.
///
/// On Windows this enables virtual terminal processing where possible and
/// falls back to translation otherwise. Elsewhere the streams pass through.
/// Calling this more than once is harmless. Returns the modes in effect for
/// standard output and standard error.
pub fn just_fix_console() -> (StreamMode, StreamMode) {
    let options = WrapOptions::new().strip(false);
    (lock(StdStream::Stdout, &options).mode(), lock(StdStream::Stderr, &options).mode())
}

/// Resets any style left on the wrapped standard streams and flushes them.
///
/// Streams that were never wrapped are left alone.
pub fn deinit() {
    for sty in [StdStream::Stdout, StdStream::Stderr] {
        let Some(stream) = slot(sty).get() else {
            continue;
        };
        let stream = StandardStreamLock { wtr: stream.lock() };
        if let Err(err) = stream.with(StandardWrapped::release) {
            tracing::debug!(stream = ?sty, %err, "failed to release standard stream");
        }
    }
}

/// Calls [`deinit`] when dropped.
#[derive(Debug)]
#[must_use = "dropping the guard immediately resets the standard streams"]
pub struct InitGuard {
    _priv: (),
}

impl Drop for InitGuard {
    fn drop(&mut self) {
        deinit();
    }
}

/// Returns a locked handle to the wrapped standard output, wrapping it with
/// default options first if nothing has yet.
pub fn stdout() -> StandardStreamLock<'static> {
    lock(StdStream::Stdout, &WrapOptions::default())
}

/// Returns a locked handle to the wrapped standard error, wrapping it with
/// default options first if nothing has yet.
pub fn stderr() -> StandardStreamLock<'static> {
    lock(StdStream::Stderr, &WrapOptions::default())
}

/// `StandardStreamLock` is a locked reference to a wrapped standard stream.
///
/// This implements the `io::Write` and `WriteColor` traits. Holding it
/// blocks other threads from writing through the same wrapper, so a
/// sequence cannot be torn apart by concurrent writes. The lock is
/// reentrant: the thread holding it may take it again, for example by
/// calling [`stdout`] or [`init`] while a handle is alive.
#[derive(Debug)]
pub struct StandardStreamLock<'a> {
    wtr: ReentrantMutexGuard<'a, RefCell<StandardWrapped>>,
}

impl StandardStreamLock<'_> {
    /// Runs `f` on the wrapper. Fails only when called from within another
    /// operation on the same stream, e.g. from a logger invoked mid-write.
    fn with<R>(
        &self,
        f: impl FnOnce(&mut StandardWrapped) -> io::Result<R>,
    ) -> io::Result<R> {
        let mut stream = self.wtr.try_borrow_mut().map_err(|_| {
            io::Error::new(
                io::ErrorKind::WouldBlock,
                "standard stream is already in use on this thread",
            )
        })?;
        f(&mut *stream)
    }

    pub fn mode(&self) -> StreamMode {
        self.wtr.borrow().mode()
    }

    pub fn style(&self) -> StyleState {
        *self.wtr.borrow().style()
    }

    pub fn autoreset(&self) -> bool {
        self.wtr.borrow().autoreset()
    }

    pub fn set_autoreset(&mut self, yes: bool) {
        let updated = self.with(|w| {
            w.set_autoreset(yes);
            Ok(())
        });
        if let Err(err) = updated {
            tracing::debug!(%err, "failed to update autoreset");
        }
    }
}

impl io::Write for StandardStreamLock<'_> {
    #[inline]
    fn write(&mut self, b: &[u8]) -> io::Result<usize> {
        self.with(|w| w.write(b))
    }

    #[inline]
    fn flush(&mut self) -> io::Result<()> {
        self.with(|w| w.flush())
    }
}

impl WriteColor for StandardStreamLock<'_> {
    #[inline]
    fn supports_color(&self) -> bool {
        self.mode() != StreamMode::Strip
    }

    #[inline]
    fn set_color(&mut self, style: &Style) -> io::Result<()> {
        self.with(|w| w.set_color(style))
    }

    #[inline]
    fn reset(&mut self) -> io::Result<()> {
        self.with(|w| w.reset())
    }

    #[inline]
    fn is_synchronous(&self) -> bool {
        self.mode() == StreamMode::Translate
    }
}
