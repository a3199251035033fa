//! Incremental recognition of escape sequences in a byte stream.
//!
//! Sequences may be split across any number of `feed` calls. The scanner
//! keeps the bytes of an unfinished sequence in an internal buffer and
//! reports them once the sequence completes or turns out to be malformed.
//! Malformed input is always handed back unchanged, so text that merely
//! looks like the start of a sequence is never lost.

use crate::sequence::{ClearMode, Direction};

const ESC: u8 = 0x1B;
const BEL: u8 = 0x07;

/// Longest CSI sequence accepted before it is treated as malformed.
const MAX_CSI_LEN: usize = 64;
/// Longest OSC sequence accepted before it is treated as malformed.
const MAX_OSC_LEN: usize = 4096;

/// The scanner's position within the escape sequence grammar.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum ScanState {
    #[default]
    Idle,
    SawEscape,
    CollectingCsi,
    CollectingOsc,
}

/// A recognized sequence that a console can act on.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Command {
    /// Select graphic rendition with the given parameters. Empty parameters
    /// are reported as `0`.
    Sgr(Vec<u16>),
    CursorMove(Direction, u16),
    /// 1-indexed row and column, exactly as written.
    CursorPosition { row: u16, col: u16 },
    ClearScreen(ClearMode),
    ClearLine(ClearMode),
    SetTitle(String),
}

/// What the scanner found in the input.
#[derive(Debug, Eq, PartialEq)]
pub enum Event<'a> {
    /// Plain text.
    Text(&'a [u8]),
    /// A complete sequence. `command` is `None` when the sequence is well
    /// formed but not one this crate translates.
    Sequence { command: Option<Command>, raw: &'a [u8] },
    /// The bytes of an aborted sequence.
    Malformed(&'a [u8]),
}

/// An incremental escape sequence scanner.
#[derive(Clone, Debug, Default)]
pub struct Scanner {
    state: ScanState,
    pending: Vec<u8>,
}

impl Scanner {
    pub fn new() -> Scanner {
        Scanner::default()
    }

    pub fn state(&self) -> ScanState {
        self.state
    }

    /// Returns the bytes of a sequence that has started but not finished.
    pub fn pending(&self) -> &[u8] {
        &self.pending
    }

    /// Discards any unfinished sequence and returns its bytes.
    pub fn take_pending(&mut self) -> Vec<u8> {
        self.state = ScanState::Idle;
        std::mem::take(&mut self.pending)
    }

    /// Scans `input`, reporting each piece to `sink` in order.
    ///
    /// Scanning stops at the first error returned by `sink`, and that error
    /// is returned. The rest of `input` is left unconsumed while the scanner
    /// itself stays consistent, having finished handling the failed event.
    pub fn feed<E, F>(&mut self, input: &[u8], mut sink: F) -> Result<(), E>
    where
        F: FnMut(Event<'_>) -> Result<(), E>,
    {
        let mut text_start = 0;
        let mut i = 0;
        while i < input.len() {
            let b = input[i];
            match self.state {
                ScanState::Idle => {
                    if b == ESC {
                        if text_start < i {
                            sink(Event::Text(&input[text_start..i]))?;
                        }
                        self.pending.push(b);
                        self.state = ScanState::SawEscape;
                    }
                }
                ScanState::SawEscape => match b {
                    b'[' => {
                        self.pending.push(b);
                        self.state = ScanState::CollectingCsi;
                    }
                    b']' => {
                        self.pending.push(b);
                        self.state = ScanState::CollectingOsc;
                    }
                    _ => {
                        self.abort(&mut sink)?;
                        text_start = i;
                        continue;
                    }
                },
                ScanState::CollectingCsi => match b {
                    b'0'..=b'9' | b';' if self.pending.len() < MAX_CSI_LEN => {
                        self.pending.push(b);
                    }
                    b'A'..=b'Z' | b'a'..=b'z' => {
                        self.pending.push(b);
                        let command = parse_csi(&self.pending);
                        text_start = i + 1;
                        self.dispatch(command, &mut sink)?;
                    }
                    _ => {
                        self.abort(&mut sink)?;
                        text_start = i;
                        continue;
                    }
                },
                ScanState::CollectingOsc => match b {
                    BEL => {
                        self.pending.push(b);
                        let command = parse_osc(&self.pending);
                        text_start = i + 1;
                        self.dispatch(command, &mut sink)?;
                    }
                    ESC => {
                        self.abort(&mut sink)?;
                        text_start = i;
                        continue;
                    }
                    _ if self.pending.len() >= MAX_OSC_LEN => {
                        self.abort(&mut sink)?;
                        text_start = i;
                        continue;
                    }
                    _ => self.pending.push(b),
                },
            }
            i += 1;
        }
        if self.state == ScanState::Idle && text_start < input.len() {
            sink(Event::Text(&input[text_start..]))?;
        }
        Ok(())
    }

    fn dispatch<E, F>(
        &mut self,
        command: Option<Command>,
        sink: &mut F,
    ) -> Result<(), E>
    where
        F: FnMut(Event<'_>) -> Result<(), E>,
    {
        if command.is_none() {
            tracing::trace!(
                raw = ?String::from_utf8_lossy(&self.pending),
                "passing through unrecognized sequence"
            );
        }
        let result = sink(Event::Sequence { command, raw: &self.pending });
        self.pending.clear();
        self.state = ScanState::Idle;
        result
    }

    /// Gives up on the pending sequence. The byte that broke the grammar is
    /// not consumed; the caller rescans it from `Idle`.
    fn abort<E, F>(&mut self, sink: &mut F) -> Result<(), E>
    where
        F: FnMut(Event<'_>) -> Result<(), E>,
    {
        tracing::trace!(
            raw = ?String::from_utf8_lossy(&self.pending),
            state = ?self.state,
            "recovering from malformed sequence"
        );
        let result = sink(Event::Malformed(&self.pending));
        self.pending.clear();
        self.state = ScanState::Idle;
        result
    }
}

/// Splits `ESC [ params final` parameters. Empty parameters are `None`.
fn csi_params(body: &[u8]) -> Vec<Option<u16>> {
    body.split(|&b| b == b';')
        .map(|p| {
            if p.is_empty() {
                return None;
            }
            Some(p.iter().fold(0u16, |n, &d| {
                n.saturating_mul(10).saturating_add(u16::from(d - b'0'))
            }))
        })
        .collect()
}

fn parse_csi(seq: &[u8]) -> Option<Command> {
    let (&final_byte, body) = seq.get(2..)?.split_last()?;
    let params = csi_params(body);
    let arg = |i: usize, default: u16| {
        params.get(i).copied().flatten().unwrap_or(default)
    };
    if let Some(direction) = Direction::from_final_byte(final_byte) {
        return Some(Command::CursorMove(direction, arg(0, 1)));
    }
    match final_byte {
        b'm' => Some(Command::Sgr(
            params.iter().map(|p| p.unwrap_or(0)).collect(),
        )),
        b'H' | b'f' => Some(Command::CursorPosition {
            row: arg(0, 1),
            col: arg(1, 1),
        }),
        b'J' => ClearMode::from_code(arg(0, 0)).map(Command::ClearScreen),
        b'K' => ClearMode::from_code(arg(0, 0)).map(Command::ClearLine),
        _ => None,
    }
}

fn parse_osc(seq: &[u8]) -> Option<Command> {
    let body = seq.get(2..seq.len().checked_sub(1)?)?;
    let title = body
        .strip_prefix(b"2;")
        .or_else(|| body.strip_prefix(b"0;"))?;
    Some(Command::SetTitle(String::from_utf8_lossy(title).into_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    /// An owned mirror of `Event` for assertions.
    #[derive(Debug, Eq, PartialEq)]
    enum Seen {
        Text(String),
        Seq(Option<Command>, String),
        Malformed(String),
    }

    fn scan(scanner: &mut Scanner, input: &[u8]) -> Vec<Seen> {
        let mut seen = vec![];
        let fed: Result<(), ()> = scanner.feed(input, |event| {
            let s = |b: &[u8]| String::from_utf8_lossy(b).into_owned();
            seen.push(match event {
                Event::Text(t) => Seen::Text(s(t)),
                Event::Sequence { command, raw } => Seen::Seq(command, s(raw)),
                Event::Malformed(raw) => Seen::Malformed(s(raw)),
            });
            Ok(())
        });
        assert!(fed.is_ok());
        seen
    }

    /// Concatenates the raw bytes of every event.
    fn rejoined(seen: &[Seen]) -> String {
        seen.iter()
            .map(|event| match event {
                Seen::Text(raw) | Seen::Seq(_, raw) | Seen::Malformed(raw) => {
                    raw.as_str()
                }
            })
            .collect()
    }

    #[test]
    fn plain_text_is_one_event() {
        let mut scanner = Scanner::new();
        assert_eq!(
            scan(&mut scanner, b"hello\nworld"),
            vec![Seen::Text("hello\nworld".into())]
        );
    }

    #[test]
    fn sgr_between_text() {
        let mut scanner = Scanner::new();
        assert_eq!(
            scan(&mut scanner, b"a\x1B[31mb"),
            vec![
                Seen::Text("a".into()),
                Seen::Seq(Some(Command::Sgr(vec![31])), "\x1B[31m".into()),
                Seen::Text("b".into()),
            ]
        );
    }

    #[test]
    fn sequence_split_across_feeds() {
        let mut scanner = Scanner::new();
        assert_eq!(scan(&mut scanner, b"x\x1B[3"), vec![Seen::Text("x".into())]);
        assert_eq!(scanner.state(), ScanState::CollectingCsi);
        assert_eq!(scanner.pending(), b"\x1B[3");
        assert_eq!(
            scan(&mut scanner, b"1m"),
            vec![Seen::Seq(Some(Command::Sgr(vec![31])), "\x1B[31m".into())]
        );
        assert_eq!(scanner.state(), ScanState::Idle);
    }

    #[test]
    fn every_split_point_yields_the_same_sequence() {
        let input = b"\x1B[1;31m";
        for at in 0..=input.len() {
            let mut scanner = Scanner::new();
            let mut seen = scan(&mut scanner, &input[..at]);
            seen.extend(scan(&mut scanner, &input[at..]));
            assert_eq!(
                seen,
                vec![Seen::Seq(
                    Some(Command::Sgr(vec![1, 31])),
                    "\x1B[1;31m".into()
                )],
                "split at {at}"
            );
        }
    }

    #[test]
    fn malformed_is_returned_unchanged() {
        let mut scanner = Scanner::new();
        let seen = scan(&mut scanner, b"\x1B[;;\x01garbage\x1B[32m");
        assert_eq!(
            seen,
            vec![
                Seen::Malformed("\x1B[;;".into()),
                Seen::Text("\x01garbage".into()),
                Seen::Seq(Some(Command::Sgr(vec![32])), "\x1B[32m".into()),
            ]
        );
        assert_eq!(scanner.state(), ScanState::Idle);
    }

    #[test]
    fn escape_restarts_a_pending_sequence() {
        let mut scanner = Scanner::new();
        assert_eq!(
            scan(&mut scanner, b"\x1B[3\x1B[4m"),
            vec![
                Seen::Malformed("\x1B[3".into()),
                Seen::Seq(Some(Command::Sgr(vec![4])), "\x1B[4m".into()),
            ]
        );
    }

    #[test]
    fn lone_escape_followed_by_text() {
        let mut scanner = Scanner::new();
        assert_eq!(
            scan(&mut scanner, b"\x1Bxy"),
            vec![Seen::Malformed("\x1B".into()), Seen::Text("xy".into())]
        );
    }

    #[test]
    fn unrecognized_but_well_formed() {
        let mut scanner = Scanner::new();
        assert_eq!(
            scan(&mut scanner, b"\x1B[;;g"),
            vec![Seen::Seq(None, "\x1B[;;g".into())]
        );
        assert_eq!(
            scan(&mut scanner, b"\x1B[5J"),
            vec![Seen::Seq(None, "\x1B[5J".into())]
        );
    }

    #[test]
    fn cursor_and_clear_defaults() {
        let mut scanner = Scanner::new();
        let seen = scan(&mut scanner, b"\x1B[A\x1B[0B\x1B[H\x1B[7;3f\x1B[J\x1B[2K");
        let commands: Vec<_> = seen
            .into_iter()
            .map(|s| match s {
                Seen::Seq(Some(c), _) => c,
                other => panic!("unexpected {other:?}"),
            })
            .collect();
        assert_eq!(
            commands,
            vec![
                Command::CursorMove(Direction::Up, 1),
                Command::CursorMove(Direction::Down, 0),
                Command::CursorPosition { row: 1, col: 1 },
                Command::CursorPosition { row: 7, col: 3 },
                Command::ClearScreen(ClearMode::ToEnd),
                Command::ClearLine(ClearMode::All),
            ]
        );
    }

    #[test]
    fn empty_sgr_is_reset() {
        let mut scanner = Scanner::new();
        assert_eq!(
            scan(&mut scanner, b"\x1B[m"),
            vec![Seen::Seq(Some(Command::Sgr(vec![0])), "\x1B[m".into())]
        );
    }

    #[test]
    fn title() {
        let mut scanner = Scanner::new();
        assert_eq!(
            scan(&mut scanner, b"\x1B]2;hi there\x07!"),
            vec![
                Seen::Seq(
                    Some(Command::SetTitle("hi there".into())),
                    "\x1B]2;hi there\x07".into()
                ),
                Seen::Text("!".into()),
            ]
        );
        assert_eq!(
            scan(&mut scanner, b"\x1B]8;;x\x07"),
            vec![Seen::Seq(None, "\x1B]8;;x\x07".into())]
        );
    }

    #[test]
    fn overlong_csi_is_malformed() {
        let mut scanner = Scanner::new();
        let mut input = b"\x1B[".to_vec();
        input.extend(std::iter::repeat_n(b'1', MAX_CSI_LEN));
        input.push(b'm');
        let seen = scan(&mut scanner, &input);
        assert!(matches!(seen[0], Seen::Malformed(_)));
        assert_eq!(scanner.state(), ScanState::Idle);
        assert_eq!(rejoined(&seen), String::from_utf8(input).unwrap());
    }

    #[test]
    fn overlong_osc_is_malformed() {
        let mut scanner = Scanner::new();
        let mut input = b"\x1B]2;".to_vec();
        input.extend(std::iter::repeat_n(b'a', 5000));
        input.push(BEL);
        let seen = scan(&mut scanner, &input);
        assert_eq!(seen.len(), 2);
        assert!(matches!(seen[0], Seen::Malformed(ref raw) if raw.len() == MAX_OSC_LEN));
        assert!(matches!(seen[1], Seen::Text(_)));
        assert_eq!(scanner.state(), ScanState::Idle);
        assert_eq!(rejoined(&seen), String::from_utf8(input).unwrap());
    }

    #[test]
    fn sink_error_stops_scanning() {
        let mut scanner = Scanner::new();
        let mut events = 0;
        let fed = scanner.feed(b"a\x1B[31mb\x1B[0mc", |event| {
            events += 1;
            match event {
                Event::Sequence { .. } => Err("sink full"),
                _ => Ok(()),
            }
        });
        assert_eq!(fed, Err("sink full"));
        assert_eq!(events, 2);
        assert_eq!(scanner.state(), ScanState::Idle);
        assert!(scanner.pending().is_empty());
    }

    #[test]
    fn take_pending_resets() {
        let mut scanner = Scanner::new();
        scan(&mut scanner, b"\x1B]2;half");
        assert_eq!(scanner.take_pending(), b"\x1B]2;half".to_vec());
        assert_eq!(scanner.state(), ScanState::Idle);
        assert!(scanner.pending().is_empty());
    }
}
