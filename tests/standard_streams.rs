use std::io::Write;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use colorshim::{Fore, StreamMode, WrapOptions, WriteColor, with_style};
use pretty_assertions::assert_eq;
use serial_test::serial;

#[test]
#[serial]
fn fixing_twice_wraps_once() {
    let first = colorshim::just_fix_console();
    let second = colorshim::just_fix_console();
    assert_eq!(first, second);
    assert_eq!(colorshim::stdout().mode(), first.0);
    assert_eq!(colorshim::stderr().mode(), first.1);
}

#[test]
#[serial]
fn init_after_fix_keeps_mode() {
    let (out_mode, _) = colorshim::just_fix_console();
    let _guard = colorshim::init(WrapOptions::new().strip(out_mode != StreamMode::Strip));
    assert_eq!(colorshim::stdout().mode(), out_mode);
}

#[test]
#[serial]
fn init_updates_autoreset() {
    {
        let _guard = colorshim::init(WrapOptions::new().autoreset(true));
        assert!(colorshim::stdout().autoreset());
        assert!(colorshim::stderr().autoreset());
    }
    let _guard = colorshim::init(WrapOptions::new());
    assert!(!colorshim::stdout().autoreset());
}

#[test]
#[serial]
fn deinit_resets_style() {
    colorshim::just_fix_console();
    {
        let mut err = colorshim::stderr();
        write!(err, "{}", Fore::Red).unwrap();
        assert!(!err.style().is_reset());
    }
    colorshim::deinit();
    assert!(colorshim::stderr().style().is_reset());
}

#[test]
#[serial]
fn guard_drop_resets_style() {
    {
        let _guard = colorshim::init(WrapOptions::new());
        let mut err = colorshim::stderr();
        err.set_color(&"fg:green,bright".parse().unwrap()).unwrap();
        assert!(!err.style().is_reset());
    }
    assert!(colorshim::stderr().style().is_reset());
}

/// Runs `f` on its own thread and reports whether it finished in time.
fn finishes(f: impl FnOnce() + Send + 'static) -> bool {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        f();
        let _ = tx.send(());
    });
    rx.recv_timeout(Duration::from_secs(5)).is_ok()
}

#[test]
#[serial]
fn handles_can_be_taken_twice_on_one_thread() {
    assert!(finishes(|| {
        let mut first = colorshim::stdout();
        let mut second = colorshim::stdout();
        write!(first, "").unwrap();
        write!(second, "").unwrap();
        assert_eq!(first.mode(), second.mode());
    }));
}

#[test]
#[serial]
fn init_and_deinit_while_a_handle_is_held() {
    assert!(finishes(|| {
        let mut err = colorshim::stderr();
        write!(err, "{}", Fore::Red).unwrap();
        let guard = colorshim::init(WrapOptions::new().autoreset(true));
        assert!(err.autoreset());
        colorshim::just_fix_console();
        drop(guard);
        assert!(err.style().is_reset());
        err.set_autoreset(false);
    }));
}

#[test]
#[serial]
fn accessor_inside_scoped_style() {
    assert!(finishes(|| {
        let mut err = colorshim::stderr();
        let mode = with_style(&mut err, &Fore::Red.into(), |_| {
            let inner = colorshim::stderr();
            assert!(!inner.style().is_reset());
            inner.mode()
        })
        .unwrap();
        assert_eq!(mode, err.mode());
        assert!(err.style().is_reset());
    }));
}
