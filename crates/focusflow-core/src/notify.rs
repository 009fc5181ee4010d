//! Completion notifications (sound + desktop-style banner).
//!
//! Both channels are best-effort and independent: the engine calls each one
//! separately and only logs failures.

use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;

use crate::error::{CoreError, Result};

pub trait Notifier {
    /// Play the completion sound at `volume` percent (0-100).
    fn play_sound(&self, volume: u8) -> Result<()>;

    /// Show a user-visible notification.
    fn show_notification(&self, title: &str, body: &str) -> Result<()>;
}

impl<T: Notifier + ?Sized> Notifier for Rc<T> {
    fn play_sound(&self, volume: u8) -> Result<()> {
        (**self).play_sound(volume)
    }

    fn show_notification(&self, title: &str, body: &str) -> Result<()> {
        (**self).show_notification(title, body)
    }
}

/// Terminal notifier: rings the bell and prints a banner, both on stderr
/// so stdout stays machine-readable.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalNotifier;

impl Notifier for TerminalNotifier {
    fn play_sound(&self, volume: u8) -> Result<()> {
        if volume == 0 {
            return Ok(());
        }
        let mut out = std::io::stderr().lock();
        out.write_all(b"\x07")?;
        out.flush()?;
        Ok(())
    }

    fn show_notification(&self, title: &str, body: &str) -> Result<()> {
        let mut err = std::io::stderr().lock();
        writeln!(err, "🎉 {title} {body}")?;
        Ok(())
    }
}

/// A notification captured by [`RecordingNotifier`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    Sound { volume: u8 },
    Banner { title: String, body: String },
}

/// Records every notification; optionally fails them all.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    seen: Rc<RefCell<Vec<Notification>>>,
    fail: bool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// A notifier whose every call errors (after recording the attempt).
    pub fn failing() -> Self {
        Self {
            seen: Rc::default(),
            fail: true,
        }
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.seen.borrow().clone()
    }

    fn record(&self, n: Notification) -> Result<()> {
        self.seen.borrow_mut().push(n);
        if self.fail {
            return Err(CoreError::Custom("notification channel unavailable".into()));
        }
        Ok(())
    }
}

impl Notifier for RecordingNotifier {
    fn play_sound(&self, volume: u8) -> Result<()> {
        self.record(Notification::Sound { volume })
    }

    fn show_notification(&self, title: &str, body: &str) -> Result<()> {
        self.record(Notification::Banner {
            title: title.to_string(),
            body: body.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_notifier_keeps_order() {
        let n = RecordingNotifier::new();
        n.play_sound(40).unwrap();
        n.show_notification("t", "b").unwrap();
        assert_eq!(
            n.notifications(),
            vec![
                Notification::Sound { volume: 40 },
                Notification::Banner {
                    title: "t".into(),
                    body: "b".into()
                }
            ]
        );
    }

    #[test]
    fn failing_notifier_still_records() {
        let n = RecordingNotifier::failing();
        assert!(n.play_sound(10).is_err());
        assert_eq!(n.notifications().len(), 1);
    }
}
