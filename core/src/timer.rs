// core/src/timer.rs

//! Countdown for a QR session's expiry.
//!
//! This is a UX guard only. The payment provider stays the authority on
//! whether a QR code can still be paid.

use chrono::{DateTime, Utc};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

pub const EXPIRED_LABEL: &str = "EXPIRED";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Countdown {
  Remaining(Duration),
  Expired,
}

impl Countdown {
  pub fn is_expired(&self) -> bool {
    matches!(self, Countdown::Expired)
  }

  /// `MM:SS` (minutes are not wrapped at the hour) or `EXPIRED`.
  pub fn label(&self) -> String {
    match self {
      Countdown::Expired => EXPIRED_LABEL.to_string(),
      Countdown::Remaining(left) => {
        let secs = left.as_secs();
        format!("{:02}:{:02}", secs / 60, secs % 60)
      }
    }
  }
}

/// Expired strictly after `expires_at`; sub-second remainders are truncated.
pub fn countdown(expires_at: DateTime<Utc>, now: DateTime<Utc>) -> Countdown {
  if now > expires_at {
    return Countdown::Expired;
  }
  let left = (expires_at - now).num_seconds().max(0) as u64;
  Countdown::Remaining(Duration::from_secs(left))
}

/// Recomputes the countdown once per second and publishes it on a watch
/// channel. Publishes `None` forever when there is no expiry to track.
///
/// The ticking task ends on its own once `Expired` is published, and is
/// aborted when the timer is stopped or dropped.
#[derive(Debug)]
pub struct ExpiryTimer {
  receiver: watch::Receiver<Option<Countdown>>,
  task: Option<JoinHandle<()>>,
}

impl ExpiryTimer {
  pub fn start(expires_at: Option<DateTime<Utc>>) -> Self {
    Self::start_with_clock(expires_at, Utc::now)
  }

  pub fn start_with_clock<C>(expires_at: Option<DateTime<Utc>>, clock: C) -> Self
  where
    C: Fn() -> DateTime<Utc> + Send + 'static,
  {
    let Some(expires_at) = expires_at else {
      let (_tx, receiver) = watch::channel(None);
      return Self { receiver, task: None };
    };

    let initial = countdown(expires_at, clock());
    let (tx, receiver) = watch::channel(Some(initial));
    if initial.is_expired() {
      return Self { receiver, task: None };
    }

    let task = tokio::spawn(async move {
      let mut ticker = tokio::time::interval(Duration::from_secs(1));
      ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
      // The first tick completes immediately; the initial value is already published.
      ticker.tick().await;
      loop {
        ticker.tick().await;
        let current = countdown(expires_at, clock());
        if tx.send(Some(current)).is_err() || current.is_expired() {
          break;
        }
      }
      tracing::debug!(%expires_at, "QR expiry timer finished.");
    });

    Self {
      receiver,
      task: Some(task),
    }
  }

  pub fn current(&self) -> Option<Countdown> {
    *self.receiver.borrow()
  }

  pub fn subscribe(&self) -> watch::Receiver<Option<Countdown>> {
    self.receiver.clone()
  }

  pub fn is_running(&self) -> bool {
    self.task.as_ref().is_some_and(|t| !t.is_finished())
  }

  pub fn stop(&mut self) {
    if let Some(task) = self.task.take() {
      task.abort();
    }
  }
}

impl Drop for ExpiryTimer {
  fn drop(&mut self) {
    self.stop();
  }
}
