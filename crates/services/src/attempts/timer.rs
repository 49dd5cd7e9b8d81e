//! Countdown driver for timed sessions.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use quiz_core::session::{QuizSession, TickOutcome};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{Instant, interval_at};
use tracing::{info, trace, warn};

/// Session state shared between an attempt and its timer task.
pub type SharedSession = Arc<Mutex<QuizSession>>;

/// Handle to the task that ticks a session once per period.
///
/// The task stops on its own once the session leaves `active`. Cancelling or
/// dropping the handle aborts it.
pub struct SessionTimer {
    handle: JoinHandle<()>,
    expired: Option<oneshot::Receiver<()>>,
}

impl SessionTimer {
    /// Spawn the countdown on the current tokio runtime.
    ///
    /// Must be called from within a runtime context.
    #[must_use]
    pub fn spawn(session: SharedSession, period: Duration) -> Self {
        let (tx, rx) = oneshot::channel();
        let handle = tokio::spawn(async move {
            let mut ticks = interval_at(Instant::now() + period, period);
            loop {
                ticks.tick().await;
                let outcome = match session.lock() {
                    Ok(mut guard) => guard.tick(),
                    Err(_) => {
                        warn!("session lock poisoned; stopping countdown");
                        return;
                    }
                };
                match outcome {
                    TickOutcome::Running { remaining_secs } => {
                        trace!(remaining_secs, "tick");
                    }
                    TickOutcome::Expired => {
                        info!("time limit reached; session expired");
                        let _ = tx.send(());
                        return;
                    }
                    TickOutcome::Untimed | TickOutcome::Inactive => return,
                }
            }
        });

        Self {
            handle,
            expired: Some(rx),
        }
    }

    /// Resolves once the countdown expires the session.
    ///
    /// Returns `false` if the timer stopped for any other reason, or if expiry
    /// was already observed by an earlier call.
    pub async fn expired(&mut self) -> bool {
        match self.expired.as_mut() {
            Some(rx) => {
                let fired = rx.await.is_ok();
                self.expired = None;
                fired
            }
            None => false,
        }
    }

    pub fn cancel(&self) {
        self.handle.abort();
    }
}

impl Drop for SessionTimer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
