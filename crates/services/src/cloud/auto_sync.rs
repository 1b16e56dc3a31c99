use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use prosody_core::model::UserId;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::sync::CloudSyncEngine;

/// Scheduled push. `started` flips once the delay has elapsed and the
/// status shows "Syncing...".
struct PendingPush {
    handle: JoinHandle<()>,
    started: Arc<AtomicBool>,
}

impl PendingPush {
    fn in_flight(&self) -> bool {
        self.started.load(Ordering::SeqCst) && !self.handle.is_finished()
    }
}

struct Inner {
    engine: CloudSyncEngine,
    delay: Duration,
    user: Mutex<Option<UserId>>,
    pending: Mutex<Option<PendingPush>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Debounced background push for the signed-in user.
///
/// Without a user every `notify_change` is ignored.
#[derive(Clone)]
pub struct AutoSync {
    inner: Arc<Inner>,
}

impl AutoSync {
    #[must_use]
    pub fn new(engine: CloudSyncEngine, delay: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                engine,
                delay,
                user: Mutex::new(None),
                pending: Mutex::new(None),
            }),
        }
    }

    /// Switches the user; signing out drops any pending push.
    pub fn set_user(&self, user: Option<UserId>) {
        if user.is_none() {
            self.cancel();
        }
        *lock(&self.inner.user) = user;
    }

    #[must_use]
    pub fn user(&self) -> Option<UserId> {
        lock(&self.inner.user).clone()
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        lock(&self.inner.pending)
            .as_ref()
            .is_some_and(|pending| !pending.handle.is_finished())
    }

    /// Restarts the push timer after a local change.
    ///
    /// A push that is already talking to the backend is left to finish; the
    /// new timer pushes again afterwards.
    pub fn notify_change(&self) {
        let Some(user) = self.user() else {
            return;
        };
        let inner = Arc::clone(&self.inner);
        let started = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&started);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(inner.delay).await;
            let status = inner.engine.status();
            flag.store(true, Ordering::SeqCst);
            status.begin();
            match inner.engine.push(&user).await {
                Ok(record) => status.succeed(record.last_synced),
                Err(err) => {
                    warn!(user = %user, error = %err, "background push failed");
                    status.fail(err.to_string());
                }
            }
        });
        let next = PendingPush { handle, started };
        if let Some(previous) = lock(&self.inner.pending).replace(next) {
            if previous.started.load(Ordering::SeqCst) {
                debug!("background push in flight; next one queued");
            } else {
                previous.handle.abort();
                debug!("background push rescheduled");
            }
        }
    }

    /// Drops the scheduled push. Interrupting one mid-flight clears the
    /// "Syncing..." status it set.
    pub fn cancel(&self) {
        let Some(pending) = lock(&self.inner.pending).take() else {
            return;
        };
        let interrupted = pending.in_flight();
        pending.handle.abort();
        if interrupted {
            self.inner.engine.status().reset();
            debug!("in-flight background push cancelled");
        }
    }
}
