//! Background refresh loop.
//!
//! One task per visible conversation: an initial load with the loader
//! shown, then a silent refetch every poll interval until the handle is
//! stopped or dropped.  A failed fetch is logged and the loop carries on.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::ChatError;
use crate::session::{ChatSession, SessionTarget};

/// Owns the refresh task of a session. Dropping it cancels the task.
pub struct SyncHandle {
    token: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl SyncHandle {
    pub fn is_running(&self) -> bool {
        self.task.as_ref().map_or(false, |t| !t.is_finished())
    }

    /// Cancel the loop and wait for it to exit. An in-flight fetch is
    /// abandoned; its result never reaches the store.
    pub async fn stop(mut self) {
        self.token.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(error = %e, "Sync task ended abnormally");
            }
        }
    }
}

impl Drop for SyncHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// Spawn the refresh loop for `session`.
pub fn start_sync(session: Arc<ChatSession>) -> SyncHandle {
    let token = CancellationToken::new();
    let task = tokio::spawn(run(session, token.clone()));
    SyncHandle {
        token,
        task: Some(task),
    }
}

/// Stop the current loop, point the session at `target` and start over
/// with a fresh initial load.
pub async fn switch_conversation(
    session: &Arc<ChatSession>,
    handle: SyncHandle,
    target: SessionTarget,
) -> SyncHandle {
    handle.stop().await;
    info!(
        conversation = ?target.conversation_id,
        application = ?target.application_id,
        "Switching conversation"
    );
    session.reset(target);
    start_sync(session.clone())
}

async fn run(session: Arc<ChatSession>, token: CancellationToken) {
    let period = session.poll_interval();
    debug!(?period, "Sync loop started");

    tokio::select! {
        _ = token.cancelled() => {
            debug!("Sync cancelled during initial load");
            session.end_loading();
            return;
        }
        res = session.load(true) => {
            if !handle_result(res) {
                return;
            }
        }
    }

    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = ticker.tick() => {}
        }

        tokio::select! {
            _ = token.cancelled() => break,
            res = session.load(false) => {
                if !handle_result(res) {
                    break;
                }
            }
        }
    }

    debug!("Sync loop stopped");
}

/// Returns `false` when the loop should end.
fn handle_result<T>(res: Result<T, ChatError>) -> bool {
    match res {
        Ok(_) => true,
        Err(ChatError::SessionClosed) => false,
        Err(ChatError::Api(e)) if e.is_network() => {
            debug!(error = %e, "Server unreachable, retrying on next tick");
            true
        }
        Err(e) => {
            warn!(error = %e, "Conversation refresh failed");
            true
        }
    }
}
