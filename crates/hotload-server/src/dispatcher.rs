//! Notification dispatch.
//!
//! Every `notify_*` call is synchronous: it decides whether there is anything
//! to send, schedules the send as a tracked task and returns. Failures are
//! logged, never returned. A missing session is an expected condition and is
//! only logged at debug level.
//!
//! Sends to one session go out in the order they were scheduled: each task
//! waits for its predecessor to finish (or be cancelled) before sending.

use std::future::Future;
use std::sync::Arc;

use hotload_protocol::{ClientInfo, ComponentKind, LogLevel};
use hotload_transport::{Session, SessionError};
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::{debug, error};

use crate::context::ServerContext;

/// Tail of the per-session send queue. The receiver resolves once the last
/// scheduled send's task is gone, whatever the outcome.
#[derive(Default)]
struct SendQueue {
    tail: Mutex<Option<(String, oneshot::Receiver<()>)>>,
}

impl SendQueue {
    /// Take the next place in line for `session_id`. Returns the predecessor
    /// to wait for and the sender whose drop releases the successor.
    fn enqueue(&self, session_id: &str) -> (Option<oneshot::Receiver<()>>, oneshot::Sender<()>) {
        let (done, tail) = oneshot::channel();
        let previous = self.tail.lock().replace((session_id.to_string(), tail));
        let previous = previous.and_then(|(id, rx)| (id == session_id).then_some(rx));
        (previous, done)
    }
}

#[derive(Clone)]
pub struct Dispatcher {
    ctx: ServerContext,
    queue: Arc<SendQueue>,
}

impl Dispatcher {
    pub fn new(ctx: ServerContext) -> Self {
        Self {
            ctx,
            queue: Arc::default(),
        }
    }

    pub fn context(&self) -> &ServerContext {
        &self.ctx
    }

    /// Tell the current client that the `kind` list changed.
    pub fn notify_list_changed(&self, kind: ComponentKind) {
        let Some(session) = self.current_session(kind.list_changed_method()) else {
            return;
        };
        let what = format!("{} list change", kind.as_str());
        self.schedule(kind.list_changed_method(), session, move |session| async move {
            log_outcome(&what, session.send_list_changed(kind).await);
        });
    }

    /// Tell the current client that the resource at `uri` changed, if any
    /// session subscribed to it.
    pub fn notify_resource_changed(&self, uri: &str) {
        if !self.ctx.subscriptions.is_subscribed(uri) {
            debug!("No subscribers for {uri}; skipping update");
            return;
        }
        let Some(session) = self.current_session("resource update") else {
            return;
        };
        let uri = uri.to_string();
        self.schedule("resource update", session, move |session| async move {
            let result = session.send_resource_updated(&uri).await;
            log_outcome(&format!("update for {uri}"), result);
        });
    }

    /// Report progress for `token`. With a description, also sends an
    /// info-level log message carrying it.
    pub fn notify_progress(
        &self,
        token: &str,
        progress: f64,
        total: Option<f64>,
        description: Option<&str>,
    ) {
        let Some(session) = self.current_session("progress") else {
            return;
        };

        let progress_token = token.to_string();
        self.schedule("progress", session.clone(), move |session| async move {
            let result = session
                .send_progress_notification(&progress_token, progress, total)
                .await;
            log_outcome(&format!("progress for {progress_token}"), result);
        });

        if let Some(description) = description {
            let text = description.to_string();
            self.schedule("progress message", session, move |session| async move {
                let result = session.send_log_message(LogLevel::Info, &text).await;
                log_outcome("progress message", result);
            });
        }
    }

    /// Client info reported by the current session's `initialize`, if any.
    pub fn client_info(&self) -> Option<ClientInfo> {
        self.ctx.sessions.current()?.client_info()
    }

    /// Run `send` as a tracked task once every earlier send to `session`
    /// has finished.
    fn schedule<F, Fut>(&self, label: &str, session: Arc<dyn Session>, send: F)
    where
        F: FnOnce(Arc<dyn Session>) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (previous, done) = self.queue.enqueue(session.id());
        let send = send(session);
        self.ctx.tasks.spawn(label, async move {
            if let Some(previous) = previous {
                let _ = previous.await;
            }
            send.await;
            drop(done);
        });
    }

    fn current_session(&self, what: &str) -> Option<Arc<dyn Session>> {
        let session = self.ctx.sessions.current();
        if session.is_none() {
            debug!("No active session; skipping {what}");
        }
        session
    }
}

fn log_outcome(what: &str, result: Result<(), SessionError>) {
    match result {
        Ok(()) => debug!("Sent {what}"),
        Err(e) if e.is_closed() => debug!("No active session for {what}"),
        Err(e) => error!("Failed to send {what}: {e}"),
    }
}
