//! The single-in-flight authentication session.
//!
//! One task per [`FingerprintManager`](crate::FingerprintManager) owns all
//! session state. Requests, cancellations, and backend scan events travel
//! through a single mpsc channel and are processed sequentially by that task,
//! so no lock guards the pending reply or the cancellation handle. A caller
//! suspends on a oneshot receiver; the task resolves it exactly once, when
//! the backend reports a terminal event for the session that armed it.

use std::pin::pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use log::warn;
use tokio::sync::{Notify, mpsc, oneshot};

use crate::{AuthOutcome, FingerprintBackend, FingerprintError, ScanEvent, codes};

pub(crate) type Reply = oneshot::Sender<Result<AuthOutcome, FingerprintError>>;

pub(crate) enum Message {
    Authenticate { reason: String, reply: Reply },
    Cancel,
    Event { session: u64, event: ScanEvent },
}

/// Cooperative cancellation handle armed for each scan.
///
/// The session task owns arming and clearing; a backend receives a clone for
/// the lifetime of the scan and observes it with [`is_cancelled`] or
/// [`cancelled`], typically by wiring it to the platform's own cancellation
/// primitive. Tripping the handle only requests cancellation; the backend is
/// still expected to report a final canceled event.
///
/// [`is_cancelled`]: CancellationSignal::is_cancelled
/// [`cancelled`]: CancellationSignal::cancelled
#[derive(Clone, Debug, Default)]
pub struct CancellationSignal {
    inner: Arc<SignalState>,
}

#[derive(Debug, Default)]
struct SignalState {
    cancelled: AtomicBool,
    notify: Notify,
}

impl CancellationSignal {
    /// Create an untripped signal.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        if !self.inner.cancelled.swap(true, Ordering::AcqRel) {
            self.inner.notify.notify_waiters();
        }
    }

    /// Whether cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::Acquire)
    }

    /// Wait until cancellation is requested.
    pub async fn cancelled(&self) {
        let mut notified = pin!(self.inner.notify.notified());
        notified.as_mut().enable();
        if self.is_cancelled() {
            return;
        }
        notified.await;
    }
}

/// Handle a backend uses to report scan events for one session.
///
/// Sinks are tagged with the session that armed them; events delivered after
/// that session finished are discarded by the session task. The sink holds
/// only a weak reference to the session channel, so a backend keeping one
/// around cannot keep the service alive.
#[derive(Clone, Debug)]
pub struct EventSink {
    session: u64,
    tx: mpsc::WeakUnboundedSender<Message>,
}

impl EventSink {
    /// Report a scan event. Events for finished sessions are dropped.
    pub fn deliver(&self, event: ScanEvent) {
        if let Some(tx) = self.tx.upgrade() {
            let _ = tx.send(Message::Event {
                session: self.session,
                event,
            });
        }
    }
}

struct Session {
    id: u64,
    reply: Reply,
    // Cleared by an explicit cancel while the reply stays armed; the whole
    // session goes away together on a terminal event.
    cancel: Option<CancellationSignal>,
}

pub(crate) fn spawn(backend: Arc<dyn FingerprintBackend>) -> mpsc::UnboundedSender<Message> {
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(run(backend, tx.downgrade(), rx));
    tx
}

async fn run(
    backend: Arc<dyn FingerprintBackend>,
    tx: mpsc::WeakUnboundedSender<Message>,
    mut rx: mpsc::UnboundedReceiver<Message>,
) {
    let mut next_id: u64 = 0;
    let mut active: Option<Session> = None;

    while let Some(message) = rx.recv().await {
        match message {
            Message::Authenticate { reason, reply } => {
                if active.is_some() {
                    // The in-flight session is untouched; the newcomer is
                    // turned away immediately.
                    respond(reply, Ok(AuthOutcome::AppCancelled));
                    continue;
                }
                let Some(tx) = tx.upgrade() else {
                    respond(reply, Err(FingerprintError::ServiceStopped));
                    continue;
                };
                next_id += 1;
                let id = next_id;
                let signal = CancellationSignal::new();
                let sink = EventSink {
                    session: id,
                    tx: tx.downgrade(),
                };
                match backend.authenticate(&reason, sink, signal.clone()) {
                    Ok(()) => {
                        active = Some(Session {
                            id,
                            reply,
                            cancel: Some(signal),
                        });
                    }
                    Err(err) => respond(reply, Err(err)),
                }
            }
            Message::Cancel => {
                if let Some(session) = active.as_mut()
                    && let Some(signal) = session.cancel.take()
                {
                    signal.cancel();
                }
            }
            Message::Event { session, event } => match active.take() {
                Some(current) if current.id == session => resolve(current, event),
                current => {
                    warn!("dropping fingerprint event for finished session {session}: {event:?}");
                    active = current;
                }
            },
        }
    }

    // The owning manager is gone; release any platform listener.
    if let Some(session) = active
        && let Some(signal) = session.cancel
    {
        signal.cancel();
    }
}

fn resolve(session: Session, event: ScanEvent) {
    let outcome = match event {
        ScanEvent::Succeeded => AuthOutcome::Success,
        ScanEvent::Failed => AuthOutcome::Failed,
        ScanEvent::Error { code, message } => AuthOutcome::Error {
            code: codes::error_label(code),
            message,
        },
        ScanEvent::Help { code, message } => AuthOutcome::Help {
            code: codes::acquired_label(code),
            message,
        },
    };
    // Failed-match and help reports leave the platform listening for more
    // attempts; stop the scan so the reply contract stays one result per call.
    let stop_scan = matches!(outcome, AuthOutcome::Failed | AuthOutcome::Help { .. });
    let signal = session.cancel;
    respond(session.reply, Ok(outcome));
    if stop_scan
        && let Some(signal) = signal
    {
        signal.cancel();
    }
}

fn respond(reply: Reply, result: Result<AuthOutcome, FingerprintError>) {
    if reply.send(result).is_err() {
        warn!("fingerprint caller went away before its result was delivered");
    }
}
