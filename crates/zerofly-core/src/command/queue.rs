// ── Command queue ──
//
// At most one command per key is in flight; a second submission for a busy
// key is rejected with `AlreadyInProgress`. Across keys, a semaphore bounds
// how many commands talk to the daemon or host at once. Each spawned command
// is tracked so shutdown can wait for the ones already running.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use dashmap::DashSet;
use tokio::sync::{Notify, Semaphore, broadcast, oneshot};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::gate::CommandGate;
use super::route::{RouteContext, route_command};
use super::{Command, CommandEvent, CommandHandle, CommandKey, CommandResult};
use crate::error::CoreError;
use crate::store::writer::StoreWriter;

const EVENT_CHANNEL_SIZE: usize = 64;

pub(crate) struct CommandQueue {
    inner: Arc<QueueInner>,
}

struct QueueInner {
    routes: RouteContext,
    writer: StoreWriter,
    gate: Arc<CommandGate>,
    in_flight: DashSet<CommandKey>,
    permits: Semaphore,
    tracker: TaskTracker,
    /// Cancels commands still waiting for a permit, and pending follow-ups.
    cancel: CancellationToken,
    open: AtomicBool,
    events: broadcast::Sender<CommandEvent>,
    refresh: Arc<Notify>,
    follow_up: Vec<Duration>,
}

pub(crate) struct QueueConfig {
    pub(crate) max_concurrent: usize,
    pub(crate) follow_up: Vec<Duration>,
}

impl CommandQueue {
    pub(crate) fn new(
        routes: RouteContext,
        writer: StoreWriter,
        gate: Arc<CommandGate>,
        refresh: Arc<Notify>,
        config: QueueConfig,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_SIZE);
        Self {
            inner: Arc::new(QueueInner {
                routes,
                writer,
                gate,
                in_flight: DashSet::new(),
                permits: Semaphore::new(config.max_concurrent.max(1)),
                tracker: TaskTracker::new(),
                cancel: CancellationToken::new(),
                open: AtomicBool::new(false),
                events,
                refresh,
                follow_up: config.follow_up,
            }),
        }
    }

    /// Start accepting submissions.
    pub(crate) fn open(&self) {
        self.inner.open.store(true, Ordering::SeqCst);
    }

    pub(crate) fn events(&self) -> broadcast::Receiver<CommandEvent> {
        self.inner.events.subscribe()
    }

    pub(crate) fn submit(&self, command: Command) -> Result<CommandHandle, CoreError> {
        if !self.inner.open.load(Ordering::SeqCst) {
            return Err(CoreError::NotRunning);
        }

        let key = command.key();
        if !self.inner.in_flight.insert(key.clone()) {
            debug!(%command, "rejecting command, key busy");
            return Err(CoreError::AlreadyInProgress {
                key: key.to_string(),
            });
        }
        let key_guard = KeyGuard {
            queue: Arc::clone(&self.inner),
            key,
        };

        let id = Uuid::new_v4();
        let (tx, rx) = oneshot::channel();
        let _ = self.inner.events.send(CommandEvent::Submitted {
            id,
            command: command.clone(),
        });

        let inner = Arc::clone(&self.inner);
        let task_command = command.clone();
        self.inner.tracker.spawn(async move {
            let result = inner.run(id, &task_command).await;
            // Key is free before the outcome is delivered.
            drop(key_guard);
            let _ = inner.events.send(CommandEvent::Completed {
                id,
                command: task_command,
                result: result.clone(),
            });
            let _ = tx.send(result);
        });

        Ok(CommandHandle::new(id, command, rx))
    }

    /// Stop accepting commands, cancel those not yet started, and wait for
    /// running ones to finish.
    pub(crate) async fn shutdown(&self) {
        self.inner.open.store(false, Ordering::SeqCst);
        self.inner.cancel.cancel();
        self.inner.tracker.close();
        self.inner.tracker.wait().await;
        debug!("command queue drained");
    }
}

impl QueueInner {
    async fn run(&self, id: Uuid, command: &Command) -> Result<CommandResult, CoreError> {
        let _permit = tokio::select! {
            biased;
            () = self.cancel.cancelled() => return Err(CoreError::Cancelled),
            permit = self.permits.acquire() => permit.map_err(|_| CoreError::Cancelled)?,
        };

        // Past this point the command runs to completion, shutdown or not.
        let gate = self.gate.enter();
        debug!(%id, %command, "command started");

        let result = match route_command(&self.routes, command).await {
            Ok(routed) => {
                if let Some(update) = routed.update {
                    self.writer.apply(update).await;
                }
                info!(%id, %command, result = ?routed.result, "command completed");
                Ok(routed.result)
            }
            Err(e) => {
                warn!(%id, %command, error = %e, "command failed");
                Err(e)
            }
        };

        drop(gate);
        self.refresh.notify_one();
        if matches!(
            (command, &result),
            (Command::JoinNetwork(_), Ok(CommandResult::Network(_)))
        ) {
            self.schedule_follow_ups();
        }
        result
    }

    /// Extra refreshes after a join while the daemon fetches the network
    /// config.
    fn schedule_follow_ups(&self) {
        for delay in &self.follow_up {
            let delay = *delay;
            let refresh = Arc::clone(&self.refresh);
            let cancel = self.cancel.clone();
            self.tracker.spawn(async move {
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => {}
                    () = tokio::time::sleep(delay) => refresh.notify_one(),
                }
            });
        }
    }
}

/// Releases a command key when the command task ends, however it ends.
struct KeyGuard {
    queue: Arc<QueueInner>,
    key: CommandKey,
}

impl Drop for KeyGuard {
    fn drop(&mut self) {
        self.queue.in_flight.remove(&self.key);
    }
}
