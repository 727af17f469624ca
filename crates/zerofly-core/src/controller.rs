// ── Controller facade ──
//
// Wires the transport client, service controller, store writer, sync engine,
// and command queue together. Presentation layers hold a `Controller` and
// only ever read snapshots, subscribe to changes, and submit commands.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::{Mutex, Notify, broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use zerofly_api::DaemonClient;

use crate::command::gate::CommandGate;
use crate::command::route::RouteContext;
use crate::command::{
    Command, CommandEvent, CommandHandle, CommandQueue, CommandResult, queue::QueueConfig,
};
use crate::config::DaemonConfig;
use crate::error::CoreError;
use crate::host::{HostExecutor, ServiceController, SystemExecutor};
use crate::model::{DaemonHealth, InterfaceBinding, Network, NetworkId, Node, Peer};
use crate::store::writer::{StoreMessage, StoreWriter, store_writer_task};
use crate::store::{ChangeSet, DataStore, ModelSnapshot};
use crate::stream::{ChangeStream, EntityStream};
use crate::sync::SyncState;
use crate::sync::engine::{Poller, sync_task};

const CHANGE_CHANNEL_SIZE: usize = 256;

// ── Controller ───────────────────────────────────────────────────────

/// The main entry point for consumers.
///
/// Cheaply cloneable via `Arc<ControllerInner>`. Owns the background store
/// writer and poll loop, routes commands, and vends snapshots and change
/// subscriptions.
#[derive(Clone)]
pub struct Controller {
    inner: Arc<ControllerInner>,
}

struct ControllerInner {
    config: DaemonConfig,
    store: Arc<DataStore>,
    service: Arc<ServiceController>,
    poller: Arc<Poller>,
    queue: CommandQueue,
    changes_tx: broadcast::Sender<Arc<ChangeSet>>,
    sync_state: Arc<watch::Sender<SyncState>>,
    refresh: Arc<Notify>,
    gate: Arc<CommandGate>,
    running: AtomicBool,
    /// Taken by `start()`; `None` afterwards.
    writer_rx: Mutex<Option<mpsc::Receiver<StoreMessage>>>,
    writer_cancel: CancellationToken,
    writer_handle: Mutex<Option<JoinHandle<()>>>,
    sync_cancel: CancellationToken,
    sync_handle: Mutex<Option<JoinHandle<()>>>,
}

impl Controller {
    /// Create a controller that runs host commands through `tokio::process`.
    /// Does not start anything: call [`start()`](Self::start).
    pub fn new(config: DaemonConfig) -> Result<Self, CoreError> {
        Self::with_executor(config, Arc::new(SystemExecutor))
    }

    /// Create a controller with a custom host command executor.
    pub fn with_executor(
        config: DaemonConfig,
        executor: Arc<dyn HostExecutor>,
    ) -> Result<Self, CoreError> {
        let client = DaemonClient::new(&config.url, &config.token, &config.transport())?;
        let service = Arc::new(ServiceController::from_config(&config, executor));
        let store = Arc::new(DataStore::new());
        let gate = Arc::new(CommandGate::default());
        let refresh = Arc::new(Notify::new());
        let (writer, writer_rx) = StoreWriter::channel();
        let (changes_tx, _) = broadcast::channel(CHANGE_CHANNEL_SIZE);
        let (sync_state, _) = watch::channel(SyncState::Idle);

        let poller = Arc::new(Poller::new(
            client.clone(),
            Arc::clone(&service),
            writer.clone(),
            Arc::clone(&gate),
        ));
        let queue = CommandQueue::new(
            RouteContext {
                client,
                service: Arc::clone(&service),
                store: Arc::clone(&store),
            },
            writer,
            Arc::clone(&gate),
            Arc::clone(&refresh),
            QueueConfig {
                max_concurrent: config.max_concurrent_commands,
                follow_up: config.sync.follow_up_refresh.clone(),
            },
        );

        Ok(Self {
            inner: Arc::new(ControllerInner {
                config,
                store,
                service,
                poller,
                queue,
                changes_tx,
                sync_state: Arc::new(sync_state),
                refresh,
                gate,
                running: AtomicBool::new(false),
                writer_rx: Mutex::new(Some(writer_rx)),
                writer_cancel: CancellationToken::new(),
                writer_handle: Mutex::new(None),
                sync_cancel: CancellationToken::new(),
                sync_handle: Mutex::new(None),
            }),
        })
    }

    pub fn config(&self) -> &DaemonConfig {
        &self.inner.config
    }

    pub fn store(&self) -> &Arc<DataStore> {
        &self.inner.store
    }

    pub fn service(&self) -> &Arc<ServiceController> {
        &self.inner.service
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Spawn the store writer and, unless disabled, the background poll
    /// loop, then open the command queue. A controller starts once.
    pub async fn start(&self) -> Result<(), CoreError> {
        let Some(writer_rx) = self.inner.writer_rx.lock().await.take() else {
            return Err(CoreError::Internal("controller already started".into()));
        };

        let writer = tokio::spawn(store_writer_task(
            Arc::clone(&self.inner.store),
            Arc::clone(&self.inner.gate),
            writer_rx,
            self.inner.changes_tx.clone(),
            self.inner.writer_cancel.clone(),
        ));
        *self.inner.writer_handle.lock().await = Some(writer);

        if self.inner.config.background_sync {
            let sync = tokio::spawn(sync_task(
                Arc::clone(&self.inner.poller),
                self.inner.config.sync.clone(),
                Arc::clone(&self.inner.sync_state),
                Arc::clone(&self.inner.refresh),
                self.inner.sync_cancel.clone(),
            ));
            *self.inner.sync_handle.lock().await = Some(sync);
        }

        self.inner.queue.open();
        self.inner.running.store(true, Ordering::SeqCst);
        info!(url = %self.inner.config.url, background_sync = self.inner.config.background_sync, "controller started");
        Ok(())
    }

    /// Stop polling, cancel queued commands, wait for running commands to
    /// finish, then flush and stop the store writer.
    pub async fn shutdown(&self) {
        if !self.inner.running.swap(false, Ordering::SeqCst) {
            return;
        }

        self.inner.sync_cancel.cancel();
        if let Some(handle) = self.inner.sync_handle.lock().await.take() {
            let _ = handle.await;
        }

        self.inner.queue.shutdown().await;

        self.inner.writer_cancel.cancel();
        if let Some(handle) = self.inner.writer_handle.lock().await.take() {
            let _ = handle.await;
        }

        self.inner.sync_state.send_replace(SyncState::Stopped);
        debug!("controller stopped");
    }

    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::SeqCst)
    }

    // ── Refresh ──────────────────────────────────────────────────────

    /// Ask the poll loop to refresh as soon as possible. Returns
    /// immediately; repeated requests coalesce.
    pub fn refresh(&self) {
        self.inner.refresh.notify_one();
    }

    /// Poll once and wait for the result to land in the store. Read-path
    /// errors are returned rather than only recorded as health.
    pub async fn refresh_now(&self) -> Result<(), CoreError> {
        if !self.is_running() {
            return Err(CoreError::NotRunning);
        }
        self.inner.poller.poll().await.map(|_| ())
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Queue a command. Fails immediately with `AlreadyInProgress` when a
    /// command with the same key is still running.
    pub fn submit(&self, command: Command) -> Result<CommandHandle, CoreError> {
        self.inner.queue.submit(command)
    }

    /// Submit and wait for the outcome.
    pub async fn execute(&self, command: Command) -> Result<CommandResult, CoreError> {
        self.submit(command)?.outcome().await
    }

    // ── One-shot convenience ─────────────────────────────────────────

    /// One-shot: start, run closure, shut down.
    ///
    /// Optimized for CLI: no background polling. The closure calls
    /// [`refresh_now()`](Self::refresh_now) when it needs the model.
    pub async fn oneshot<F, Fut, T>(config: DaemonConfig, f: F) -> Result<T, CoreError>
    where
        F: FnOnce(Controller) -> Fut,
        Fut: std::future::Future<Output = Result<T, CoreError>>,
    {
        let mut cfg = config;
        cfg.background_sync = false;

        let controller = Controller::new(cfg)?;
        controller.start().await?;
        let result = f(controller.clone()).await;
        controller.shutdown().await;
        result
    }

    // ── State observation ────────────────────────────────────────────

    pub fn sync_state(&self) -> watch::Receiver<SyncState> {
        self.inner.sync_state.subscribe()
    }

    pub fn health(&self) -> DaemonHealth {
        self.inner.store.health()
    }

    pub fn subscribe_health(&self) -> watch::Receiver<DaemonHealth> {
        self.inner.store.subscribe_health()
    }

    /// Change sets in the order the store applied them.
    pub fn changes(&self) -> broadcast::Receiver<Arc<ChangeSet>> {
        self.inner.changes_tx.subscribe()
    }

    /// [`changes()`](Self::changes) as a `Stream` that skips over lag.
    pub fn change_stream(&self) -> ChangeStream {
        ChangeStream::new(self.changes())
    }

    /// Submission and completion notices for every command.
    pub fn command_events(&self) -> broadcast::Receiver<CommandEvent> {
        self.inner.queue.events()
    }

    // ── Snapshot accessors (delegate to DataStore) ───────────────────

    pub fn snapshot(&self) -> Arc<ModelSnapshot> {
        self.inner.store.snapshot()
    }

    pub fn subscribe_model(&self) -> watch::Receiver<Arc<ModelSnapshot>> {
        self.inner.store.subscribe_model()
    }

    pub fn node(&self) -> Option<Arc<Node>> {
        self.inner.store.node()
    }

    pub fn network(&self, id: &NetworkId) -> Option<Arc<Network>> {
        self.inner.store.network(id)
    }

    pub fn networks_snapshot(&self) -> Arc<Vec<Arc<Network>>> {
        self.inner.store.networks_snapshot()
    }

    pub fn peers_snapshot(&self) -> Arc<Vec<Arc<Peer>>> {
        self.inner.store.peers_snapshot()
    }

    pub fn bindings_snapshot(&self) -> Arc<Vec<Arc<InterfaceBinding>>> {
        self.inner.store.bindings_snapshot()
    }

    // ── Entity streams ───────────────────────────────────────────────

    pub fn networks(&self) -> EntityStream<Network> {
        self.inner.store.subscribe_networks()
    }

    pub fn peers(&self) -> EntityStream<Peer> {
        self.inner.store.subscribe_peers()
    }

    pub fn bindings(&self) -> EntityStream<InterfaceBinding> {
        self.inner.store.subscribe_bindings()
    }
}
