//! Debounced auto-save for one record
//!
//! One scheduler is created per editing session. Edits are handed to
//! [`AutoSaveScheduler::schedule`]; the latest payload is saved once no new
//! edit has arrived for the quiet period.
//!
//! # Guarantees
//!
//! - At most one save is in flight per record. A timer that fires while a
//!   save is running re-arms instead of starting a second request.
//! - Every attempt ends in [`SaveStatus::Saved`] or [`SaveStatus::Failed`];
//!   nothing is left in `Saving`.
//! - The first successful save of a new record fixes its id; later payloads
//!   without an id are sent as updates of that record.
//! - [`AutoSaveScheduler::teardown`] drops the pending timer. A request that
//!   is already on the wire still completes at the store, but its result is
//!   not published.
//!
//! # Example
//!
//! ```rust,no_run
//! # use nodeform_core::services::{AutoSaveScheduler, NodeService};
//! # use nodeform_core::models::{Node, NodeData};
//! # use std::time::Duration;
//! # async fn example(client: NodeService) {
//! let scheduler = AutoSaveScheduler::new(client, Duration::from_millis(1000));
//! let mut status = scheduler.subscribe();
//!
//! scheduler.schedule(Node::new("task", NodeData::new())).await;
//! status.changed().await.ok();
//! # }
//! ```

use super::node_service::NodeService;
use crate::config::ClientConfig;
use crate::models::{Node, NodeId};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;

/// Observable state of the scheduler
#[derive(Debug, Clone, PartialEq)]
pub enum SaveStatus {
    Idle,
    /// An edit is waiting for the quiet period to pass
    Pending,
    Saving,
    Saved(Node),
    Failed(String),
}

#[derive(Default)]
struct State {
    pending: Option<Node>,
    in_flight: bool,
    /// Bumped on every (re-)arm and cancel; a timer only fires for its own generation
    generation: u64,
    timer: Option<JoinHandle<()>>,
    record_id: Option<NodeId>,
    torn_down: bool,
}

struct Inner {
    client: NodeService,
    quiet_period: Duration,
    state: Mutex<State>,
    status: watch::Sender<SaveStatus>,
}

/// Per-record debounce scheduler
#[derive(Clone)]
pub struct AutoSaveScheduler {
    inner: Arc<Inner>,
}

impl AutoSaveScheduler {
    pub fn new(client: NodeService, quiet_period: Duration) -> Self {
        let (status, _) = watch::channel(SaveStatus::Idle);
        Self {
            inner: Arc::new(Inner {
                client,
                quiet_period,
                state: Mutex::new(State::default()),
                status,
            }),
        }
    }

    pub fn from_config(client: NodeService, config: &ClientConfig) -> Self {
        Self::new(client, config.autosave_quiet_period())
    }

    pub fn subscribe(&self) -> watch::Receiver<SaveStatus> {
        self.inner.status.subscribe()
    }

    pub fn status(&self) -> SaveStatus {
        self.inner.status.borrow().clone()
    }

    pub fn quiet_period(&self) -> Duration {
        self.inner.quiet_period
    }

    /// Id of the record once it exists at the store
    pub async fn record_id(&self) -> Option<NodeId> {
        self.inner.state.lock().await.record_id
    }

    /// Replace the pending payload and restart the quiet period
    pub async fn schedule(&self, node: Node) {
        let mut state = self.inner.state.lock().await;
        if state.torn_down {
            tracing::debug!("Auto-save already torn down, dropping edit");
            return;
        }
        if state.record_id.is_none() {
            state.record_id = node.id;
        }
        state.pending = Some(node);
        Inner::arm(&self.inner, &mut state);
        self.inner.status.send_replace(SaveStatus::Pending);
    }

    /// Drop the pending edit and its timer. An in-flight save is unaffected.
    pub async fn cancel(&self) {
        let mut state = self.inner.state.lock().await;
        Inner::disarm(&mut state);
        if state.pending.take().is_some() && !state.in_flight {
            self.inner.status.send_replace(SaveStatus::Idle);
        }
    }

    /// Cancel and stop publishing results, including the in-flight one
    pub async fn teardown(&self) {
        let mut state = self.inner.state.lock().await;
        Inner::disarm(&mut state);
        state.pending = None;
        state.torn_down = true;
        tracing::debug!(record_id = ?state.record_id, in_flight = state.in_flight, "Auto-save torn down");
    }
}

impl Inner {
    fn arm(this: &Arc<Inner>, state: &mut State) {
        Self::disarm(state);
        let generation = state.generation;
        let inner = Arc::clone(this);
        state.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(inner.quiet_period).await;
            Inner::fire(inner, generation).await;
        }));
    }

    fn disarm(state: &mut State) {
        state.generation += 1;
        if let Some(timer) = state.timer.take() {
            timer.abort();
        }
    }

    async fn fire(this: Arc<Inner>, generation: u64) {
        let node = {
            let mut state = this.state.lock().await;
            if state.generation != generation || state.torn_down {
                return;
            }
            // This task is the timer; release its handle so re-arming cannot abort it
            state.timer = None;

            if state.in_flight {
                tracing::debug!("Save in flight, rescheduling auto-save");
                Self::arm(&this, &mut state);
                return;
            }
            let Some(node) = state.pending.take() else {
                return;
            };
            state.in_flight = true;
            this.status.send_replace(SaveStatus::Saving);

            let mut node = node;
            if node.id.is_none() {
                node.id = state.record_id;
            }
            node
        };

        let result = this.client.save(node).await;

        let mut state = this.state.lock().await;
        state.in_flight = false;
        if state.torn_down {
            tracing::debug!("Ignoring auto-save result after teardown");
            return;
        }

        match result {
            Ok(saved) => {
                if state.record_id.is_none() {
                    state.record_id = saved.id;
                }
                tracing::debug!(id = ?saved.id, "Auto-save complete");
                if state.pending.is_some() {
                    this.status.send_replace(SaveStatus::Pending);
                } else {
                    this.status.send_replace(SaveStatus::Saved(saved));
                }
            }
            Err(err) => {
                tracing::warn!(record_id = ?state.record_id, "Auto-save failed: {}", err);
                this.status.send_replace(SaveStatus::Failed(err.to_string()));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{MemoryStore, NodeStore, SelectOption, StoreResult};
    use crate::models::{BatchItemResult, NodeData, WriteNode};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const QUIET: Duration = Duration::from_millis(1000);

    /// MemoryStore whose writes take a while, counting overlap
    struct SlowStore {
        inner: MemoryStore,
        delay: Duration,
        writes: AtomicUsize,
        running: AtomicUsize,
        max_running: AtomicUsize,
    }

    impl SlowStore {
        fn new(delay: Duration) -> Self {
            Self {
                inner: MemoryStore::new(),
                delay,
                writes: AtomicUsize::new(0),
                running: AtomicUsize::new(0),
                max_running: AtomicUsize::new(0),
            }
        }

        async fn slow<T>(&self, fut: impl std::future::Future<Output = T>) -> T {
            self.writes.fetch_add(1, Ordering::SeqCst);
            let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_running.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            let out = fut.await;
            self.running.fetch_sub(1, Ordering::SeqCst);
            out
        }
    }

    #[async_trait]
    impl NodeStore for SlowStore {
        async fn get_node(&self, id: NodeId) -> StoreResult<Node> {
            self.inner.get_node(id).await
        }
        async fn get_nodes_by_type(&self, node_type: &str) -> StoreResult<Vec<Node>> {
            self.inner.get_nodes_by_type(node_type).await
        }
        async fn get_nodes_by_owner(
            &self,
            owner_id: NodeId,
            node_type: Option<&str>,
        ) -> StoreResult<Vec<Node>> {
            self.inner.get_nodes_by_owner(owner_id, node_type).await
        }
        async fn create_node(&self, node: WriteNode) -> StoreResult<Node> {
            self.slow(self.inner.create_node(node)).await
        }
        async fn update_node(&self, node: WriteNode) -> StoreResult<Node> {
            self.slow(self.inner.update_node(node)).await
        }
        async fn delete_node(&self, id: NodeId) -> StoreResult<()> {
            self.inner.delete_node(id).await
        }
        async fn batch_create(&self, nodes: Vec<WriteNode>) -> StoreResult<Vec<BatchItemResult>> {
            self.inner.batch_create(nodes).await
        }
        async fn batch_update(&self, nodes: Vec<WriteNode>) -> StoreResult<Vec<BatchItemResult>> {
            self.inner.batch_update(nodes).await
        }
        async fn collection_options(
            &self,
            collection_id: NodeId,
            label_field: Option<&str>,
        ) -> StoreResult<Vec<SelectOption>> {
            self.inner.collection_options(collection_id, label_field).await
        }
    }

    fn task(title: &str) -> Node {
        let mut data = NodeData::new();
        data.insert("title".to_string(), json!(title));
        Node::new("task", data)
    }

    async fn wait_for(
        rx: &mut watch::Receiver<SaveStatus>,
        done: impl Fn(&SaveStatus) -> bool,
    ) -> SaveStatus {
        loop {
            {
                let current = rx.borrow_and_update();
                if done(&current) {
                    return current.clone();
                }
            }
            rx.changed().await.unwrap();
        }
    }

    fn saved_title(status: &SaveStatus) -> Option<&str> {
        match status {
            SaveStatus::Saved(node) => node.data.get("title").and_then(|t| t.as_str()),
            _ => None,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_of_edits_saves_once() {
        let store = Arc::new(SlowStore::new(Duration::ZERO));
        let scheduler = AutoSaveScheduler::new(NodeService::new(store.clone()), QUIET);
        let mut rx = scheduler.subscribe();

        for title in ["a", "ab", "abc"] {
            scheduler.schedule(task(title)).await;
            tokio::time::advance(Duration::from_millis(300)).await;
        }
        assert_eq!(scheduler.status(), SaveStatus::Pending);
        assert_eq!(store.writes.load(Ordering::SeqCst), 0);

        let status = wait_for(&mut rx, |s| matches!(s, SaveStatus::Saved(_))).await;
        assert_eq!(saved_title(&status), Some("abc"));
        assert_eq!(store.writes.load(Ordering::SeqCst), 1);
        assert_eq!(store.inner.len().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_edit_during_save_reschedules() {
        let store = Arc::new(SlowStore::new(Duration::from_secs(5)));
        let scheduler = AutoSaveScheduler::new(NodeService::new(store.clone()), QUIET);
        let mut rx = scheduler.subscribe();

        scheduler.schedule(task("first")).await;
        wait_for(&mut rx, |s| *s == SaveStatus::Saving).await;

        scheduler.schedule(task("second")).await;
        let status = wait_for(&mut rx, |s| saved_title(s) == Some("second")).await;

        assert_eq!(store.max_running.load(Ordering::SeqCst), 1);
        assert_eq!(store.writes.load(Ordering::SeqCst), 2);
        // the second payload had no id; it updated the record the first one created
        assert_eq!(store.inner.len().await, 1);
        let record_id = scheduler.record_id().await;
        assert!(record_id.is_some());
        match status {
            SaveStatus::Saved(node) => assert_eq!(node.id, record_id),
            other => panic!("unexpected status {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_drops_pending_save() {
        let store = Arc::new(SlowStore::new(Duration::ZERO));
        let scheduler = AutoSaveScheduler::new(NodeService::new(store.clone()), QUIET);

        scheduler.schedule(task("draft")).await;
        scheduler.cancel().await;
        tokio::time::sleep(QUIET * 5).await;

        assert_eq!(scheduler.status(), SaveStatus::Idle);
        assert_eq!(store.writes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_teardown_ignores_in_flight_result() {
        let store = Arc::new(SlowStore::new(Duration::from_secs(5)));
        let scheduler = AutoSaveScheduler::new(NodeService::new(store.clone()), QUIET);
        let mut rx = scheduler.subscribe();

        scheduler.schedule(task("leaving")).await;
        wait_for(&mut rx, |s| *s == SaveStatus::Saving).await;
        scheduler.teardown().await;
        scheduler.schedule(task("ignored")).await;

        tokio::time::sleep(Duration::from_secs(30)).await;

        // the request still reached the store
        assert_eq!(store.inner.len().await, 1);
        assert_eq!(store.writes.load(Ordering::SeqCst), 1);
        assert_eq!(scheduler.status(), SaveStatus::Saving);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_save_is_reported() {
        let store = Arc::new(SlowStore::new(Duration::ZERO));
        let scheduler = AutoSaveScheduler::new(NodeService::new(store.clone()), QUIET);
        let mut rx = scheduler.subscribe();

        scheduler.schedule(Node::new("", NodeData::new())).await;
        let status = wait_for(&mut rx, |s| matches!(s, SaveStatus::Failed(_))).await;
        match status {
            SaveStatus::Failed(message) => assert!(message.contains("create")),
            other => panic!("unexpected status {other:?}"),
        }
    }
}
