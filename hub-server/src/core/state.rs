use std::path::PathBuf;
use std::sync::Arc;

use crate::core::event_router::EventRouter;
use crate::core::tasks::{HistoryWorker, NotifyWorker};
use crate::core::Config;
use crate::quota::UsageLedger;
use crate::requests::storage::RequestStorage;
use crate::requests::RequestManager;
use crate::slots::SlotAllocator;

/// History channel buffer (critical path, keep large)
const HISTORY_CHANNEL_BUFFER: usize = 1024;
/// Notify channel buffer (best-effort)
const NOTIFY_CHANNEL_BUFFER: usize = 256;

/// Server state - shared handles to every service
///
/// Cheap to clone: storage and the manager are Arc-backed.
///
/// | Field | Type | Role |
/// |-------|------|------|
/// | config | Config | Configuration (immutable) |
/// | storage | RequestStorage | Embedded event store (redb) |
/// | manager | Arc<RequestManager> | Request lifecycle command pipeline |
/// | slots | SlotAllocator | Pickup slot administration |
/// | ledger | UsageLedger | Weekly usage reporting and overrides |
#[derive(Clone)]
pub struct ServerState {
    /// Server configuration
    pub config: Config,
    /// Embedded event store
    pub storage: RequestStorage,
    /// Request lifecycle manager
    pub manager: Arc<RequestManager>,
    /// Pickup slot allocator
    pub slots: SlotAllocator,
    /// Usage ledger
    pub ledger: UsageLedger,
}

impl ServerState {
    /// Initialize the server state
    ///
    /// 1. Work directory structure (database/, logs/)
    /// 2. redb database at work_dir/database/hub.redb
    /// 3. Services over the shared storage handle
    pub fn initialize(config: &Config) -> anyhow::Result<Self> {
        config.ensure_work_dir_structure()?;

        let db_path = config.database_dir().join("hub.redb");
        let manager = RequestManager::new(
            &db_path,
            config.free_requests_per_week,
            config.extra_charge_per_request,
        )?;
        let storage = manager.storage().clone();

        let slots = SlotAllocator::new(storage.clone());
        let ledger = UsageLedger::new(storage.clone(), config.free_requests_per_week);

        Ok(Self {
            config: config.clone(),
            storage,
            manager: Arc::new(manager),
            slots,
            ledger,
        })
    }

    /// Spawn the event router and its workers
    ///
    /// Must be called before `Server::run()`.
    pub fn start_background_tasks(&self) {
        let (router, channels) = EventRouter::new(HISTORY_CHANNEL_BUFFER, NOTIFY_CHANNEL_BUFFER);

        let source = self.manager.subscribe();
        tokio::spawn(router.run(source));

        let history = HistoryWorker::new(self.storage.clone());
        tokio::spawn(history.run(channels.history_rx));

        let notify = NotifyWorker::new();
        tokio::spawn(notify.run(channels.notify_rx));
    }

    /// Working directory
    pub fn work_dir(&self) -> PathBuf {
        PathBuf::from(&self.config.work_dir)
    }
}
