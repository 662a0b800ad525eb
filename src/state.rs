use std::sync::Arc;
use std::time::{Instant, SystemTime};

use crate::db::Db;
use crate::services::placement::PlacementTable;
use crate::services::progression::LearnerLocks;

#[derive(Clone)]
pub struct AppState {
    started_at: Instant,
    started_at_system: SystemTime,
    db: Db,
    learner_locks: Arc<LearnerLocks>,
    placement: Arc<PlacementTable>,
}

impl AppState {
    pub fn new(db: Db, placement: PlacementTable) -> Self {
        Self {
            started_at: Instant::now(),
            started_at_system: SystemTime::now(),
            db,
            learner_locks: Arc::new(LearnerLocks::new()),
            placement: Arc::new(placement),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }

    pub fn started_at_system(&self) -> SystemTime {
        self.started_at_system
    }

    pub fn db(&self) -> &Db {
        &self.db
    }

    pub fn learner_locks(&self) -> &LearnerLocks {
        &self.learner_locks
    }

    pub fn placement(&self) -> &PlacementTable {
        &self.placement
    }
}
