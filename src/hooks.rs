// 🪝 Test-run hooks - seed before the suite, clean up and close after
//
// The finish hook runs at most once per session and always ends with
// close_all(); afterwards a new manager must be requested from the registry.

use crate::config::Environment;
use crate::db::DatabaseRegistry;
use crate::error::Result;
use crate::manager::{SeedSummary, TestDataManager};
use crate::static_data::StaticDataCache;
use parking_lot::Mutex;
use tracing::{info, warn};

/// Bring `environment` to the canonical state (reset + seed)
pub fn on_session_start(environment: Environment) -> Result<SeedSummary> {
    start_in(DatabaseRegistry::global(), environment, StaticDataCache::default())
}

/// Drop the environment's tables and close every database
pub fn on_session_finish(environment: Environment) -> Result<()> {
    finish_in(DatabaseRegistry::global(), environment)
}

fn start_in(
    registry: &Mutex<DatabaseRegistry>,
    environment: Environment,
    cache: StaticDataCache,
) -> Result<SeedSummary> {
    let mut manager = TestDataManager::in_registry(&mut registry.lock(), environment, cache);
    manager.reset()
}

fn finish_in(registry: &Mutex<DatabaseRegistry>, environment: Environment) -> Result<()> {
    let mut registry = registry.lock();
    // Never started here: nothing to drop, and no file to create
    let cleanup = match registry.get(environment) {
        Some(db) => db.drop_tables(),
        None => Ok(()),
    };
    registry.close_all();
    cleanup
}

/// RAII guard for one test run: seeds on start, runs the finish hook once
pub struct TestSession<'r> {
    registry: &'r Mutex<DatabaseRegistry>,
    environment: Environment,
    summary: SeedSummary,
    finished: bool,
}

impl TestSession<'static> {
    /// Session on the process-wide registry
    pub fn start(environment: Environment) -> Result<Self> {
        TestSession::start_with(DatabaseRegistry::global(), environment, StaticDataCache::default())
    }
}

impl<'r> TestSession<'r> {
    pub fn start_with(
        registry: &'r Mutex<DatabaseRegistry>,
        environment: Environment,
        cache: StaticDataCache,
    ) -> Result<Self> {
        let summary = start_in(registry, environment, cache)?;
        info!(%environment, "Test session started: {}", summary);

        Ok(TestSession {
            registry,
            environment,
            summary,
            finished: false,
        })
    }

    pub fn environment(&self) -> Environment {
        self.environment
    }

    /// Rows seeded when the session started
    pub fn summary(&self) -> SeedSummary {
        self.summary
    }

    /// Run the finish hook now and report its outcome
    pub fn finish(mut self) -> Result<()> {
        self.finish_once()
    }

    fn finish_once(&mut self) -> Result<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;
        finish_in(self.registry, self.environment)
    }
}

impl Drop for TestSession<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.finish_once() {
            warn!(environment = %self.environment, "Test session cleanup failed: {}", e);
        }
    }
}
