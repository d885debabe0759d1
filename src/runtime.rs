//! One-time initialization of the vision runtime.
//!
//! Bootstrapping the runtime is an external, possibly slow capability. All
//! callers share a single in-flight initialization: whoever arrives while it
//! is running waits for that same attempt instead of starting another one.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::error::{ScanError, ScanResult};

pub type LoadFuture<'a> = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'a>>;

/// Brings the vision runtime up. Called at most once per successful start.
pub trait RuntimeLoader: Send + Sync {
    fn load(&self) -> LoadFuture<'_>;
}

/// Loader for backends linked into the binary: nothing to fetch.
#[derive(Debug, Default, Clone, Copy)]
pub struct LinkedBackends;

impl RuntimeLoader for LinkedBackends {
    fn load(&self) -> LoadFuture<'_> {
        Box::pin(async { Ok(()) })
    }
}

pub const DEFAULT_INIT_TIMEOUT: Duration = Duration::from_secs(30);

/// Outcome of one initialization attempt, broadcast to every caller that
/// joined it. `None` until the attempt settles.
type Attempt = watch::Receiver<Option<ScanResult<()>>>;

enum InitState {
    Idle,
    Loading(Attempt),
    Ready,
}

enum Role {
    Ready,
    Lead(watch::Sender<Option<ScanResult<()>>>),
    Follow(Attempt),
}

pub struct VisionRuntime {
    state: Mutex<InitState>,
    loader: Box<dyn RuntimeLoader>,
    timeout: Duration,
}

impl std::fmt::Debug for VisionRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VisionRuntime")
            .field("ready", &self.is_ready())
            .field("timeout", &self.timeout)
            .finish()
    }
}

static GLOBAL: OnceLock<Arc<VisionRuntime>> = OnceLock::new();

impl VisionRuntime {
    pub fn new(loader: impl RuntimeLoader + 'static) -> Self {
        Self {
            state: Mutex::new(InitState::Idle),
            loader: Box::new(loader),
            timeout: DEFAULT_INIT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The process-wide runtime used by detectors that were not given one.
    pub fn global() -> Arc<VisionRuntime> {
        Arc::clone(GLOBAL.get_or_init(|| Arc::new(VisionRuntime::new(LinkedBackends))))
    }

    pub fn is_ready(&self) -> bool {
        matches!(*self.state(), InitState::Ready)
    }

    /// Wait until the runtime is usable, starting initialization if nobody has.
    ///
    /// Callers arriving while an attempt is in flight join it and all receive
    /// its outcome, success or failure. Once an attempt has failed or timed
    /// out, the next call starts a fresh one.
    pub async fn ensure_ready(&self) -> ScanResult<()> {
        loop {
            let mut attempt = match self.join() {
                Role::Ready => return Ok(()),
                Role::Lead(outcome) => return self.run_attempt(outcome).await,
                Role::Follow(attempt) => attempt,
            };
            match attempt.wait_for(Option::is_some).await {
                Ok(settled) => {
                    if let Some(result) = &*settled {
                        return result.clone();
                    }
                }
                // The leading caller was dropped before the attempt settled
                Err(_) => debug!("Vision runtime attempt abandoned, starting over"),
            }
        }
    }

    /// Start initialization ahead of the first scan.
    pub async fn preload(&self) -> ScanResult<()> {
        self.ensure_ready().await
    }

    fn state(&self) -> MutexGuard<'_, InitState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn join(&self) -> Role {
        let mut state = self.state();
        match &*state {
            InitState::Ready => return Role::Ready,
            InitState::Loading(attempt) => return Role::Follow(attempt.clone()),
            InitState::Idle => {}
        }
        let (outcome, attempt) = watch::channel(None);
        *state = InitState::Loading(attempt);
        Role::Lead(outcome)
    }

    async fn run_attempt(&self, outcome: watch::Sender<Option<ScanResult<()>>>) -> ScanResult<()> {
        let mut pending = PendingAttempt { runtime: self, settled: false };

        let result = match tokio::time::timeout(self.timeout, self.loader.load()).await {
            Ok(Ok(())) => {
                info!("Vision runtime ready");
                Ok(())
            }
            Ok(Err(e)) => {
                warn!("Vision runtime failed to load: {e:#}");
                Err(ScanError::RuntimeInit(format!("{e:#}")))
            }
            Err(_) => {
                warn!("Vision runtime not ready after {:?}", self.timeout);
                Err(ScanError::RuntimeTimeout(self.timeout))
            }
        };

        pending.settle(result.is_ok());
        outcome.send_replace(Some(result.clone()));
        result
    }
}

/// Resets the runtime to idle if the leading caller goes away mid-attempt,
/// so the callers that joined it can start over.
struct PendingAttempt<'a> {
    runtime: &'a VisionRuntime,
    settled: bool,
}

impl PendingAttempt<'_> {
    fn settle(&mut self, ready: bool) {
        *self.runtime.state() = if ready { InitState::Ready } else { InitState::Idle };
        self.settled = true;
    }
}

impl Drop for PendingAttempt<'_> {
    fn drop(&mut self) {
        if !self.settled {
            *self.runtime.state() = InitState::Idle;
        }
    }
}
