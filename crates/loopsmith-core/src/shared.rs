use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread::{self, JoinHandle},
};

use parking_lot::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::{
    engine::{Engine, ShuffleOutcome, ShuffleReport},
    error::EngineError,
    shuffle::ShuffleStrategy,
};

struct Inner {
    engine: Mutex<Engine>,
    in_flight: AtomicBool,
}

/// Thread-safe handle to one [`Engine`]. At most one buffer mutation runs at a
/// time; reads stay available while a background shuffle computes.
#[derive(Clone)]
pub struct SharedEngine {
    inner: Arc<Inner>,
}

/// Clears the in-flight flag however the pending edit ends.
struct InFlightGuard {
    inner: Arc<Inner>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.inner.in_flight.store(false, Ordering::Release);
    }
}

/// A shuffle running on a worker thread. Dropping it is the same as
/// [`PendingShuffle::cancel`].
pub struct PendingShuffle {
    handle: JoinHandle<Result<ShuffleOutcome, EngineError>>,
    generation: u64,
    guard: InFlightGuard,
}

impl SharedEngine {
    #[must_use]
    pub fn new(engine: Engine) -> Self {
        Self {
            inner: Arc::new(Inner {
                engine: Mutex::new(engine),
                in_flight: AtomicBool::new(false),
            }),
        }
    }

    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.inner.in_flight.load(Ordering::Acquire)
    }

    pub fn read<R>(&self, f: impl FnOnce(&Engine) -> R) -> R {
        f(&self.inner.engine.lock())
    }

    /// Runs `f` against the engine unless a background edit is pending. The
    /// flag is only read or set with the engine lock held.
    pub fn mutate<R>(&self, f: impl FnOnce(&mut Engine) -> Result<R, EngineError>) -> Result<R, EngineError> {
        let mut engine = self.inner.engine.lock();
        if self.is_busy() {
            debug!("mutation rejected while shuffle is in flight");
            return Err(EngineError::MutationInFlight);
        }
        f(&mut engine)
    }

    #[must_use]
    pub fn playhead(&self) -> f64 {
        self.inner.engine.lock().playhead()
    }

    /// Playhead moves never touch the buffer, so they are allowed mid-shuffle.
    pub fn set_playhead(&self, seconds: f64) -> Result<f64, EngineError> {
        self.inner.engine.lock().set_playhead(seconds)
    }

    #[instrument(skip(self))]
    pub fn spawn_shuffle(&self, strategy: ShuffleStrategy, magic: bool) -> Result<PendingShuffle, EngineError> {
        let mut engine = self.inner.engine.lock();
        if self
            .inner
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(EngineError::MutationInFlight);
        }
        let guard = InFlightGuard {
            inner: Arc::clone(&self.inner),
        };

        let task = engine.prepare_shuffle(strategy, magic)?;
        drop(engine);
        let generation = task.generation();
        let handle = thread::Builder::new()
            .name("loopsmith-shuffle".to_string())
            .spawn(move || task.run())
            .map_err(|error| EngineError::WorkerFailed(error.to_string()))?;

        info!(generation, "shuffle started on worker thread");
        Ok(PendingShuffle {
            handle,
            generation,
            guard,
        })
    }
}

impl PendingShuffle {
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Blocks for the worker, then commits its result in one step.
    #[instrument(skip(self), fields(generation = self.generation))]
    pub fn wait(self) -> Result<ShuffleReport, EngineError> {
        let Self { handle, guard, .. } = self;
        let outcome = handle
            .join()
            .map_err(|_| EngineError::WorkerFailed("shuffle worker panicked".to_string()))??;

        let inner = Arc::clone(&guard.inner);
        let mut engine = inner.engine.lock();
        let report = engine.commit_shuffle(outcome);
        drop(guard);
        report
    }

    /// Detaches the worker; its result is dropped and the buffer is untouched.
    pub fn cancel(self) {
        warn!(generation = self.generation, "shuffle cancelled");
    }
}
