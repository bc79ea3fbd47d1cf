//! Serialized update pipeline: one batch in flight, submissions coalesced behind it
use crate::config::UpdateQueueConfiguration;
use crate::errors::ReconcilerError;
use crate::model::List;
use crate::reconciler::reconcile;
use crate::registry::{KindRegistry, ReuseRegistry, introduced_kinds};
use crate::surface::{ApplyCompletion, RenderSurface, SurfaceUpdate};
use log::{debug, trace, warn};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Called once a submission has been applied (or rejected).
pub type CompletionHandler = Box<dyn FnOnce(Result<(), ReconcilerError>) + Send + 'static>;

/// A version waiting to be shown, plus everyone waiting on it.
struct Target {
    list: Arc<List>,
    animated: bool,
    waiters: Vec<CompletionHandler>,
}

enum Phase {
    Idle,
    /// A surface update is in flight; `pending` is the coalesced successor.
    Applying { pending: Option<Target> },
}

struct QueueState {
    snapshot: Option<Arc<List>>,
    phase: Phase,
}

struct Shared<S> {
    surface: S,
    registry: Arc<dyn ReuseRegistry>,
    config: UpdateQueueConfiguration,
    state: Mutex<QueueState>,
    applications: AtomicU64,
}

/// Applies list versions to a [`RenderSurface`] strictly one at a time.
///
/// `submit` may be called from any thread. While an update is in flight,
/// further submissions are coalesced: only the latest one is diffed against
/// the snapshot once the surface reports completion, and every coalesced
/// submission's handler fires with the outcome of that single application.
///
/// There is no timeout. A surface that never completes stalls the queue.
///
/// A surface may complete synchronously from inside `apply`, and handlers
/// may submit again from inside their callback; the follow-up update starts
/// once the outermost call on that thread unwinds, so such chains run in
/// constant stack depth. A panicking handler is logged and does not stop
/// the queue or the other handlers of its batch.
pub struct UpdateQueue<S: RenderSurface> {
    shared: Arc<Shared<S>>,
}

impl<S: RenderSurface> Clone for UpdateQueue<S> {
    fn clone(&self) -> Self {
        UpdateQueue {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<S: RenderSurface> UpdateQueue<S> {
    pub fn new(surface: S) -> Self {
        UpdateQueue::build(
            surface,
            Arc::new(KindRegistry::new()),
            UpdateQueueConfiguration::default(),
        )
    }

    /// Rejects configurations that [`UpdateQueueConfiguration::validate`] rejects.
    pub fn with_configuration(
        surface: S,
        registry: Arc<dyn ReuseRegistry>,
        config: UpdateQueueConfiguration,
    ) -> Result<Self, ReconcilerError> {
        config.validate()?;
        Ok(UpdateQueue::build(surface, registry, config))
    }

    fn build(
        surface: S,
        registry: Arc<dyn ReuseRegistry>,
        config: UpdateQueueConfiguration,
    ) -> Self {
        debug!("UpdateQueue: initialized with {:?}", config);
        UpdateQueue {
            shared: Arc::new(Shared {
                surface,
                registry,
                config,
                state: Mutex::new(QueueState {
                    snapshot: None,
                    phase: Phase::Idle,
                }),
                applications: AtomicU64::new(0),
            }),
        }
    }

    pub fn surface(&self) -> &S {
        &self.shared.surface
    }

    pub fn configuration(&self) -> &UpdateQueueConfiguration {
        &self.shared.config
    }

    /// The version the surface is believed to show.
    pub fn current_snapshot(&self) -> Option<Arc<List>> {
        self.shared.lock_state().snapshot.clone()
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.shared.lock_state().phase, Phase::Idle)
    }

    /// Number of updates handed to the surface so far.
    pub fn applications(&self) -> u64 {
        self.shared.applications.load(Ordering::SeqCst)
    }

    pub fn submit(
        &self,
        list: List,
        on_complete: impl FnOnce(Result<(), ReconcilerError>) + Send + 'static,
    ) {
        self.submit_with(list, self.shared.config.animated, on_complete)
    }

    /// Like [`submit`](Self::submit) with an explicit animation flag. When
    /// submissions are coalesced the latest flag wins.
    pub fn submit_with(
        &self,
        list: List,
        animated: bool,
        on_complete: impl FnOnce(Result<(), ReconcilerError>) + Send + 'static,
    ) {
        if let Err(err) = list.validate() {
            warn!("UpdateQueue: rejected submission: {}", err);
            on_complete(Err(err));
            return;
        }

        let target = Target {
            list: Arc::new(list),
            animated,
            waiters: vec![Box::new(on_complete)],
        };

        let start = {
            let mut guard = self.shared.lock_state();
            let state = &mut *guard;
            if let Phase::Applying { pending } = &mut state.phase {
                match pending {
                    Some(queued) => {
                        trace!(
                            "UpdateQueue: coalescing submission, {} waiters",
                            queued.waiters.len() + 1
                        );
                        queued.list = target.list;
                        queued.animated = target.animated;
                        queued.waiters.extend(target.waiters);
                    }
                    None => {
                        trace!("UpdateQueue: queued behind in-flight update");
                        *pending = Some(target);
                    }
                }
                None
            } else {
                state.phase = Phase::Applying { pending: None };
                Some((state.snapshot.clone(), target))
            }
        };

        if let Some((snapshot, target)) = start {
            let shared = Arc::clone(&self.shared);
            run_unnested(Box::new(move || Shared::begin(&shared, snapshot, target)));
        }
    }
}

thread_local! {
    /// Steps deferred by nested calls, drained by the outermost `run_unnested` frame.
    static DEFERRED: RefCell<Option<VecDeque<Box<dyn FnOnce()>>>> = const { RefCell::new(None) };
}

/// Runs `step` now, or after the step already running on this thread returns.
fn run_unnested(step: Box<dyn FnOnce()>) {
    let first = DEFERRED.with(|slot| {
        let mut slot = slot.borrow_mut();
        match slot.as_mut() {
            Some(deferred) => {
                deferred.push_back(step);
                None
            }
            None => {
                *slot = Some(VecDeque::new());
                Some(step)
            }
        }
    });
    let Some(mut step) = first else {
        return;
    };

    struct Drain;
    impl Drop for Drain {
        fn drop(&mut self) {
            let _ = DEFERRED.with(|slot| slot.borrow_mut().take());
        }
    }
    let _drain = Drain;

    loop {
        step();
        match DEFERRED.with(|slot| slot.borrow_mut().as_mut().and_then(VecDeque::pop_front)) {
            Some(next) => step = next,
            None => break,
        }
    }
}

impl<S> Shared<S> {
    fn lock_state(&self) -> MutexGuard<'_, QueueState> {
        // The state is only ever replaced wholesale, so a poisoned lock still
        // holds a consistent value.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<S: RenderSurface> Shared<S> {
    /// Diffs `target` against `snapshot` and hands the result to the surface.
    /// Must be called with the phase already set to `Applying`.
    fn begin(this: &Arc<Self>, snapshot: Option<Arc<List>>, target: Target) {
        let update = match snapshot {
            None => {
                debug!("UpdateQueue: first apply, resetting surface");
                SurfaceUpdate::Reset {
                    list: Arc::clone(&target.list),
                }
            }
            Some(_) if !this.surface.is_attached() => {
                debug!("UpdateQueue: surface detached, resetting");
                SurfaceUpdate::Reset {
                    list: Arc::clone(&target.list),
                }
            }
            Some(current) => match reconcile(&current, &target.list) {
                Ok(batch) if batch.is_empty() => {
                    trace!("UpdateQueue: no changes, skipping surface");
                    Shared::finish(this, target, Ok(()));
                    return;
                }
                Ok(batch) if batch.change_count() > this.config.batch_update_interrupt_count => {
                    debug!(
                        "UpdateQueue: {} changes exceed interrupt count {}, resetting",
                        batch.change_count(),
                        this.config.batch_update_interrupt_count
                    );
                    SurfaceUpdate::Reset {
                        list: Arc::clone(&target.list),
                    }
                }
                Ok(batch) => SurfaceUpdate::Batch {
                    batch,
                    list: Arc::clone(&target.list),
                    animated: target.animated,
                },
                Err(err) => {
                    warn!("UpdateQueue: reconcile failed: {}", err);
                    Shared::finish(this, target, Err(err));
                    return;
                }
            },
        };

        this.register_kinds(&update);

        let count = this.applications.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(
            "UpdateQueue: applying update #{} ({})",
            count,
            if update.is_reset() { "reset" } else { "batch" }
        );

        let shared = Arc::clone(this);
        let completion = ApplyCompletion::new(move |outcome| {
            Shared::finish(&shared, target, outcome.map_err(ReconcilerError::from));
        });
        this.surface.apply(update, completion);
    }

    fn register_kinds(&self, update: &SurfaceUpdate) {
        let kinds = match update {
            SurfaceUpdate::Reset { list } => list.content_kinds(),
            SurfaceUpdate::Batch { batch, list, .. } => introduced_kinds(batch, list),
        };
        for kind in &kinds {
            self.registry.register(kind);
        }
    }

    /// Records the outcome of the in-flight update, notifies its waiters and
    /// starts the coalesced successor, if any.
    fn finish(this: &Arc<Self>, target: Target, outcome: Result<(), ReconcilerError>) {
        let next = {
            let mut guard = this.lock_state();
            let state = &mut *guard;
            if outcome.is_ok() {
                state.snapshot = Some(Arc::clone(&target.list));
            }
            let pending = match &mut state.phase {
                Phase::Applying { pending } => pending.take(),
                Phase::Idle => {
                    warn!("UpdateQueue: completion arrived while idle");
                    None
                }
            };
            if pending.is_none() {
                state.phase = Phase::Idle;
            }
            pending.map(|next| (state.snapshot.clone(), next))
        };

        match &outcome {
            Ok(()) => trace!("UpdateQueue: update applied, {} waiters", target.waiters.len()),
            Err(err) => warn!("UpdateQueue: update failed, snapshot kept: {}", err),
        }
        for waiter in target.waiters {
            let result = outcome.clone();
            if panic::catch_unwind(AssertUnwindSafe(move || waiter(result))).is_err() {
                warn!("UpdateQueue: completion handler panicked");
            }
        }

        if let Some((snapshot, next)) = next {
            let shared = Arc::clone(this);
            run_unnested(Box::new(move || Shared::begin(&shared, snapshot, next)));
        }
    }
}

impl<S: RenderSurface> fmt::Debug for UpdateQueue<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.lock_state();
        f.debug_struct("UpdateQueue")
            .field("idle", &matches!(state.phase, Phase::Idle))
            .field(
                "snapshot_sections",
                &state.snapshot.as_ref().map(|list| list.sections.len()),
            )
            .field("applications", &self.applications())
            .finish()
    }
}
