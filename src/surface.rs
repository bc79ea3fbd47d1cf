//! Boundary to the widget that actually shows the list
use crate::errors::SurfaceError;
use crate::model::List;
use crate::reconciler::EditBatch;
use log::warn;
use std::fmt;
use std::sync::Arc;

/// One unit of work handed to a [`RenderSurface`].
#[derive(Debug, Clone)]
pub enum SurfaceUpdate {
    /// Discard whatever is shown and display `list` from scratch.
    Reset { list: Arc<List> },
    /// Transition incrementally; `list` is the version the batch leads to.
    Batch {
        batch: EditBatch,
        list: Arc<List>,
        animated: bool,
    },
}

impl SurfaceUpdate {
    /// The version the surface shows once the update is applied.
    pub fn target(&self) -> &Arc<List> {
        match self {
            SurfaceUpdate::Reset { list } | SurfaceUpdate::Batch { list, .. } => list,
        }
    }

    pub fn is_reset(&self) -> bool {
        matches!(self, SurfaceUpdate::Reset { .. })
    }
}

type CompletionCallback = Box<dyn FnOnce(Result<(), SurfaceError>) + Send + 'static>;

/// Move-only token a surface consumes to report that an update finished.
///
/// Dropping the token without completing leaves the update queue waiting
/// forever; this is logged but not recovered from.
pub struct ApplyCompletion {
    callback: Option<CompletionCallback>,
}

impl ApplyCompletion {
    pub fn new(callback: impl FnOnce(Result<(), SurfaceError>) + Send + 'static) -> Self {
        ApplyCompletion {
            callback: Some(Box::new(callback)),
        }
    }

    pub fn complete(mut self, outcome: Result<(), SurfaceError>) {
        if let Some(callback) = self.callback.take() {
            callback(outcome);
        }
    }

    pub fn succeed(self) {
        self.complete(Ok(()))
    }

    pub fn fail(self, reason: impl Into<String>) {
        self.complete(Err(SurfaceError::new(reason)))
    }
}

impl Drop for ApplyCompletion {
    fn drop(&mut self) {
        if self.callback.is_some() {
            warn!("ApplyCompletion dropped without reporting an outcome; the update queue will stall");
        }
    }
}

impl fmt::Debug for ApplyCompletion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApplyCompletion")
            .field("pending", &self.callback.is_some())
            .finish()
    }
}

/// A mutable rendering surface.
///
/// `apply` should return promptly and report through `completion` once the
/// transition (including any animation) is done. Implementations treat a
/// failed update as not applied at all.
pub trait RenderSurface: Send + Sync + 'static {
    fn apply(&self, update: SurfaceUpdate, completion: ApplyCompletion);

    /// Whether the surface is part of a visible hierarchy. Detached surfaces
    /// only ever receive [`SurfaceUpdate::Reset`].
    fn is_attached(&self) -> bool {
        true
    }
}

impl<S: RenderSurface + ?Sized> RenderSurface for Arc<S> {
    fn apply(&self, update: SurfaceUpdate, completion: ApplyCompletion) {
        (**self).apply(update, completion)
    }

    fn is_attached(&self) -> bool {
        (**self).is_attached()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn completion_delivers_outcome_once() {
        let (tx, rx) = mpsc::channel();
        let completion = ApplyCompletion::new(move |outcome| tx.send(outcome).unwrap());
        completion.fail("gone");
        assert_eq!(rx.recv().unwrap(), Err(SurfaceError::new("gone")));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn dropped_completion_never_fires() {
        let (tx, rx) = mpsc::channel::<Result<(), SurfaceError>>();
        drop(ApplyCompletion::new(move |outcome| tx.send(outcome).unwrap()));
        assert!(rx.recv().is_err());
    }

    #[test]
    fn reset_targets_its_list() {
        let list = Arc::new(List::empty());
        let update = SurfaceUpdate::Reset { list: Arc::clone(&list) };
        assert!(update.is_reset());
        assert!(Arc::ptr_eq(update.target(), &list));
    }
}
