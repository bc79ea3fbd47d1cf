//! Reconciliation engine for sectioned lists.
//!
//! A [`List`] of [`Section`]s of [`Cell`]s is rendered onto a [`RenderSurface`].
//! When a new version is submitted to an [`UpdateQueue`], it is diffed against
//! the version currently shown and the surface receives an [`EditBatch`] of
//! section- and cell-level inserts, deletes, moves and reloads instead of a
//! full redraw. The queue applies batches one at a time in submission order,
//! no matter how many threads submit concurrently.
//!
//! The crate logs through the [`log`] facade and never installs a logger.
mod config;
mod diff_engine;
mod errors;
mod model;
mod prefetch;
mod reconciler;
mod registry;
mod surface;
mod types;
mod update_queue;

pub use config::UpdateQueueConfiguration;
pub use diff_engine::{Diffable, DuplicateId, EditScript, Insert, Move, Update, diff};
pub use errors::{IdentityScope, ReconcilerError, SurfaceError};
pub use model::{Cell, List, Section};
pub use prefetch::{PrefetchHandle, PrefetchPlugin, Prefetcher, upcoming_index_paths};
pub use reconciler::{EditBatch, SectionCellEdits, reconcile};
pub use registry::{KindRegistry, ReuseRegistry, introduced_kinds};
pub use surface::{ApplyCompletion, RenderSurface, SurfaceUpdate};
pub use types::{AnyComponent, Component, ContentKind, IndexPath, ItemId};
pub use update_queue::{CompletionHandler, UpdateQueue};
