// /src/errors.rs
//! Error kinds reported through the update pipeline's completion channel
use crate::types::ItemId;
use std::fmt;
use thiserror::Error;

/// Where a duplicate identity was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityScope {
    /// Two sections of one list share an id.
    Sections,
    /// Two cells of the named section share an id.
    Cells { section: ItemId },
}

impl fmt::Display for IdentityScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdentityScope::Sections => write!(f, "sections"),
            IdentityScope::Cells { section } => write!(f, "cells of section '{}'", section),
        }
    }
}

/// Failure reported by a render surface for one application.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{reason}")]
pub struct SurfaceError {
    pub reason: String,
}

impl SurfaceError {
    pub fn new(reason: impl Into<String>) -> Self {
        SurfaceError { reason: reason.into() }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReconcilerError {
    #[error("Duplicate identity '{id}' among {scope}")]
    DuplicateIdentity { scope: IdentityScope, id: ItemId },

    #[error("Render surface failed to apply batch: {0}")]
    SurfaceApplyFailed(#[from] SurfaceError),

    #[error("Invalid configuration: {details}")]
    InvalidConfiguration { details: String },

    #[error("Serialization error: {0}")]
    SerdeError(String),
}

impl ReconcilerError {
    pub(crate) fn duplicate_section(id: &ItemId) -> Self {
        ReconcilerError::DuplicateIdentity {
            scope: IdentityScope::Sections,
            id: id.clone(),
        }
    }

    pub(crate) fn duplicate_cell(section: &ItemId, id: &ItemId) -> Self {
        ReconcilerError::DuplicateIdentity {
            scope: IdentityScope::Cells {
                section: section.clone(),
            },
            id: id.clone(),
        }
    }
}

// serde_json::Error is not Clone, and one error may be delivered to several
// coalesced waiters.
impl From<serde_json::Error> for ReconcilerError {
    fn from(err: serde_json::Error) -> Self {
        ReconcilerError::SerdeError(err.to_string())
    }
}
