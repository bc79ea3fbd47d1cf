//! Update queue configuration
use crate::errors::ReconcilerError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UpdateQueueConfiguration {
    /// Batches with more changes than this are applied as a full reset.
    pub batch_update_interrupt_count: usize,
    /// Default animation flag forwarded with incremental batches.
    pub animated: bool,
}

impl Default for UpdateQueueConfiguration {
    fn default() -> Self {
        UpdateQueueConfiguration {
            batch_update_interrupt_count: 100,
            animated: true,
        }
    }
}

impl UpdateQueueConfiguration {
    /// Parses and validates a JSON configuration; missing fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self, ReconcilerError> {
        let config: UpdateQueueConfiguration = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ReconcilerError> {
        if self.batch_update_interrupt_count == 0 {
            return Err(ReconcilerError::InvalidConfiguration {
                details: "batch_update_interrupt_count must be at least 1".into(),
            });
        }
        Ok(())
    }
}
