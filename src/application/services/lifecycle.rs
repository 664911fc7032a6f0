use crate::domain::entities::{PublishBlocker, Record};
use crate::domain::value_objects::LifecycleState;
use crate::shared::error::AppError;

/// Gatekeeper for draft → private → posted moves.
#[derive(Debug, Clone, Copy)]
pub struct LifecyclePolicy {
    min_media_count: usize,
}

impl LifecyclePolicy {
    pub fn new(min_media_count: usize) -> Self {
        Self { min_media_count }
    }

    pub fn min_media_count(&self) -> usize {
        self.min_media_count
    }

    /// Checks a save of `record` against the state currently stored for it
    /// (`None` when the record has never been saved).
    pub fn check_save(
        &self,
        current: Option<LifecycleState>,
        record: &Record,
    ) -> Result<(), AppError> {
        let target = record.lifecycle_state;
        if let Some(current) = current {
            if !current.can_transition_to(target) {
                return Err(AppError::InvalidTransition(format!(
                    "record {} cannot move from {current} to {target}",
                    record.id
                )));
            }
        }
        if target == LifecycleState::Posted {
            self.check_publishable(record)?;
        }
        Ok(())
    }

    pub fn check_publishable(&self, record: &Record) -> Result<(), AppError> {
        let blockers = record.publish_blockers(self.min_media_count);
        if blockers.is_empty() {
            return Ok(());
        }
        Err(AppError::ValidationError(format!(
            "record {} is not publishable: {}",
            record.id,
            describe(&blockers)
        )))
    }

    /// Moves `record` to `target` in place after validating the move.
    pub fn transition(&self, record: &mut Record, target: LifecycleState) -> Result<(), AppError> {
        let current = record.lifecycle_state;
        if !current.can_transition_to(target) {
            return Err(AppError::InvalidTransition(format!(
                "record {} cannot move from {current} to {target}",
                record.id
            )));
        }
        if target == LifecycleState::Posted {
            self.check_publishable(record)?;
        }
        if current != target {
            record.lifecycle_state = target;
            record.touch();
        }
        Ok(())
    }
}

fn describe(blockers: &[PublishBlocker]) -> String {
    blockers
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
