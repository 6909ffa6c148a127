//! Status admissibility for status-sensitive environment mutations.

use std::fmt;

use crate::error::TowerError;
use crate::events::scheduler::TriggerAction;
use crate::models::status::EnvironmentStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GatedOperation {
    Update,
    Delete,
    Start,
    Stop,
}

impl GatedOperation {
    #[cfg(test)]
    pub const ALL: [GatedOperation; 4] = [
        GatedOperation::Update,
        GatedOperation::Delete,
        GatedOperation::Start,
        GatedOperation::Stop,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            GatedOperation::Update => "update",
            GatedOperation::Delete => "delete",
            GatedOperation::Start => "start",
            GatedOperation::Stop => "stop",
        }
    }

    /// Statuses from which the operation may proceed.
    pub fn admissible(&self) -> &'static [EnvironmentStatus] {
        use EnvironmentStatus::*;
        match self {
            GatedOperation::Update => &[Running, UpdatingFailed],
            GatedOperation::Delete => &[Running, Stopped, InitiatingFailed, DestroyingFailed],
            GatedOperation::Start | GatedOperation::Stop => &[Running, Stopped],
        }
    }
}

impl From<TriggerAction> for GatedOperation {
    fn from(action: TriggerAction) -> Self {
        match action {
            TriggerAction::Start => GatedOperation::Start,
            TriggerAction::Stop => GatedOperation::Stop,
        }
    }
}

impl fmt::Display for GatedOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn admits(operation: GatedOperation, status: EnvironmentStatus) -> bool {
    operation.admissible().contains(&status)
}

/// Reject the operation with `InvalidStatus` unless `status` admits it.
pub fn check(
    operation: GatedOperation,
    status: EnvironmentStatus,
    repository: &str,
    branch: &str,
) -> Result<(), TowerError> {
    if admits(operation, status) {
        return Ok(());
    }
    tracing::warn!(
        %operation,
        %status,
        repository,
        branch,
        "Environment status does not admit operation"
    );
    crate::metrics::gate_rejected(operation.as_str());
    Err(TowerError::InvalidStatus {
        operation: operation.as_str(),
        status,
    })
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn pending_admits_nothing() {
        for op in GatedOperation::ALL {
            assert!(!admits(op, EnvironmentStatus::Pending), "{op}");
        }
    }

    #[test]
    fn stopped_environments_cannot_be_updated() {
        assert!(!admits(GatedOperation::Update, EnvironmentStatus::Stopped));
        assert!(admits(GatedOperation::Update, EnvironmentStatus::UpdatingFailed));
    }

    #[test]
    fn delete_table() {
        let admitted: Vec<_> = EnvironmentStatus::ALL
            .into_iter()
            .filter(|s| admits(GatedOperation::Delete, *s))
            .collect();
        assert_eq!(
            admitted,
            vec![
                EnvironmentStatus::Running,
                EnvironmentStatus::Stopped,
                EnvironmentStatus::InitiatingFailed,
                EnvironmentStatus::DestroyingFailed,
            ]
        );
    }

    fn any_status() -> impl Strategy<Value = EnvironmentStatus> {
        prop::sample::select(EnvironmentStatus::ALL.to_vec())
    }

    fn any_operation() -> impl Strategy<Value = GatedOperation> {
        prop::sample::select(GatedOperation::ALL.to_vec())
    }

    proptest! {
        #[test]
        fn check_agrees_with_table(op in any_operation(), status in any_status()) {
            let result = check(op, status, "svc-a", "feat-1");
            prop_assert_eq!(result.is_ok(), op.admissible().contains(&status));
            if let Err(err) = result {
                let is_invalid_status = matches!(err, TowerError::InvalidStatus { .. });
                prop_assert!(is_invalid_status);
            }
        }

        #[test]
        fn trigger_actions_share_one_rule(status in any_status()) {
            prop_assert_eq!(
                admits(TriggerAction::Start.into(), status),
                admits(TriggerAction::Stop.into(), status)
            );
        }
    }
}
