//! Central transition tables.
//!
//! Status fields are never assigned directly by operations; each operation
//! names an action and the table decides whether the current status admits
//! it and what the next status is.

use terra_types::{CaseStatus, VerificationStatus};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AssetAction {
    AssignInspector,
    ScheduleInspection,
    SubmitInspectionReport,
    Verify,
    Reject,
}

use VerificationStatus as V;

const ASSET_TABLE: &[(AssetAction, &[VerificationStatus], VerificationStatus)] = &[
    (AssetAction::AssignInspector, &[V::Pending], V::Assigned),
    (AssetAction::ScheduleInspection, &[V::Assigned], V::InspectionScheduled),
    (AssetAction::SubmitInspectionReport, &[V::InspectionScheduled], V::Inspected),
    (AssetAction::Verify, &[V::Inspected, V::Pending, V::Assigned], V::Verified),
    (AssetAction::Reject, &[V::Inspected, V::Pending, V::Assigned], V::Rejected),
];

impl AssetAction {
    pub const ALL: [AssetAction; 5] = [
        Self::AssignInspector,
        Self::ScheduleInspection,
        Self::SubmitInspectionReport,
        Self::Verify,
        Self::Reject,
    ];

    fn row(self) -> (&'static [VerificationStatus], VerificationStatus) {
        ASSET_TABLE
            .iter()
            .find(|(action, _, _)| *action == self)
            .map(|(_, from, to)| (*from, *to))
            .unwrap_or((&[], V::Pending))
    }

    pub fn target(self) -> VerificationStatus {
        self.row().1
    }

    /// The next status, or `None` if `current` does not admit this action.
    pub fn apply(self, current: VerificationStatus) -> Option<VerificationStatus> {
        let (from, to) = self.row();
        from.contains(&current).then_some(to)
    }

    pub fn describe(self) -> &'static str {
        match self {
            Self::AssignInspector => "assign an inspector to an asset",
            Self::ScheduleInspection => "schedule an asset inspection",
            Self::SubmitInspectionReport => "submit an asset inspection report",
            Self::Verify => "verify an asset",
            Self::Reject => "reject an asset",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CaseAction {
    AssignInspector,
    SubmitInspectionReport,
    Approve,
    Reject,
    Finalize,
}

use CaseStatus as C;

const CASE_TABLE: &[(CaseAction, &[CaseStatus], CaseStatus)] = &[
    (CaseAction::AssignInspector, &[C::Pending], C::InspectionScheduled),
    (CaseAction::SubmitInspectionReport, &[C::InspectionScheduled], C::Inspected),
    (CaseAction::Approve, &[C::Inspected], C::Approved),
    (CaseAction::Reject, &[C::Inspected], C::Rejected),
    (CaseAction::Finalize, &[C::Approved], C::Completed),
];

impl CaseAction {
    pub const ALL: [CaseAction; 5] = [
        Self::AssignInspector,
        Self::SubmitInspectionReport,
        Self::Approve,
        Self::Reject,
        Self::Finalize,
    ];

    fn row(self) -> (&'static [CaseStatus], CaseStatus) {
        CASE_TABLE
            .iter()
            .find(|(action, _, _)| *action == self)
            .map(|(_, from, to)| (*from, *to))
            .unwrap_or((&[], C::Pending))
    }

    pub fn target(self) -> CaseStatus {
        self.row().1
    }

    pub fn apply(self, current: CaseStatus) -> Option<CaseStatus> {
        let (from, to) = self.row();
        from.contains(&current).then_some(to)
    }

    pub fn describe(self) -> &'static str {
        match self {
            Self::AssignInspector => "assign an inspector to a case",
            Self::SubmitInspectionReport => "submit a case inspection report",
            Self::Approve => "approve a transfer",
            Self::Reject => "reject a transfer",
            Self::Finalize => "finalize a transfer",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ASSET_STATUSES: [VerificationStatus; 6] = [
        V::Pending,
        V::Assigned,
        V::InspectionScheduled,
        V::Inspected,
        V::Verified,
        V::Rejected,
    ];

    const CASE_STATUSES: [CaseStatus; 6] = [
        C::Pending,
        C::InspectionScheduled,
        C::Inspected,
        C::Approved,
        C::Rejected,
        C::Completed,
    ];

    #[test]
    fn every_action_has_a_row() {
        for action in AssetAction::ALL {
            assert!(ASSET_TABLE.iter().any(|(a, _, _)| *a == action));
        }
        for action in CaseAction::ALL {
            assert!(CASE_TABLE.iter().any(|(a, _, _)| *a == action));
        }
    }

    #[test]
    fn asset_happy_path() {
        let mut status = V::Pending;
        for action in [
            AssetAction::AssignInspector,
            AssetAction::ScheduleInspection,
            AssetAction::SubmitInspectionReport,
            AssetAction::Verify,
        ] {
            status = action.apply(status).unwrap();
        }
        assert_eq!(status, V::Verified);
    }

    #[test]
    fn asset_shortcuts_to_verdict() {
        assert_eq!(AssetAction::Verify.apply(V::Pending), Some(V::Verified));
        assert_eq!(AssetAction::Reject.apply(V::Assigned), Some(V::Rejected));
        assert_eq!(AssetAction::Verify.apply(V::InspectionScheduled), None);
    }

    #[test]
    fn verdicts_are_final() {
        for action in AssetAction::ALL {
            assert_eq!(action.apply(V::Verified), None, "{action:?}");
            assert_eq!(action.apply(V::Rejected), None, "{action:?}");
        }
        for action in CaseAction::ALL {
            assert_eq!(action.apply(C::Rejected), None, "{action:?}");
            assert_eq!(action.apply(C::Completed), None, "{action:?}");
        }
    }

    #[test]
    fn no_action_is_a_self_loop() {
        for status in ASSET_STATUSES {
            for action in AssetAction::ALL {
                assert_ne!(action.apply(status), Some(status));
            }
        }
        for status in CASE_STATUSES {
            for action in CaseAction::ALL {
                assert_ne!(action.apply(status), Some(status));
            }
        }
    }

    #[test]
    fn case_path_through_approval() {
        let mut status = C::Pending;
        for action in [
            CaseAction::AssignInspector,
            CaseAction::SubmitInspectionReport,
            CaseAction::Approve,
            CaseAction::Finalize,
        ] {
            status = action.apply(status).unwrap();
        }
        assert_eq!(status, C::Completed);
        assert_eq!(CaseAction::Reject.apply(C::Approved), None);
        assert_eq!(CaseAction::Approve.apply(C::InspectionScheduled), None);
    }
}
