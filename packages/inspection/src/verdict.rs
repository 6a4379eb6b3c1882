//! Pass/fail decision for a checklist.
//!
//! A single failing critical item fails the inspection. Without critical
//! failures, the vehicle still fails once more than
//! [`MAX_NON_CRITICAL_FAILURES`] non-critical items are failing.

use roadworthy_inspection_models::{ChecklistItem, Verdict};

/// Most non-critical failures a passing vehicle may have.
pub const MAX_NON_CRITICAL_FAILURES: usize = 3;

/// The verdict together with the failures that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerdictBreakdown<'a> {
    /// The decision.
    pub verdict: Verdict,
    /// Failing critical items, in checklist order.
    pub critical_failures: Vec<&'a ChecklistItem>,
    /// Failing non-critical items, in checklist order.
    pub non_critical_failures: Vec<&'a ChecklistItem>,
}

/// Computes the verdict for a checklist.
#[must_use]
pub fn compute_verdict(checklist: &[ChecklistItem]) -> Verdict {
    explain_verdict(checklist).verdict
}

/// Computes the verdict and collects the failures behind it.
#[must_use]
pub fn explain_verdict(checklist: &[ChecklistItem]) -> VerdictBreakdown<'_> {
    let (critical_failures, non_critical_failures): (Vec<_>, Vec<_>) = checklist
        .iter()
        .filter(|item| item.is_failed())
        .partition(|item| item.is_critical);

    let verdict = if !critical_failures.is_empty()
        || non_critical_failures.len() > MAX_NON_CRITICAL_FAILURES
    {
        Verdict::Fail
    } else {
        Verdict::Pass
    };

    VerdictBreakdown {
        verdict,
        critical_failures,
        non_critical_failures,
    }
}
