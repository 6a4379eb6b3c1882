#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Inspection submission state machine.
//!
//! An [`InspectionSession`] owns the live form and moves through three
//! phases:
//!
//! ```text
//! EDITING --submit--> SUBMITTING --analysis resolves--> RESULT_READY
//!    ^                                                      |
//!    +------------------ edit again / new inspection -------+
//! ```
//!
//! Edits are only accepted while editing, and a second submission cannot
//! start while one is in flight. The analysis call always resolves (to a
//! real result or the fallback), so SUBMITTING always reaches
//! RESULT_READY.

use roadworthy_ai::analysis::analyze_inspection;
use roadworthy_ai::providers::LlmProvider;
use roadworthy_inspection::FormError;
use roadworthy_inspection::form::InspectionForm;
use roadworthy_inspection::validation::missing_required_fields;
use roadworthy_inspection::verdict::compute_verdict;
use roadworthy_inspection_models::{AnalysisResult, FormField, Verdict};
use strum_macros::{AsRefStr, Display};
use thiserror::Error;

/// Where the session is in the submission cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    /// The form accepts edits.
    Editing,
    /// The verdict is computed and the analysis call is in flight.
    Submitting,
    /// Verdict and analysis are available for display.
    ResultReady,
}

/// Errors from session transitions.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The requested action needs the session to be in another phase.
    #[error("Cannot {action} while {phase}")]
    WrongPhase {
        /// What was attempted.
        action: &'static str,
        /// The phase the session was in.
        phase: Phase,
    },

    /// Required identification fields are blank.
    #[error("Missing required fields: {}", format_fields(.fields))]
    MissingFields {
        /// The blank fields, in form order.
        fields: Vec<FormField>,
    },

    /// A form edit was rejected.
    #[error(transparent)]
    Form(#[from] FormError),
}

fn format_fields(fields: &[FormField]) -> String {
    fields
        .iter()
        .map(|field| field.label())
        .collect::<Vec<_>>()
        .join(", ")
}

/// A submission that has started but whose analysis has not resolved.
#[derive(Debug, Clone)]
pub struct PendingSubmission {
    /// The form as submitted, with its status set from the verdict.
    pub form: InspectionForm,
    /// The computed verdict.
    pub verdict: Verdict,
}

/// The live inspection and its submission state.
#[derive(Debug, Clone)]
pub struct InspectionSession {
    form: InspectionForm,
    phase: Phase,
    analysis: Option<AnalysisResult>,
}

impl InspectionSession {
    /// Starts a session in the editing phase.
    #[must_use]
    pub const fn new(form: InspectionForm) -> Self {
        Self {
            form,
            phase: Phase::Editing,
            analysis: None,
        }
    }

    /// The current form snapshot.
    #[must_use]
    pub const fn form(&self) -> &InspectionForm {
        &self.form
    }

    /// The current phase.
    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    /// The analysis of the last submission, once it has resolved.
    #[must_use]
    pub const fn analysis(&self) -> Option<&AnalysisResult> {
        self.analysis.as_ref()
    }

    fn require(&self, phase: Phase, action: &'static str) -> Result<(), SessionError> {
        if self.phase == phase {
            Ok(())
        } else {
            Err(SessionError::WrongPhase {
                action,
                phase: self.phase,
            })
        }
    }

    /// Replaces the form with the snapshot produced by `edit`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::WrongPhase`] unless the session is editing.
    pub fn apply(
        &mut self,
        edit: impl FnOnce(&InspectionForm) -> InspectionForm,
    ) -> Result<(), SessionError> {
        self.require(Phase::Editing, "edit the form")?;
        self.form = edit(&self.form);
        Ok(())
    }

    /// Like [`InspectionSession::apply`], for edits that can be rejected.
    /// A rejected edit leaves the form unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::WrongPhase`] unless the session is editing,
    /// or [`SessionError::Form`] if the edit is rejected.
    pub fn try_apply(
        &mut self,
        edit: impl FnOnce(&InspectionForm) -> Result<InspectionForm, FormError>,
    ) -> Result<(), SessionError> {
        self.require(Phase::Editing, "edit the form")?;
        self.form = edit(&self.form)?;
        Ok(())
    }

    /// Starts a submission: checks required fields, computes the verdict,
    /// records it on the form, and moves to SUBMITTING.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::WrongPhase`] unless the session is editing,
    /// or [`SessionError::MissingFields`] if required fields are blank. The
    /// session is unchanged on error.
    pub fn begin_submission(&mut self) -> Result<PendingSubmission, SessionError> {
        self.require(Phase::Editing, "submit")?;

        let missing = missing_required_fields(self.form.details());
        if !missing.is_empty() {
            return Err(SessionError::MissingFields { fields: missing });
        }

        let verdict = compute_verdict(self.form.checklist());
        self.form = self.form.with_verdict(verdict);
        self.phase = Phase::Submitting;
        log::info!(
            "Submitted inspection of {}: {verdict}",
            self.form.details().vehicle_plate
        );

        Ok(PendingSubmission {
            form: self.form.clone(),
            verdict,
        })
    }

    /// Finishes a submission with its analysis and moves to RESULT_READY.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::WrongPhase`] unless a submission is in
    /// flight.
    pub fn complete_submission(&mut self, analysis: AnalysisResult) -> Result<(), SessionError> {
        self.require(Phase::Submitting, "complete a submission")?;
        self.analysis = Some(analysis);
        self.phase = Phase::ResultReady;
        Ok(())
    }

    /// Runs a whole submission: [`begin_submission`], the analysis call,
    /// then [`complete_submission`].
    ///
    /// [`begin_submission`]: InspectionSession::begin_submission
    /// [`complete_submission`]: InspectionSession::complete_submission
    ///
    /// # Errors
    ///
    /// Returns the errors of [`InspectionSession::begin_submission`]. Once
    /// the submission has started it always completes.
    pub async fn submit(&mut self, provider: &dyn LlmProvider) -> Result<Verdict, SessionError> {
        let pending = self.begin_submission()?;
        let analysis = analyze_inspection(provider, &pending.form, pending.verdict).await;
        self.complete_submission(analysis)?;
        Ok(pending.verdict)
    }

    /// Returns from the result view to the form, keeping every entry. The
    /// recorded verdict and the analysis are dropped; the status is pending
    /// again until the next submission.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::WrongPhase`] unless a result is showing.
    pub fn edit_again(&mut self) -> Result<(), SessionError> {
        self.require(Phase::ResultReady, "edit again")?;
        self.form = self.form.clear_verdict();
        self.analysis = None;
        self.phase = Phase::Editing;
        Ok(())
    }

    /// Starts a new inspection: the checklist returns to its initial
    /// snapshot and the status to pending, while the identification fields
    /// are kept.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::WrongPhase`] while a submission is in
    /// flight.
    pub fn new_inspection(&mut self) -> Result<(), SessionError> {
        if self.phase == Phase::Submitting {
            return Err(SessionError::WrongPhase {
                action: "start a new inspection",
                phase: self.phase,
            });
        }
        self.form = self.form.reset_checklist();
        self.analysis = None;
        self.phase = Phase::Editing;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use roadworthy_ai::AiError;
    use roadworthy_ai::analysis::fallback_result;
    use roadworthy_ai::providers::{ContentBlock, LlmResponse, StopReason, UnconfiguredProvider};
    use roadworthy_inspection_models::{InspectionStatus, RiskLevel};

    use super::*;

    struct CannedProvider;

    #[async_trait::async_trait]
    impl LlmProvider for CannedProvider {
        fn name(&self) -> &'static str {
            "canned"
        }

        async fn generate(
            &self,
            _system_prompt: &str,
            _content: &[ContentBlock],
            _response_schema: &serde_json::Value,
        ) -> Result<LlmResponse, AiError> {
            Ok(LlmResponse {
                text: r#"{"summary":"Roadworthy.","riskLevel":"LOW","recommendations":[]}"#
                    .to_string(),
                stop_reason: StopReason::EndTurn,
            })
        }
    }

    fn filled_form() -> InspectionForm {
        [
            (FormField::InspectorName, "K. Mohammed"),
            (FormField::VehiclePlate, "PDD 1234"),
            (FormField::VehicleMake, "Nissan"),
            (FormField::VehicleModel, "Tiida"),
            (FormField::VinNumber, "3N1BC1CP5AL123456"),
        ]
        .into_iter()
        .fold(InspectionForm::standard(), |form, (field, value)| {
            form.set_field(field, value).unwrap()
        })
    }

    fn all_passed(form: &InspectionForm) -> InspectionForm {
        let ids: Vec<String> = form.checklist().iter().map(|i| i.id.clone()).collect();
        ids.iter().fold(form.clone(), |f, id| f.set_check(id, true))
    }

    #[test]
    fn starts_editing() {
        let session = InspectionSession::new(filled_form());
        assert_eq!(session.phase(), Phase::Editing);
        assert!(session.analysis().is_none());
        assert_eq!(session.form().overall_status(), InspectionStatus::Pending);
    }

    #[test]
    fn phase_displays_screaming_case() {
        assert_eq!(Phase::ResultReady.to_string(), "RESULT_READY");
    }

    #[test]
    fn missing_fields_block_submission() {
        let mut session = InspectionSession::new(InspectionForm::standard());
        let err = session.begin_submission().unwrap_err();
        match err {
            SessionError::MissingFields { fields } => {
                assert!(fields.contains(&FormField::InspectorName));
                assert!(!fields.contains(&FormField::InspectionDate));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(session.phase(), Phase::Editing);
    }

    #[test]
    fn missing_fields_message_lists_labels() {
        let err = SessionError::MissingFields {
            fields: vec![FormField::VehiclePlate, FormField::VinNumber],
        };
        assert_eq!(
            err.to_string(),
            "Missing required fields: Plate number, Chassis/VIN number"
        );
    }

    #[test]
    fn cannot_resubmit_or_edit_while_submitting() {
        let mut session = InspectionSession::new(filled_form());
        let pending = session.begin_submission().unwrap();
        assert_eq!(pending.verdict, Verdict::Fail);
        assert_eq!(session.phase(), Phase::Submitting);
        assert_eq!(session.form().overall_status(), InspectionStatus::Fail);

        assert!(matches!(
            session.begin_submission(),
            Err(SessionError::WrongPhase {
                phase: Phase::Submitting,
                ..
            })
        ));
        assert!(session.apply(|f| f.toggle_check("id_chassis")).is_err());
        assert!(session.new_inspection().is_err());
        assert!(session.edit_again().is_err());
    }

    #[test]
    fn complete_requires_submission_in_flight() {
        let mut session = InspectionSession::new(filled_form());
        assert!(session.complete_submission(fallback_result()).is_err());
    }

    #[test]
    fn rejected_edit_leaves_form_unchanged() {
        let mut session = InspectionSession::new(filled_form());
        let before = session.form().clone();
        let err = session
            .try_apply(|f| f.set_field(FormField::VehicleClass, "Zeppelin"))
            .unwrap_err();
        assert!(matches!(err, SessionError::Form(_)));
        assert_eq!(session.form(), &before);
    }

    #[tokio::test]
    async fn submit_runs_to_result_ready() {
        let mut session = InspectionSession::new(all_passed(&filled_form()));
        let verdict = session.submit(&CannedProvider).await.unwrap();
        assert_eq!(verdict, Verdict::Pass);
        assert_eq!(session.phase(), Phase::ResultReady);
        assert_eq!(session.form().overall_status(), InspectionStatus::Pass);
        assert_eq!(session.analysis().unwrap().risk_level, RiskLevel::Low);
    }

    #[tokio::test]
    async fn failed_analysis_still_reaches_result_ready() {
        let mut session = InspectionSession::new(filled_form());
        let provider = UnconfiguredProvider::new("no credentials".to_string());
        session.submit(&provider).await.unwrap();
        assert_eq!(session.phase(), Phase::ResultReady);
        assert_eq!(session.analysis(), Some(&fallback_result()));
    }

    #[tokio::test]
    async fn edit_again_keeps_entries() {
        let mut session = InspectionSession::new(filled_form());
        session
            .apply(|f| f.set_note("light_rev", "Bulb out"))
            .unwrap();
        session.submit(&CannedProvider).await.unwrap();
        session.edit_again().unwrap();

        assert_eq!(session.phase(), Phase::Editing);
        assert!(session.analysis().is_none());
        assert_eq!(session.form().overall_status(), InspectionStatus::Pending);
        assert_eq!(session.form().details().vehicle_plate, "PDD 1234");
        assert_eq!(
            session.form().item("light_rev").unwrap().notes.as_deref(),
            Some("Bulb out")
        );
        session.apply(|f| f.toggle_check("light_rev")).unwrap();
    }

    #[tokio::test]
    async fn new_inspection_resets_checklist_and_keeps_details() {
        let mut session = InspectionSession::new(all_passed(&filled_form()));
        session.submit(&CannedProvider).await.unwrap();
        session.new_inspection().unwrap();

        assert_eq!(session.phase(), Phase::Editing);
        assert_eq!(session.form().overall_status(), InspectionStatus::Pending);
        assert_eq!(session.form().passed_count(), 0);
        assert_eq!(session.form().details().vehicle_plate, "PDD 1234");
    }
}
