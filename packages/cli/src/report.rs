//! Result view for a submitted inspection.

use std::fmt::Write as _;

use roadworthy_cli_utils::percent_bar;
use roadworthy_inspection::form::InspectionForm;
use roadworthy_inspection::verdict::MAX_NON_CRITICAL_FAILURES;
use roadworthy_inspection_models::{
    AnalysisResult, ChecklistItem, InspectionDetails, InspectionStatus,
};
use serde::Serialize;

/// A failing checklist item as shown in the report.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedItem {
    pub id: String,
    pub label: String,
    pub category: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub has_evidence: bool,
}

impl From<&ChecklistItem> for FailedItem {
    fn from(item: &ChecklistItem) -> Self {
        Self {
            id: item.id.clone(),
            label: item.label.clone(),
            category: item.category.clone(),
            notes: item.notes.clone(),
            has_evidence: item.image.is_some(),
        }
    }
}

/// Everything the result view shows.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InspectionReport {
    pub checklist_version: String,
    pub status: InspectionStatus,
    pub details: InspectionDetails,
    pub passed: usize,
    pub total: usize,
    pub progress_percent: usize,
    pub critical_failures: Vec<FailedItem>,
    pub non_critical_failures: Vec<FailedItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis: Option<AnalysisResult>,
}

impl InspectionReport {
    /// Builds the report for a form and its analysis (if resolved).
    #[must_use]
    pub fn new(form: &InspectionForm, analysis: Option<&AnalysisResult>) -> Self {
        Self {
            checklist_version: form.definition().version.clone(),
            status: form.overall_status(),
            details: form.details().clone(),
            passed: form.passed_count(),
            total: form.checklist().len(),
            progress_percent: form.progress_percent(),
            critical_failures: form.critical_failures().map(FailedItem::from).collect(),
            non_critical_failures: form.non_critical_failures().map(FailedItem::from).collect(),
            analysis: analysis.cloned(),
        }
    }

    /// Renders the report as terminal text.
    #[must_use]
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        let d = &self.details;

        let _ = writeln!(out, "Inspection result: {}", self.status);
        let _ = writeln!(out, "{}", "=".repeat(60));
        let _ = writeln!(
            out,
            "Vehicle:   {} {} {} ({})",
            d.vehicle_year, d.vehicle_make, d.vehicle_model, d.vehicle_class
        );
        let _ = writeln!(out, "Plate:     {}", d.vehicle_plate);
        let _ = writeln!(out, "VIN:       {}", d.vin_number);
        let _ = writeln!(
            out,
            "Inspector: {} on {}",
            d.inspector_name, d.inspection_date
        );
        let _ = writeln!(
            out,
            "Checks:    {}/{} {}",
            self.passed,
            self.total,
            percent_bar(self.progress_percent, 20)
        );

        write_failures(&mut out, "Critical failures", &self.critical_failures);
        write_failures(
            &mut out,
            &format!("Non-critical failures (limit {MAX_NON_CRITICAL_FAILURES})"),
            &self.non_critical_failures,
        );

        if let Some(analysis) = &self.analysis {
            let _ = writeln!(out);
            let _ = writeln!(out, "Safety analysis (risk: {})", analysis.risk_level);
            let _ = writeln!(out, "{}", "-".repeat(60));
            let _ = writeln!(out, "{}", analysis.summary);
            if !analysis.recommendations.is_empty() {
                let _ = writeln!(out);
                for (i, rec) in analysis.recommendations.iter().enumerate() {
                    let _ = writeln!(out, "{}. {rec}", i + 1);
                }
            }
        }

        let _ = writeln!(out);
        let _ = writeln!(out, "Checklist {}", self.checklist_version);
        out
    }
}

fn write_failures(out: &mut String, heading: &str, items: &[FailedItem]) {
    if items.is_empty() {
        return;
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "{heading}:");
    for item in items {
        let photo = if item.has_evidence { " [photo]" } else { "" };
        let _ = writeln!(out, "  - {} ({}){photo}", item.label, item.category);
        if let Some(notes) = &item.notes {
            let _ = writeln!(out, "      {notes}");
        }
    }
}

#[cfg(test)]
mod tests {
    use roadworthy_inspection::verdict::compute_verdict;
    use roadworthy_inspection_models::{EvidenceImage, RiskLevel};

    use super::*;

    fn submitted_form() -> InspectionForm {
        let form = InspectionForm::standard();
        let ids: Vec<String> = form.checklist().iter().map(|i| i.id.clone()).collect();
        let form = ids
            .iter()
            .fold(form, |f, id| f.set_check(id, true))
            .set_check("mech_foot", false)
            .set_note("mech_foot", "Pedal fades")
            .set_evidence("mech_foot", EvidenceImage::jpeg(vec![1, 2, 3]))
            .set_check("light_rev", false);
        let verdict = compute_verdict(form.checklist());
        form.with_verdict(verdict)
    }

    #[test]
    fn splits_failures_by_criticality() {
        let report = InspectionReport::new(&submitted_form(), None);
        assert_eq!(report.status, InspectionStatus::Fail);
        assert_eq!(report.passed, 20);
        assert_eq!(report.total, 22);
        assert_eq!(report.critical_failures.len(), 1);
        assert!(report.critical_failures[0].has_evidence);
        assert_eq!(report.non_critical_failures[0].id, "light_rev");
    }

    #[test]
    fn json_omits_pending_analysis() {
        let report = InspectionReport::new(&submitted_form(), None);
        let json = serde_json::to_value(&report).unwrap();
        assert!(json.get("analysis").is_none());
        assert_eq!(json["status"], "FAIL");
        assert_eq!(json["criticalFailures"][0]["notes"], "Pedal fades");
    }

    #[test]
    fn text_includes_analysis() {
        let analysis = AnalysisResult {
            summary: "Braking is unsafe.".to_string(),
            risk_level: RiskLevel::High,
            recommendations: vec!["Replace the brake master cylinder.".to_string()],
        };
        let text = InspectionReport::new(&submitted_form(), Some(&analysis)).to_text();
        assert!(text.starts_with("Inspection result: FAIL"));
        assert!(text.contains("Pedal fades"));
        assert!(text.contains("[photo]"));
        assert!(text.contains("Safety analysis (risk: HIGH)"));
        assert!(text.contains("1. Replace the brake master cylinder."));
    }
}
