//! Risk analysis of a submitted inspection.
//!
//! [`analyze_inspection`] is the only outbound call in the submission flow.
//! It sends one request made of a prompt describing the vehicle and its
//! defects plus the photographs attached to currently failing items, and
//! expects back a JSON object with exactly `summary`, `riskLevel`, and
//! `recommendations`. Transport errors, provider errors, and replies of any
//! other shape all resolve to [`fallback_result`]; the caller never sees a
//! failure.

use roadworthy_inspection::form::InspectionForm;
use roadworthy_inspection_models::{AnalysisResult, EvidenceImage, RiskLevel, Verdict};
use serde::Deserialize;

use crate::AiError;
use crate::providers::{ContentBlock, LlmProvider, StopReason};

/// Summary shown when the analysis service could not be used.
pub const FALLBACK_SUMMARY: &str = "AI safety analysis is temporarily unavailable.";

/// The single recommendation shown when the analysis service could not be
/// used.
pub const FALLBACK_RECOMMENDATION: &str =
    "Manually review all failed items against the Road Traffic Act.";

const SYSTEM_PROMPT: &str = "You are a motor vehicle safety examiner in Trinidad and Tobago. \
You review roadworthiness inspection reports under the Road Traffic Act (Cap. 48:50) and \
public safety principles. Focus on roadworthiness, crash prevention, and regulatory \
compliance. Keep the summary brief and make every recommendation an actionable step.";

/// The fixed result used whenever the analysis call fails.
#[must_use]
pub fn fallback_result() -> AnalysisResult {
    AnalysisResult {
        summary: FALLBACK_SUMMARY.to_string(),
        risk_level: RiskLevel::Medium,
        recommendations: vec![FALLBACK_RECOMMENDATION.to_string()],
    }
}

/// JSON Schema of the expected reply.
#[must_use]
pub fn response_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "summary": {
                "type": "string",
                "description": "A high-level summary of the safety analysis."
            },
            "riskLevel": {
                "type": "string",
                "enum": ["LOW", "MEDIUM", "HIGH"],
                "description": "Risk level: LOW, MEDIUM, or HIGH"
            },
            "recommendations": {
                "type": "array",
                "items": { "type": "string" },
                "description": "Actionable steps to resolve defects."
            }
        },
        "required": ["summary", "riskLevel", "recommendations"],
        "additionalProperties": false
    })
}

/// Builds the prompt text for a form and its verdict.
///
/// Lists every failing item's label and every `label: note` pair. The
/// engine number and odometer are not included.
#[must_use]
pub fn build_prompt(form: &InspectionForm, verdict: Verdict) -> String {
    let details = form.details();

    let defects = form
        .failed_items()
        .map(|item| item.label.as_str())
        .collect::<Vec<_>>();
    let defects = if defects.is_empty() {
        "None".to_string()
    } else {
        defects.join(", ")
    };

    let notes = form
        .checklist()
        .iter()
        .filter_map(|item| {
            item.notes
                .as_deref()
                .map(|note| format!("{}: {note}", item.label))
        })
        .collect::<Vec<_>>();
    let notes = if notes.is_empty() {
        "None".to_string()
    } else {
        notes.join("; ")
    };

    let evidence_count = collect_evidence(form).len();
    let evidence = if evidence_count == 0 {
        "No photographs were attached.".to_string()
    } else {
        format!(
            "Attached are {evidence_count} image(s) of the identified defects for your review."
        )
    };

    format!(
        "Analyze this vehicle inspection report for a vehicle in Trinidad and Tobago.\n\
         Based on the Road Traffic Act (Cap. 48:50) and public safety principles, provide a \
         brief summary of risks and recommendations.\n\
         \n\
         Vehicle Details: {year} {make} {model} ({class})\n\
         Inspection Verdict: {verdict}\n\
         Defects Found: {defects}\n\
         Additional Notes: {notes}\n\
         \n\
         {evidence}\n\
         Focus on roadworthiness, crash prevention, and regulatory compliance.",
        year = details.vehicle_year,
        make = details.vehicle_make,
        model = details.vehicle_model,
        class = details.vehicle_class,
    )
}

/// Photographs to send as evidence: those on currently failing items, in
/// checklist order. A passed item never contributes, even if it still
/// carries a photograph from before it was toggled.
#[must_use]
pub fn collect_evidence(form: &InspectionForm) -> Vec<&EvidenceImage> {
    form.failed_items()
        .filter_map(|item| item.image.as_ref())
        .collect()
}

/// Builds the full request content: the prompt followed by the evidence.
#[must_use]
pub fn build_request_content(form: &InspectionForm, verdict: Verdict) -> Vec<ContentBlock> {
    std::iter::once(ContentBlock::Text {
        text: build_prompt(form, verdict),
    })
    .chain(
        collect_evidence(form)
            .into_iter()
            .map(|image| ContentBlock::Image {
                image: image.clone(),
            }),
    )
    .collect()
}

/// The reply shape. Unknown fields are rejected.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct RawAnalysis {
    summary: String,
    risk_level: RiskLevel,
    recommendations: Vec<String>,
}

/// Parses a model reply into an [`AnalysisResult`].
///
/// Accepts the JSON object on its own or wrapped in a Markdown code fence.
///
/// # Errors
///
/// Returns [`AiError::Json`] if the text is not a JSON object of the
/// expected shape, or [`AiError::InvalidResponse`] if the summary is blank.
pub fn parse_analysis(text: &str) -> Result<AnalysisResult, AiError> {
    let raw: RawAnalysis = serde_json::from_str(strip_code_fence(text))?;

    if raw.summary.trim().is_empty() {
        return Err(AiError::InvalidResponse {
            message: "summary is empty".to_string(),
        });
    }

    Ok(AnalysisResult {
        summary: raw.summary,
        risk_level: raw.risk_level,
        recommendations: raw.recommendations,
    })
}

/// Removes a surrounding Markdown code fence, if present.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string (e.g. `json`) on the opening line.
    let body = rest.split_once('\n').map_or("", |(_, body)| body);
    body.trim_end()
        .strip_suffix("```")
        .unwrap_or(body)
        .trim()
}

async fn request_analysis(
    provider: &dyn LlmProvider,
    form: &InspectionForm,
    verdict: Verdict,
) -> Result<AnalysisResult, AiError> {
    let content = build_request_content(form, verdict);
    log::debug!(
        "Requesting analysis from {} with {} evidence image(s)",
        provider.name(),
        content.len() - 1
    );

    let response = provider
        .generate(SYSTEM_PROMPT, &content, &response_schema())
        .await?;

    match response.stop_reason {
        StopReason::EndTurn => {}
        StopReason::MaxTokens => log::warn!("Analysis reply was truncated at the token limit"),
        StopReason::Refused => {
            return Err(AiError::InvalidResponse {
                message: "provider refused to answer".to_string(),
            });
        }
    }

    parse_analysis(&response.text)
}

/// Analyzes a submitted inspection.
///
/// Called exactly once per submission and never retried. Any failure is
/// logged and replaced by [`fallback_result`].
pub async fn analyze_inspection(
    provider: &dyn LlmProvider,
    form: &InspectionForm,
    verdict: Verdict,
) -> AnalysisResult {
    match request_analysis(provider, form, verdict).await {
        Ok(result) => {
            log::info!(
                "Analysis from {}: {} risk, {} recommendation(s)",
                provider.name(),
                result.risk_level,
                result.recommendations.len()
            );
            result
        }
        Err(e) => {
            log::error!("AI analysis failed: {e}");
            fallback_result()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use roadworthy_inspection_models::FormField;

    use super::*;
    use crate::providers::LlmResponse;

    /// Provider that records what it was sent and replies with a canned
    /// result.
    struct FakeProvider {
        reply: Result<LlmResponse, fn() -> AiError>,
        seen: Mutex<Vec<Vec<ContentBlock>>>,
    }

    impl FakeProvider {
        fn replying(text: &str) -> Self {
            Self {
                reply: Ok(LlmResponse {
                    text: text.to_string(),
                    stop_reason: StopReason::EndTurn,
                }),
                seen: Mutex::new(Vec::new()),
            }
        }

        fn failing(error: fn() -> AiError) -> Self {
            Self {
                reply: Err(error),
                seen: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<Vec<ContentBlock>> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait::async_trait]
    impl LlmProvider for FakeProvider {
        fn name(&self) -> &'static str {
            "fake"
        }

        async fn generate(
            &self,
            _system_prompt: &str,
            content: &[ContentBlock],
            _response_schema: &serde_json::Value,
        ) -> Result<LlmResponse, AiError> {
            self.seen.lock().unwrap().push(content.to_vec());
            match &self.reply {
                Ok(response) => Ok(response.clone()),
                Err(make_error) => Err(make_error()),
            }
        }
    }

    fn hilux() -> InspectionForm {
        InspectionForm::standard()
            .set_field(FormField::VehicleYear, "2019")
            .unwrap()
            .set_field(FormField::VehicleMake, "Toyota")
            .unwrap()
            .set_field(FormField::VehicleModel, "Hilux")
            .unwrap()
            .set_field(FormField::VehicleClass, "COMMERCIAL")
            .unwrap()
            .set_field(FormField::EngineNumber, "2GD-0012345")
            .unwrap()
            .set_field(FormField::Odometer, "98765")
            .unwrap()
    }

    fn passing(form: &InspectionForm) -> InspectionForm {
        let ids: Vec<String> = form.checklist().iter().map(|i| i.id.clone()).collect();
        ids.iter().fold(form.clone(), |f, id| f.set_check(id, true))
    }

    const GOOD_REPLY: &str = r#"{
        "summary": "Brake efficiency is below the legal minimum.",
        "riskLevel": "HIGH",
        "recommendations": ["Replace front brake pads", "Re-test service brake"]
    }"#;

    #[test]
    fn prompt_lists_vehicle_defects_and_notes() {
        let form = passing(&hilux())
            .toggle_check("mech_foot")
            .set_note("mech_foot", "Pulls left under braking")
            .toggle_check("light_rev");
        let prompt = build_prompt(&form, Verdict::Fail);
        assert!(prompt.contains("Vehicle Details: 2019 Toyota Hilux (Commercial (T))"));
        assert!(prompt.contains("Inspection Verdict: FAIL"));
        assert!(prompt.contains(
            "Defects Found: Reverse Lights, Foot Brake (Service Brake Efficiency)"
        ));
        assert!(prompt.contains(
            "Additional Notes: Foot Brake (Service Brake Efficiency): Pulls left under braking"
        ));
    }

    #[test]
    fn prompt_omits_inert_fields() {
        let prompt = build_prompt(&hilux(), Verdict::Fail);
        assert!(!prompt.contains("2GD-0012345"));
        assert!(!prompt.contains("98765"));
    }

    #[test]
    fn prompt_for_clean_vehicle_says_none() {
        let prompt = build_prompt(&passing(&hilux()), Verdict::Pass);
        assert!(prompt.contains("Defects Found: None"));
        assert!(prompt.contains("Additional Notes: None"));
        assert!(prompt.contains("No photographs were attached."));
    }

    #[test]
    fn evidence_only_from_failing_items_in_checklist_order() {
        let tyre = EvidenceImage::jpeg(b"tyre".to_vec());
        let lamp = EvidenceImage::jpeg(b"lamp".to_vec());
        let glass = EvidenceImage::jpeg(b"glass".to_vec());
        let form = passing(&hilux())
            .toggle_check("tire_cond")
            .set_evidence("tire_cond", tyre.clone())
            .toggle_check("light_head")
            .set_evidence("light_head", lamp.clone())
            // Photographed, then re-checked and found fine.
            .toggle_check("vis_wind")
            .set_evidence("vis_wind", glass)
            .toggle_check("vis_wind");

        assert!(form.item("vis_wind").unwrap().image.is_some());
        assert_eq!(collect_evidence(&form), vec![&lamp, &tyre]);
    }

    #[test]
    fn request_content_is_prompt_then_images() {
        let image = EvidenceImage::jpeg(b"horn".to_vec());
        let form = hilux().set_evidence("safe_horn", image.clone());
        let content = build_request_content(&form, Verdict::Fail);
        assert_eq!(content.len(), 2);
        assert!(matches!(content[0], ContentBlock::Text { .. }));
        assert_eq!(content[1], ContentBlock::Image { image });
    }

    #[test]
    fn parses_well_formed_reply() {
        let result = parse_analysis(GOOD_REPLY).unwrap();
        assert_eq!(result.risk_level, RiskLevel::High);
        assert_eq!(result.recommendations.len(), 2);
    }

    #[test]
    fn parses_fenced_reply() {
        let fenced = format!("```json\n{GOOD_REPLY}\n```");
        assert_eq!(parse_analysis(&fenced).unwrap(), parse_analysis(GOOD_REPLY).unwrap());
    }

    #[test]
    fn empty_recommendations_are_allowed() {
        let result =
            parse_analysis(r#"{"summary":"Fine","riskLevel":"LOW","recommendations":[]}"#).unwrap();
        assert!(result.recommendations.is_empty());
    }

    #[test]
    fn rejects_malformed_replies() {
        for text in [
            "",
            "not json",
            r#"{"summary":"x","riskLevel":"SEVERE","recommendations":[]}"#,
            r#"{"summary":"x","riskLevel":"LOW"}"#,
            r#"{"summary":"x","riskLevel":"LOW","recommendations":"fix it"}"#,
            r#"{"summary":"x","riskLevel":"LOW","recommendations":[],"extra":1}"#,
            r#"["summary"]"#,
        ] {
            assert!(parse_analysis(text).is_err(), "accepted {text:?}");
        }
    }

    #[test]
    fn rejects_blank_summary() {
        let err = parse_analysis(r#"{"summary":"  ","riskLevel":"LOW","recommendations":[]}"#)
            .unwrap_err();
        assert!(matches!(err, AiError::InvalidResponse { .. }));
    }

    #[tokio::test]
    async fn successful_analysis_is_returned() {
        let provider = FakeProvider::replying(GOOD_REPLY);
        let result = analyze_inspection(&provider, &hilux(), Verdict::Fail).await;
        assert_eq!(result.risk_level, RiskLevel::High);
        assert_eq!(provider.calls().len(), 1);
    }

    #[tokio::test]
    async fn transport_failure_yields_fallback() {
        let provider = FakeProvider::failing(|| AiError::Provider {
            message: "connection reset".to_string(),
        });
        let result = analyze_inspection(&provider, &hilux(), Verdict::Fail).await;
        assert_eq!(
            result,
            AnalysisResult {
                summary: FALLBACK_SUMMARY.to_string(),
                risk_level: RiskLevel::Medium,
                recommendations: vec![FALLBACK_RECOMMENDATION.to_string()],
            }
        );
        assert_eq!(provider.calls().len(), 1, "must not retry");
    }

    #[tokio::test]
    async fn malformed_reply_yields_fallback() {
        let provider = FakeProvider::replying("I think the car is fine.");
        let result = analyze_inspection(&provider, &hilux(), Verdict::Fail).await;
        assert_eq!(result, fallback_result());
    }

    #[tokio::test]
    async fn refusal_yields_fallback() {
        let provider = FakeProvider {
            reply: Ok(LlmResponse {
                text: GOOD_REPLY.to_string(),
                stop_reason: StopReason::Refused,
            }),
            seen: Mutex::new(Vec::new()),
        };
        let result = analyze_inspection(&provider, &hilux(), Verdict::Fail).await;
        assert_eq!(result, fallback_result());
    }

    #[tokio::test]
    async fn provider_receives_evidence_of_failed_items_only() {
        let image = EvidenceImage::jpeg(b"wipers".to_vec());
        let form = passing(&hilux())
            .set_evidence("vis_wipers", image.clone())
            .toggle_check("vis_wipers")
            .set_evidence("safe_belts", EvidenceImage::jpeg(b"belts".to_vec()));
        let provider = FakeProvider::replying(GOOD_REPLY);
        analyze_inspection(&provider, &form, Verdict::Fail).await;

        let calls = provider.calls();
        let images: Vec<&ContentBlock> = calls[0]
            .iter()
            .filter(|b| matches!(b, ContentBlock::Image { .. }))
            .collect();
        assert_eq!(images, vec![&ContentBlock::Image { image }]);
    }
}
