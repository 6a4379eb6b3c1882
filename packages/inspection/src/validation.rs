//! Required-field check run before a form may be submitted.

use roadworthy_inspection_models::{FormField, InspectionDetails};

/// Returns the required fields that are blank, in form order.
#[must_use]
pub fn missing_required_fields(details: &InspectionDetails) -> Vec<FormField> {
    FormField::ALL
        .iter()
        .copied()
        .filter(|field| field.is_required())
        .filter(|field| details.get(*field).trim().is_empty())
        .collect()
}
