//! The inspection form as a sequence of immutable snapshots.
//!
//! Every edit borrows the current [`InspectionForm`] and returns the next
//! one. Edits that name an unknown checklist id are no-ops: the id set is
//! fixed by the [`ChecklistDefinition`], so such a call can only come from
//! a stale caller.

use std::str::FromStr;
use std::sync::Arc;

use roadworthy_inspection_models::{
    ChecklistItem, EvidenceImage, FormField, InspectionDetails, InspectionStatus, Verdict,
    VehicleClass,
};

use crate::FormError;
use crate::checklist::ChecklistDefinition;

/// Pass count for one display category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryProgress {
    /// Category name.
    pub category: String,
    /// Items in the category that have passed.
    pub passed: usize,
    /// Items in the category.
    pub total: usize,
}

impl CategoryProgress {
    /// Share of the category that has passed, as a whole percentage.
    #[must_use]
    pub const fn percent(&self) -> usize {
        percent_rounded(self.passed, self.total)
    }
}

/// `100 × passed / total` rounded half up to a whole number. A zero total
/// reports 0.
#[must_use]
pub const fn percent_rounded(passed: usize, total: usize) -> usize {
    if total == 0 {
        return 0;
    }
    (200 * passed + total) / (2 * total)
}

/// One snapshot of the inspection form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InspectionForm {
    details: InspectionDetails,
    checklist: Vec<ChecklistItem>,
    overall_status: InspectionStatus,
    definition: Arc<ChecklistDefinition>,
}

impl InspectionForm {
    /// Creates a fresh form for the given checklist. The inspection date
    /// defaults to today (UTC).
    #[must_use]
    pub fn new(definition: Arc<ChecklistDefinition>) -> Self {
        let details = InspectionDetails {
            inspection_date: chrono::Utc::now().format("%Y-%m-%d").to_string(),
            ..InspectionDetails::default()
        };

        Self {
            details,
            checklist: definition.initial_items(),
            overall_status: InspectionStatus::Pending,
            definition,
        }
    }

    /// Creates a fresh form for the standard checklist.
    #[must_use]
    pub fn standard() -> Self {
        Self::new(ChecklistDefinition::standard())
    }

    /// Identification fields.
    #[must_use]
    pub const fn details(&self) -> &InspectionDetails {
        &self.details
    }

    /// Checklist items in definition order.
    #[must_use]
    pub fn checklist(&self) -> &[ChecklistItem] {
        &self.checklist
    }

    /// Status of the last submission, or pending.
    #[must_use]
    pub const fn overall_status(&self) -> InspectionStatus {
        self.overall_status
    }

    /// The definition this form's checklist was built from.
    #[must_use]
    pub fn definition(&self) -> &ChecklistDefinition {
        &self.definition
    }

    /// Looks up an item by id.
    #[must_use]
    pub fn item(&self, id: &str) -> Option<&ChecklistItem> {
        self.checklist.iter().find(|item| item.id == id)
    }

    /// Sets one identification field.
    ///
    /// # Errors
    ///
    /// Returns [`FormError::InvalidVehicleClass`] if `field` is
    /// [`FormField::VehicleClass`] and `value` names no known class.
    pub fn set_field(&self, field: FormField, value: &str) -> Result<Self, FormError> {
        let mut next = self.clone();
        let details = &mut next.details;
        match field {
            FormField::InspectorName => details.inspector_name = value.to_string(),
            FormField::InspectionDate => details.inspection_date = value.to_string(),
            FormField::VehiclePlate => details.vehicle_plate = value.to_string(),
            FormField::VehicleMake => details.vehicle_make = value.to_string(),
            FormField::VehicleModel => details.vehicle_model = value.to_string(),
            FormField::VehicleYear => details.vehicle_year = value.to_string(),
            FormField::VehicleClass => {
                details.vehicle_class = VehicleClass::from_str(value.trim()).map_err(|_| {
                    FormError::InvalidVehicleClass {
                        value: value.to_string(),
                    }
                })?;
            }
            FormField::VinNumber => details.vin_number = value.to_string(),
            FormField::EngineNumber => details.engine_number = value.to_string(),
            FormField::Odometer => details.odometer = value.to_string(),
        }
        Ok(next)
    }

    /// Replaces all identification fields at once.
    #[must_use]
    pub fn with_details(&self, details: InspectionDetails) -> Self {
        Self {
            details,
            ..self.clone()
        }
    }

    /// Flips the pass/fail value of one item. Notes and evidence are kept.
    #[must_use]
    pub fn toggle_check(&self, id: &str) -> Self {
        self.update_item(id, |item| item.value = !item.value)
    }

    /// Sets the pass/fail value of one item.
    #[must_use]
    pub fn set_check(&self, id: &str, passed: bool) -> Self {
        self.update_item(id, |item| item.value = passed)
    }

    /// Sets the defect note of one item. Blank text clears the note.
    #[must_use]
    pub fn set_note(&self, id: &str, text: &str) -> Self {
        let note = if text.trim().is_empty() {
            None
        } else {
            Some(text.to_string())
        };
        self.update_item(id, |item| item.notes = note)
    }

    /// Attaches a defect photograph to one item, replacing any previous one.
    #[must_use]
    pub fn set_evidence(&self, id: &str, image: EvidenceImage) -> Self {
        self.update_item(id, |item| item.image = Some(image))
    }

    /// Removes the defect photograph from one item.
    #[must_use]
    pub fn clear_evidence(&self, id: &str) -> Self {
        self.update_item(id, |item| item.image = None)
    }

    /// Restores the checklist to its initial snapshot, clearing every
    /// value, note, and photograph. Identification fields are kept and the
    /// status returns to pending.
    #[must_use]
    pub fn reset_checklist(&self) -> Self {
        Self {
            checklist: self.definition.initial_items(),
            overall_status: InspectionStatus::Pending,
            ..self.clone()
        }
    }

    /// Records the verdict of a submission.
    #[must_use]
    pub fn with_verdict(&self, verdict: Verdict) -> Self {
        Self {
            overall_status: verdict.into(),
            ..self.clone()
        }
    }

    /// Drops a recorded verdict, returning the status to pending. Every
    /// entry is kept.
    #[must_use]
    pub fn clear_verdict(&self) -> Self {
        Self {
            overall_status: InspectionStatus::Pending,
            ..self.clone()
        }
    }

    fn update_item(&self, id: &str, apply: impl FnOnce(&mut ChecklistItem)) -> Self {
        let mut next = self.clone();
        if let Some(item) = next.checklist.iter_mut().find(|item| item.id == id) {
            apply(item);
        } else {
            log::debug!("Ignoring edit for unknown checklist item '{id}'");
        }
        next
    }

    /// Distinct categories in display order.
    #[must_use]
    pub fn categories(&self) -> Vec<&str> {
        let mut categories: Vec<&str> = Vec::new();
        for item in &self.checklist {
            if !categories.contains(&item.category.as_str()) {
                categories.push(&item.category);
            }
        }
        categories
    }

    /// Items belonging to one category, in checklist order.
    pub fn items_in<'a>(&'a self, category: &'a str) -> impl Iterator<Item = &'a ChecklistItem> {
        self.checklist
            .iter()
            .filter(move |item| item.category == category)
    }

    /// Passed/total counts per category, in display order.
    #[must_use]
    pub fn category_progress(&self) -> Vec<CategoryProgress> {
        self.categories()
            .into_iter()
            .map(|category| {
                let (passed, total) = self
                    .items_in(category)
                    .fold((0, 0), |(passed, total), item| {
                        (passed + usize::from(item.value), total + 1)
                    });
                CategoryProgress {
                    category: category.to_string(),
                    passed,
                    total,
                }
            })
            .collect()
    }

    /// Number of passed items.
    #[must_use]
    pub fn passed_count(&self) -> usize {
        self.checklist.iter().filter(|item| item.value).count()
    }

    /// Percentage of passed items, rounded half up to a whole number.
    /// An empty checklist reports 0.
    #[must_use]
    pub fn progress_percent(&self) -> usize {
        percent_rounded(self.passed_count(), self.checklist.len())
    }

    /// Items currently failing, in checklist order.
    pub fn failed_items(&self) -> impl Iterator<Item = &ChecklistItem> {
        self.checklist.iter().filter(|item| item.is_failed())
    }

    /// Failing items that are critical.
    pub fn critical_failures(&self) -> impl Iterator<Item = &ChecklistItem> {
        self.failed_items().filter(|item| item.is_critical)
    }

    /// Failing items that are not critical.
    pub fn non_critical_failures(&self) -> impl Iterator<Item = &ChecklistItem> {
        self.failed_items().filter(|item| !item.is_critical)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn three_item_definition() -> Arc<ChecklistDefinition> {
        Arc::new(
            ChecklistDefinition::parse(
                r#"
                version = "test"

                [[items]]
                id = "a"
                label = "A"
                category = "One"
                critical = true

                [[items]]
                id = "b"
                label = "B"
                category = "Two"
                critical = false

                [[items]]
                id = "c"
                label = "C"
                category = "One"
                critical = false
                "#,
            )
            .unwrap(),
        )
    }

    #[test]
    fn new_form_is_pending_with_todays_date() {
        let form = InspectionForm::standard();
        assert_eq!(form.overall_status(), InspectionStatus::Pending);
        assert_eq!(form.details().inspection_date.len(), 10);
        assert_eq!(form.checklist().len(), 22);
        assert_eq!(form.passed_count(), 0);
    }

    #[test]
    fn toggle_twice_restores_snapshot() {
        let form = InspectionForm::standard()
            .set_note("mech_foot", "Pulls to the left")
            .set_evidence("mech_foot", EvidenceImage::jpeg(vec![0xFF, 0xD8]));

        let once = form.toggle_check("mech_foot");
        assert!(once.item("mech_foot").unwrap().value);
        assert_eq!(once.item("mech_foot").unwrap().notes, form.item("mech_foot").unwrap().notes);

        let twice = once.toggle_check("mech_foot");
        assert_eq!(twice, form);
    }

    #[test]
    fn toggle_leaves_previous_snapshot_untouched() {
        let form = InspectionForm::standard();
        let next = form.toggle_check("id_chassis");
        assert!(!form.item("id_chassis").unwrap().value);
        assert!(next.item("id_chassis").unwrap().value);
    }

    #[test]
    fn unknown_id_is_a_no_op() {
        let form = InspectionForm::standard();
        assert_eq!(form.toggle_check("no_such_item"), form);
        assert_eq!(form.set_note("no_such_item", "x"), form);
        assert_eq!(
            form.set_evidence("no_such_item", EvidenceImage::jpeg(vec![1])),
            form
        );
    }

    #[test]
    fn blank_note_clears() {
        let form = InspectionForm::standard().set_note("safe_horn", "Weak");
        assert_eq!(form.item("safe_horn").unwrap().notes.as_deref(), Some("Weak"));
        let cleared = form.set_note("safe_horn", "   ");
        assert!(cleared.item("safe_horn").unwrap().notes.is_none());
    }

    #[test]
    fn set_and_clear_evidence() {
        let image = EvidenceImage::new("image/png", vec![1_u8, 2, 3]);
        let form = InspectionForm::standard().set_evidence("vis_wind", image.clone());
        assert_eq!(form.item("vis_wind").unwrap().image.as_ref(), Some(&image));
        assert!(form.clear_evidence("vis_wind").item("vis_wind").unwrap().image.is_none());
    }

    #[test]
    fn reset_checklist_keeps_details() {
        let form = InspectionForm::standard()
            .set_field(FormField::VehiclePlate, "PCG 4567")
            .unwrap()
            .toggle_check("id_chassis")
            .set_note("light_rev", "Cracked lens")
            .with_verdict(Verdict::Fail);

        let reset = form.reset_checklist();
        assert_eq!(reset.details().vehicle_plate, "PCG 4567");
        assert_eq!(reset.overall_status(), InspectionStatus::Pending);
        assert_eq!(reset.checklist(), InspectionForm::standard().checklist());
    }

    #[test]
    fn set_field_updates_text_fields() {
        let form = InspectionForm::standard()
            .set_field(FormField::VehicleMake, "Toyota")
            .unwrap()
            .set_field(FormField::Odometer, "120500")
            .unwrap();
        assert_eq!(form.details().vehicle_make, "Toyota");
        assert_eq!(form.details().odometer, "120500");
    }

    #[test]
    fn set_field_parses_vehicle_class() {
        let form = InspectionForm::standard()
            .set_field(FormField::VehicleClass, "Hired/Taxi (H)")
            .unwrap();
        assert_eq!(form.details().vehicle_class, VehicleClass::Taxi);

        let err = form
            .set_field(FormField::VehicleClass, "Hovercraft")
            .unwrap_err();
        assert!(matches!(err, FormError::InvalidVehicleClass { .. }));
    }

    #[test]
    fn progress_rounds_half_up() {
        let definition = three_item_definition();
        let form = InspectionForm::new(definition);
        assert_eq!(form.progress_percent(), 0);
        let form = form.toggle_check("a");
        assert_eq!(form.progress_percent(), 33);
        let form = form.toggle_check("b");
        assert_eq!(form.progress_percent(), 67);
        let form = form.toggle_check("c");
        assert_eq!(form.progress_percent(), 100);
    }

    #[test]
    fn progress_half_rounds_up_on_eighths() {
        let mut toml_str = String::from("version = \"eighths\"\n");
        for i in 0..8 {
            toml_str.push_str(&format!(
                "[[items]]\nid = \"i{i}\"\nlabel = \"Item {i}\"\ncategory = \"X\"\ncritical = false\n"
            ));
        }
        let form = InspectionForm::new(Arc::new(ChecklistDefinition::parse(&toml_str).unwrap()))
            .toggle_check("i0");
        // 12.5% rounds to 13.
        assert_eq!(form.progress_percent(), 13);
    }

    #[test]
    fn progress_is_monotone_and_reaches_100_only_when_all_pass() {
        let mut form = InspectionForm::standard();
        let ids: Vec<String> = form.checklist().iter().map(|i| i.id.clone()).collect();
        let mut last = form.progress_percent();
        for id in &ids {
            assert!(last < 100);
            form = form.set_check(id, true);
            let now = form.progress_percent();
            assert!(now >= last);
            last = now;
        }
        assert_eq!(last, 100);
    }

    #[test]
    fn category_progress_counts_per_category() {
        let form = InspectionForm::new(three_item_definition()).toggle_check("c");
        assert_eq!(
            form.category_progress(),
            vec![
                CategoryProgress {
                    category: "One".to_string(),
                    passed: 1,
                    total: 2,
                },
                CategoryProgress {
                    category: "Two".to_string(),
                    passed: 0,
                    total: 1,
                },
            ]
        );
        let percents: Vec<usize> = form
            .category_progress()
            .iter()
            .map(CategoryProgress::percent)
            .collect();
        assert_eq!(percents, vec![50, 0]);
    }

    #[test]
    fn clear_verdict_keeps_entries() {
        let form = InspectionForm::new(three_item_definition())
            .toggle_check("a")
            .set_note("b", "Cracked lens")
            .with_verdict(Verdict::Fail);
        assert_eq!(form.overall_status(), InspectionStatus::Fail);

        let reopened = form.clear_verdict();
        assert_eq!(reopened.overall_status(), InspectionStatus::Pending);
        assert_eq!(reopened.checklist(), form.checklist());
        assert_eq!(reopened.details(), form.details());
    }

    #[test]
    fn percent_rounded_halves_up() {
        assert_eq!(percent_rounded(0, 0), 0);
        assert_eq!(percent_rounded(1, 8), 13);
        assert_eq!(percent_rounded(2, 3), 67);
        assert_eq!(percent_rounded(1, 3), 33);
        assert_eq!(percent_rounded(5, 5), 100);
    }

    #[test]
    fn failure_views_split_by_criticality() {
        let form = InspectionForm::new(three_item_definition()).toggle_check("b");
        let critical: Vec<&str> = form.critical_failures().map(|i| i.id.as_str()).collect();
        let non_critical: Vec<&str> = form
            .non_critical_failures()
            .map(|i| i.id.as_str())
            .collect();
        assert_eq!(critical, vec!["a"]);
        assert_eq!(non_critical, vec!["c"]);
    }
}
