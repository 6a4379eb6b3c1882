#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Inspection form, checklist item, and analysis result types.
//!
//! This crate defines the plain data shared across the roadworthy
//! workspace: the vehicle identification fields an inspector fills in,
//! the per-check [`ChecklistItem`], the computed [`Verdict`], and the
//! [`AnalysisResult`] returned by the risk analysis service. Behavior
//! lives in `roadworthy_inspection`; this crate only describes shapes.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Overall status of an inspection.
///
/// Stays [`InspectionStatus::Pending`] until the form is submitted, at
/// which point the verdict decides between pass and fail.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum InspectionStatus {
    /// Not yet submitted.
    #[default]
    Pending,
    /// Submitted and roadworthy.
    Pass,
    /// Submitted and not roadworthy.
    Fail,
}

/// The computed outcome of an inspection.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    /// Vehicle is roadworthy.
    Pass,
    /// Vehicle is not roadworthy.
    Fail,
}

impl From<Verdict> for InspectionStatus {
    fn from(verdict: Verdict) -> Self {
        match verdict {
            Verdict::Pass => Self::Pass,
            Verdict::Fail => Self::Fail,
        }
    }
}

/// Registration class of the vehicle under inspection.
///
/// Displays as the long form printed on registration documents (e.g.
/// `Private (P)`). Parsing accepts either that form or the bare variant
/// name, case-insensitively.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(ascii_case_insensitive)]
pub enum VehicleClass {
    /// Privately owned vehicle.
    #[default]
    #[strum(to_string = "Private (P)", serialize = "PRIVATE", serialize = "P")]
    Private,
    /// Commercial goods vehicle.
    #[strum(to_string = "Commercial (T)", serialize = "COMMERCIAL", serialize = "T")]
    Commercial,
    /// Hired vehicle or taxi.
    #[strum(to_string = "Hired/Taxi (H)", serialize = "TAXI", serialize = "H")]
    Taxi,
    /// Rental vehicle.
    #[strum(to_string = "Rental (R)", serialize = "RENTAL", serialize = "R")]
    Rental,
    /// Government vehicle.
    #[strum(
        to_string = "Government (GP/L)",
        serialize = "GOVERNMENT",
        serialize = "GP/L"
    )]
    Government,
}

impl VehicleClass {
    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Private,
            Self::Commercial,
            Self::Taxi,
            Self::Rental,
            Self::Government,
        ]
    }
}

/// Risk level reported by the analysis service.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    /// Minor defects only.
    Low,
    /// Defects that need attention before long.
    Medium,
    /// Defects that make the vehicle unsafe to drive.
    High,
}

/// One scalar identification field on the inspection form.
///
/// String forms are the camelCase field names used in inspection files
/// (e.g. `vehiclePlate`).
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum FormField {
    /// Name of the inspecting officer.
    InspectorName,
    /// Date of the inspection.
    InspectionDate,
    /// Registration plate.
    VehiclePlate,
    /// Manufacturer.
    VehicleMake,
    /// Model name.
    VehicleModel,
    /// Year of manufacture.
    VehicleYear,
    /// Registration class.
    VehicleClass,
    /// Chassis/VIN number.
    VinNumber,
    /// Engine number.
    EngineNumber,
    /// Odometer reading.
    Odometer,
}

impl FormField {
    /// Every field, in form order.
    pub const ALL: &[Self] = &[
        Self::InspectorName,
        Self::InspectionDate,
        Self::VehiclePlate,
        Self::VehicleMake,
        Self::VehicleModel,
        Self::VehicleYear,
        Self::VehicleClass,
        Self::VinNumber,
        Self::EngineNumber,
        Self::Odometer,
    ];

    /// Human-readable label for prompts and reports.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::InspectorName => "Inspector name",
            Self::InspectionDate => "Inspection date",
            Self::VehiclePlate => "Plate number",
            Self::VehicleMake => "Make",
            Self::VehicleModel => "Model",
            Self::VehicleYear => "Year",
            Self::VehicleClass => "Vehicle class",
            Self::VinNumber => "Chassis/VIN number",
            Self::EngineNumber => "Engine number",
            Self::Odometer => "Odometer",
        }
    }

    /// Whether the form refuses submission while this field is blank.
    #[must_use]
    pub const fn is_required(self) -> bool {
        matches!(
            self,
            Self::InspectorName
                | Self::InspectionDate
                | Self::VehiclePlate
                | Self::VehicleMake
                | Self::VehicleModel
                | Self::VinNumber
        )
    }
}

/// Vehicle and inspector identification fields.
///
/// Everything except the vehicle class is free text. `engine_number` and
/// `odometer` are recorded but feed neither the verdict nor the analysis
/// prompt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InspectionDetails {
    /// Name of the inspecting officer.
    pub inspector_name: String,
    /// Date of the inspection (ISO 8601 date).
    pub inspection_date: String,
    /// Registration plate.
    pub vehicle_plate: String,
    /// Manufacturer.
    pub vehicle_make: String,
    /// Model name.
    pub vehicle_model: String,
    /// Year of manufacture.
    pub vehicle_year: String,
    /// Registration class.
    pub vehicle_class: VehicleClass,
    /// Chassis/VIN number.
    pub vin_number: String,
    /// Engine number.
    pub engine_number: String,
    /// Odometer reading.
    pub odometer: String,
}

impl InspectionDetails {
    /// Returns the text value of a field. The vehicle class is returned in
    /// its display form.
    #[must_use]
    pub fn get(&self, field: FormField) -> String {
        match field {
            FormField::InspectorName => self.inspector_name.clone(),
            FormField::InspectionDate => self.inspection_date.clone(),
            FormField::VehiclePlate => self.vehicle_plate.clone(),
            FormField::VehicleMake => self.vehicle_make.clone(),
            FormField::VehicleModel => self.vehicle_model.clone(),
            FormField::VehicleYear => self.vehicle_year.clone(),
            FormField::VehicleClass => self.vehicle_class.to_string(),
            FormField::VinNumber => self.vin_number.clone(),
            FormField::EngineNumber => self.engine_number.clone(),
            FormField::Odometer => self.odometer.clone(),
        }
    }
}

/// A photograph of a defect, attached to a checklist item.
///
/// The bytes are shared so that form snapshots can be cloned cheaply.
#[derive(Clone, PartialEq, Eq)]
pub struct EvidenceImage {
    /// MIME type of the encoded image (e.g. `image/jpeg`).
    pub mime_type: String,
    /// Encoded image bytes.
    pub data: Arc<[u8]>,
}

impl EvidenceImage {
    /// Creates an image from raw encoded bytes.
    #[must_use]
    pub fn new(mime_type: impl Into<String>, data: impl Into<Arc<[u8]>>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: data.into(),
        }
    }

    /// Creates a JPEG image, the format produced by device cameras.
    #[must_use]
    pub fn jpeg(data: impl Into<Arc<[u8]>>) -> Self {
        Self::new("image/jpeg", data)
    }
}

impl std::fmt::Debug for EvidenceImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvidenceImage")
            .field("mime_type", &self.mime_type)
            .field("len", &self.data.len())
            .finish()
    }
}

/// One safety check on the inspection checklist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChecklistItem {
    /// Stable identifier (e.g. `"id_chassis"`).
    pub id: String,
    /// Human-readable description of the check.
    pub label: String,
    /// Display grouping (e.g. `"Lighting"`).
    pub category: String,
    /// `true` once the check has passed.
    pub value: bool,
    /// Defect description, surfaced while the check is failing.
    pub notes: Option<String>,
    /// Defect photograph, surfaced while the check is failing.
    pub image: Option<EvidenceImage>,
    /// Whether failing this check alone fails the whole inspection.
    pub is_critical: bool,
}

impl ChecklistItem {
    /// Whether this item currently counts as a failure.
    #[must_use]
    pub const fn is_failed(&self) -> bool {
        !self.value
    }
}

/// Narrative risk assessment produced for a submitted inspection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    /// High-level summary of the safety analysis.
    pub summary: String,
    /// Overall risk rating.
    pub risk_level: RiskLevel,
    /// Actionable steps to resolve the defects, in priority order.
    pub recommendations: Vec<String>,
}
