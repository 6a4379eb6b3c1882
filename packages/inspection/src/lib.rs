#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Inspection form state, checklist definitions, and verdict computation.
//!
//! The [`form::InspectionForm`] is an immutable snapshot: every edit
//! returns a new form, so callers can keep the previous state around and
//! nothing observes a half-applied change. The checklist itself comes from
//! a versioned [`checklist::ChecklistDefinition`], and the pass/fail
//! decision is the pure [`verdict::compute_verdict`].

pub mod checklist;
pub mod form;
pub mod validation;
pub mod verdict;

pub use roadworthy_inspection_models as models;

use thiserror::Error;

/// Errors raised while loading a checklist definition.
#[derive(Debug, Error)]
pub enum ChecklistError {
    /// The TOML document could not be parsed.
    #[error("Failed to parse checklist: {0}")]
    Parse(#[from] toml::de::Error),

    /// The definition contains no items.
    #[error("Checklist '{version}' has no items")]
    Empty {
        /// Version string of the offending definition.
        version: String,
    },

    /// Two items share an id.
    #[error("Duplicate checklist item id: {id}")]
    DuplicateId {
        /// The repeated id.
        id: String,
    },

    /// An item has a blank id, label, or category.
    #[error("Checklist item #{index} is missing its {field}")]
    BlankField {
        /// Zero-based position of the item.
        index: usize,
        /// Which field is blank.
        field: &'static str,
    },

    /// Reading a checklist file from disk failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by form edits.
#[derive(Debug, Error)]
pub enum FormError {
    /// The vehicle class text matched none of the known classes.
    #[error("Unknown vehicle class: {value}")]
    InvalidVehicleClass {
        /// The rejected text.
        value: String,
    },
}
