//! Checklist definitions — the fixed, versioned list of safety checks.
//!
//! A definition is a TOML document with a `version` and an ordered list of
//! `[[items]]`, each carrying an `id`, `label`, `category`, and `critical`
//! flag. The standard Cap. 48:50 checklist is baked into the binary at
//! compile time via [`include_str!`]; other definitions can be loaded from
//! disk. Changing the definition changes the regulatory checklist, never
//! the verdict algorithm.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::{Arc, LazyLock};

use roadworthy_inspection_models::ChecklistItem;
use serde::Deserialize;

use crate::ChecklistError;

/// The standard checklist, embedded at compile time.
const STANDARD_TOML: &str = include_str!("../checklists/tt_cap_48_50.toml");

static STANDARD: LazyLock<Arc<ChecklistDefinition>> = LazyLock::new(|| {
    Arc::new(
        ChecklistDefinition::parse(STANDARD_TOML)
            .unwrap_or_else(|e| panic!("Failed to parse tt_cap_48_50.toml: {e}")),
    )
});

/// One check as declared in a definition file.
///
/// Every key is required and unknown keys are rejected, so a misspelt
/// `critical` flag cannot quietly demote a check.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChecklistEntry {
    /// Stable identifier.
    pub id: String,
    /// Human-readable description.
    pub label: String,
    /// Display grouping.
    pub category: String,
    /// Whether failing this check alone fails the inspection.
    pub critical: bool,
}

impl ChecklistEntry {
    /// Builds the initial (not yet passed) item for this entry.
    #[must_use]
    pub fn to_item(&self) -> ChecklistItem {
        ChecklistItem {
            id: self.id.clone(),
            label: self.label.clone(),
            category: self.category.clone(),
            value: false,
            notes: None,
            image: None,
            is_critical: self.critical,
        }
    }
}

/// A complete, versioned checklist.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChecklistDefinition {
    /// Version tag (e.g. `"tt-cap-48-50/1"`).
    pub version: String,
    /// Human-readable title.
    #[serde(default)]
    pub name: Option<String>,
    /// Checks in display order.
    pub items: Vec<ChecklistEntry>,
}

impl ChecklistDefinition {
    /// Returns the embedded standard checklist.
    ///
    /// # Panics
    ///
    /// Panics if the embedded TOML is invalid, which the test suite rules
    /// out.
    #[must_use]
    pub fn standard() -> Arc<Self> {
        Arc::clone(&STANDARD)
    }

    /// Parses and validates a checklist from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ChecklistError`] if the TOML is malformed, the list is
    /// empty, an item has a blank field, or two items share an id.
    pub fn parse(toml_str: &str) -> Result<Self, ChecklistError> {
        let definition: Self = toml::de::from_str(toml_str)?;
        definition.validate()?;
        Ok(definition)
    }

    /// Reads and parses a checklist file.
    ///
    /// # Errors
    ///
    /// Returns [`ChecklistError`] if the file cannot be read or fails
    /// [`ChecklistDefinition::parse`].
    pub fn from_path(path: &Path) -> Result<Self, ChecklistError> {
        let text = std::fs::read_to_string(path)?;
        let definition = Self::parse(&text)?;
        log::info!(
            "Loaded checklist '{}' ({} items) from {}",
            definition.version,
            definition.items.len(),
            path.display()
        );
        Ok(definition)
    }

    fn validate(&self) -> Result<(), ChecklistError> {
        if self.items.is_empty() {
            return Err(ChecklistError::Empty {
                version: self.version.clone(),
            });
        }

        let mut seen = BTreeSet::new();
        for (index, entry) in self.items.iter().enumerate() {
            for (field, value) in [
                ("id", &entry.id),
                ("label", &entry.label),
                ("category", &entry.category),
            ] {
                if value.trim().is_empty() {
                    return Err(ChecklistError::BlankField { index, field });
                }
            }
            if !seen.insert(entry.id.as_str()) {
                return Err(ChecklistError::DuplicateId {
                    id: entry.id.clone(),
                });
            }
        }

        Ok(())
    }

    /// The initial snapshot: every item not yet passed, with no notes or
    /// evidence.
    #[must_use]
    pub fn initial_items(&self) -> Vec<ChecklistItem> {
        self.items.iter().map(ChecklistEntry::to_item).collect()
    }

    /// Distinct categories in order of first appearance.
    #[must_use]
    pub fn categories(&self) -> Vec<&str> {
        let mut categories: Vec<&str> = Vec::new();
        for entry in &self.items {
            if !categories.contains(&entry.category.as_str()) {
                categories.push(&entry.category);
            }
        }
        categories
    }

    /// Looks up an entry by id.
    #[must_use]
    pub fn entry(&self, id: &str) -> Option<&ChecklistEntry> {
        self.items.iter().find(|e| e.id == id)
    }
}
