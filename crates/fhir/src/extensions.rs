//! FHIR extension wire models and the SDC rendering extensions read during repopulation.
//!
//! Only the extension value types the engine inspects are modelled; every other member is
//! preserved in `extra` so that re-rendering a resource does not lose data.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// `questionnaire-itemControl` extension URL.
pub const ITEM_CONTROL_URL: &str = "http://hl7.org/fhir/StructureDefinition/questionnaire-itemControl";

/// `sdc-questionnaire-shortText` extension URL.
pub const SHORT_TEXT_URL: &str =
    "http://hl7.org/fhir/uv/sdc/StructureDefinition/sdc-questionnaire-shortText";

/// Marks an item whose initial expression may be re-run against the patient record.
pub const REPOPULATABLE_URL: &str =
    "https://smartforms.csiro.au/ig/StructureDefinition/questionnaire-initialExpression-repopulatable";

/// Item control code for a group rendered as a set of tabs.
pub const TAB_CONTAINER_CODE: &str = "tab-container";

/// Item control code for a single tab.
pub const TAB_CODE: &str = "tab";

/// Item control code for a group rendered as a grid.
pub const GRID_CODE: &str = "grid";

/// A FHIR `Extension`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Extension {
    pub url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_string: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_boolean: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_codeable_concept: Option<CodeableConcept>,

    /// Members not interpreted by this crate.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A FHIR `CodeableConcept`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CodeableConcept {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coding: Option<Vec<Coding>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A FHIR `Coding`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Coding {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Find the first extension with the given URL.
pub fn find_extension<'a>(extensions: &'a [Extension], url: &str) -> Option<&'a Extension> {
    extensions.iter().find(|e| e.url == url)
}

/// Whether an item-control extension carries a coding with the given code.
pub fn has_item_control(extensions: &[Extension], code: &str) -> bool {
    find_extension(extensions, ITEM_CONTROL_URL)
        .and_then(|e| e.value_codeable_concept.as_ref())
        .and_then(|cc| cc.coding.as_deref())
        .is_some_and(|codings| codings.iter().any(|c| c.code.as_deref() == Some(code)))
}

/// The `sdc-questionnaire-shortText` value, if present and non-empty.
pub fn short_text(extensions: &[Extension]) -> Option<&str> {
    find_extension(extensions, SHORT_TEXT_URL)
        .and_then(|e| e.value_string.as_deref())
        .filter(|s| !s.is_empty())
}
