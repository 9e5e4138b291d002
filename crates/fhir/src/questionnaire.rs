//! FHIR `Questionnaire` wire models and classification helpers.
//!
//! Responsibilities:
//! - Define the item-definition tree as it appears in FHIR JSON
//! - Classify each item for traversal (display, leaf, group, repeating group)
//! - Expose the rendering extensions that feed repopulation context (tabs, grids, short text)
//! - Parse and render whole `Questionnaire` resources
//!
//! Notes:
//! - Definitions are immutable input; nothing here mutates a parsed questionnaire
//! - `linkId` is unique among siblings only, so lookups by linkId return the first match

use crate::extensions::{self, Extension};
use crate::{deserialize_with_path, expect_resource_type, FhirResult, LinkId};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ============================================================================
// Public domain-level types
// ============================================================================

/// A FHIR `Questionnaire` resource.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Questionnaire {
    pub resource_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item: Option<Vec<QuestionnaireItem>>,

    /// Members not interpreted by this crate.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Questionnaire {
    /// Create an empty questionnaire with the given top-level items.
    pub fn with_items(items: Vec<QuestionnaireItem>) -> Self {
        Self {
            resource_type: QuestionnaireResource::RESOURCE_TYPE.to_string(),
            id: None,
            item: Some(items),
            extra: Map::new(),
        }
    }

    /// Top-level items, or an empty slice when `item` is absent.
    pub fn items(&self) -> &[QuestionnaireItem] {
        self.item.as_deref().unwrap_or_default()
    }

    /// Find the first item (depth-first, document order) with the given linkId.
    pub fn find_item(&self, link_id: &str) -> Option<&QuestionnaireItem> {
        find_in(self.items(), link_id)
    }
}

/// One node of the item-definition tree.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionnaireItem {
    pub link_id: LinkId,

    #[serde(rename = "type")]
    pub item_type: ItemType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repeats: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extension: Option<Vec<Extension>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item: Option<Vec<QuestionnaireItem>>,

    /// Members not interpreted by this crate (enableWhen, answerOption, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// FHIR questionnaire item types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ItemType {
    Group,
    Display,
    Boolean,
    Decimal,
    Integer,
    Date,
    DateTime,
    Time,
    String,
    Text,
    Url,
    Choice,
    #[serde(rename = "open-choice")]
    OpenChoice,
    Attachment,
    Reference,
    Quantity,
    /// R5 replacement for choice/open-choice.
    Coding,
    /// Pre-R4 generic question type.
    Question,
}

/// Traversal classification of a definition item.
///
/// Repeating groups are split out because their response instances share one linkId and
/// have no individual identity.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ItemKind {
    /// Display-only text; never answered.
    Display,
    /// A question that holds answers directly.
    Leaf,
    /// A non-repeating group; its response is a single node with child items.
    Group,
    /// A repeating group; its response is a list of sibling nodes sharing the linkId.
    RepeatingGroup,
}

impl QuestionnaireItem {
    /// Create a definition item with no text, extensions or children.
    pub fn new(link_id: LinkId, item_type: ItemType) -> Self {
        Self {
            link_id,
            item_type,
            text: None,
            repeats: None,
            extension: None,
            item: None,
            extra: Map::new(),
        }
    }

    /// Classify this item for traversal.
    pub fn kind(&self) -> ItemKind {
        match self.item_type {
            ItemType::Display => ItemKind::Display,
            ItemType::Group if self.repeats == Some(true) => ItemKind::RepeatingGroup,
            ItemType::Group => ItemKind::Group,
            _ => ItemKind::Leaf,
        }
    }

    pub fn is_repeating_group(&self) -> bool {
        self.kind() == ItemKind::RepeatingGroup
    }

    /// Child definitions, or an empty slice when `item` is absent.
    pub fn children(&self) -> &[QuestionnaireItem] {
        self.item.as_deref().unwrap_or_default()
    }

    pub fn has_children(&self) -> bool {
        !self.children().is_empty()
    }

    pub fn extensions(&self) -> &[Extension] {
        self.extension.as_deref().unwrap_or_default()
    }

    /// Whether the item carries a `questionnaire-itemControl` coding with `code`.
    pub fn has_item_control(&self, code: &str) -> bool {
        extensions::has_item_control(self.extensions(), code)
    }

    pub fn is_tab_container(&self) -> bool {
        self.has_item_control(extensions::TAB_CONTAINER_CODE)
    }

    pub fn is_tab(&self) -> bool {
        self.has_item_control(extensions::TAB_CODE)
    }

    pub fn is_grid(&self) -> bool {
        self.has_item_control(extensions::GRID_CODE)
    }

    pub fn short_text(&self) -> Option<&str> {
        extensions::short_text(self.extensions())
    }

    /// Whether the item opts in to repopulation via the repopulatable extension.
    pub fn is_repopulatable(&self) -> bool {
        extensions::find_extension(self.extensions(), extensions::REPOPULATABLE_URL).is_some()
    }

    /// Heading to show for this item when it starts a section: short text, else display text.
    pub fn heading_text(&self) -> Option<&str> {
        self.short_text().or(self.text.as_deref())
    }
}

// ============================================================================
// Public Questionnaire operations
// ============================================================================

/// Questionnaire parse/render operations.
///
/// This is a zero-sized type used for namespacing questionnaire-related operations.
/// All methods are associated functions.
pub struct QuestionnaireResource;

impl QuestionnaireResource {
    pub const RESOURCE_TYPE: &'static str = "Questionnaire";

    /// Parse a questionnaire from JSON text.
    ///
    /// This uses `serde_path_to_error` to surface a best-effort "path" (e.g. `item[0].type`)
    /// to the failing member when the JSON does not match the model.
    ///
    /// # Errors
    ///
    /// Returns [`crate::FhirError`] if:
    /// - the JSON does not represent a questionnaire,
    /// - any modelled member has an unexpected type (for example an unknown item `type`),
    /// - any `linkId` is empty,
    /// - `resourceType` is not `Questionnaire`.
    pub fn parse_json(json_text: &str) -> FhirResult<Questionnaire> {
        let mut deserializer = serde_json::Deserializer::from_str(json_text);
        let questionnaire: Questionnaire =
            deserialize_with_path(&mut deserializer, Self::RESOURCE_TYPE)?;
        deserializer.end()?;
        expect_resource_type(&questionnaire.resource_type, Self::RESOURCE_TYPE)?;
        Ok(questionnaire)
    }

    /// Parse a questionnaire from YAML text.
    ///
    /// # Errors
    ///
    /// Same conditions as [`QuestionnaireResource::parse_json`].
    pub fn parse_yaml(yaml_text: &str) -> FhirResult<Questionnaire> {
        let deserializer = serde_yaml::Deserializer::from_str(yaml_text);
        let questionnaire: Questionnaire =
            deserialize_with_path(deserializer, Self::RESOURCE_TYPE)?;
        expect_resource_type(&questionnaire.resource_type, Self::RESOURCE_TYPE)?;
        Ok(questionnaire)
    }

    /// Render a questionnaire as pretty-printed JSON.
    pub fn render_json(questionnaire: &Questionnaire) -> FhirResult<String> {
        Ok(serde_json::to_string_pretty(questionnaire)?)
    }
}

// ============================================================================
// Helper functions (internal)
// ============================================================================

fn find_in<'a>(items: &'a [QuestionnaireItem], link_id: &str) -> Option<&'a QuestionnaireItem> {
    for item in items {
        if item.link_id.as_str() == link_id {
            return Some(item);
        }
        if let Some(found) = find_in(item.children(), link_id) {
            return Some(found);
        }
    }
    None
}
