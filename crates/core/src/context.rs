//! Contextual metadata carried down the tree walk.
//!
//! Section heading, parent text and grid membership exist for the review UI only. They never
//! decide whether a linkId becomes a candidate.

use fhir::{LinkId, QuestionnaireItem};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Host-supplied state of one tab in a tabbed questionnaire.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabProperties {
    #[serde(default)]
    pub is_complete: bool,
    #[serde(default)]
    pub is_hidden: bool,
}

/// Tab metadata keyed by the linkId of each tab item.
pub type Tabs = HashMap<LinkId, TabProperties>;

/// Metadata for the node currently being visited.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct WalkContext {
    pub section_text: Option<String>,
    pub parent_text: Option<String>,
    pub in_grid: bool,
    pub depth: usize,
}

impl WalkContext {
    /// Context for the top-level items.
    pub fn root() -> Self {
        Self::default()
    }

    /// Section heading that applies to `item` itself.
    ///
    /// Top-level items and tabs start a new section; anything else inherits the enclosing one.
    pub fn section_for(&self, item: &QuestionnaireItem, tabs: &Tabs) -> Option<String> {
        if starts_section(item, self.depth, tabs) {
            item.heading_text().map(str::to_string)
        } else {
            self.section_text.clone()
        }
    }

    /// Context for the children of `item`.
    pub fn child(&self, item: &QuestionnaireItem, tabs: &Tabs) -> Self {
        Self {
            section_text: self.section_for(item, tabs),
            parent_text: item.text.clone(),
            in_grid: self.in_grid || item.is_grid(),
            depth: self.depth + 1,
        }
    }
}

fn starts_section(item: &QuestionnaireItem, depth: usize, tabs: &Tabs) -> bool {
    depth == 0 || tabs.contains_key(&item.link_id) || item.is_tab() || item.is_tab_container()
}
