//! Repopulation candidates and the change-set that carries them.
//!
//! Responsibilities:
//! - Define [`ItemToRepopulate`], one proposed change for one linkId
//! - Define [`ItemsToRepopulate`], the insertion-ordered change-set handed to reviewers and to
//!   the merge builder
//! - Re-resolve definitions for candidates that crossed a serialisation boundary
//!
//! Notes:
//! - The JSON field names (`qItem`, `serverQRItem`, ...) are the shape consumed by review UIs
//! - A candidate whose `qItem` is null could not be resolved; consumers show what context they
//!   have and disable deep interaction

use crate::context::{Tabs, WalkContext};
use fhir::{LinkId, Questionnaire, QuestionnaireItem, ResponseItem};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// One proposed change for one linkId.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ItemToRepopulate {
    #[serde(rename = "qItem", default)]
    pub q_item: Option<QuestionnaireItem>,

    #[serde(rename = "sectionItemText", default)]
    pub section_item_text: Option<String>,

    #[serde(rename = "parentItemText", default)]
    pub parent_item_text: Option<String>,

    #[serde(rename = "isInGrid", default)]
    pub is_in_grid: bool,

    #[serde(flatten)]
    pub values: RepopulateValues,
}

/// Server and current values of a candidate.
///
/// Non-repeating items carry single nodes; repeating groups carry whole instance arrays.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RepopulateValues {
    Single {
        #[serde(rename = "serverQRItem")]
        server: ResponseItem,
        #[serde(rename = "currentQRItem", default, skip_serializing_if = "Option::is_none")]
        current: Option<ResponseItem>,
    },
    RepeatGroup {
        #[serde(rename = "serverQRItems")]
        server: Vec<ResponseItem>,
        #[serde(rename = "currentQRItems", default, skip_serializing_if = "Option::is_none")]
        current: Option<Vec<ResponseItem>>,
    },
}

impl ItemToRepopulate {
    /// A candidate discovered while walking `definition` in context `ctx`.
    pub(crate) fn discovered(
        definition: &QuestionnaireItem,
        ctx: &WalkContext,
        tabs: &Tabs,
        values: RepopulateValues,
    ) -> Self {
        Self {
            q_item: Some(definition.clone()),
            section_item_text: ctx.section_for(definition, tabs),
            parent_item_text: ctx.parent_text.clone(),
            is_in_grid: ctx.in_grid,
            values,
        }
    }

    pub fn is_repeat_group(&self) -> bool {
        matches!(self.values, RepopulateValues::RepeatGroup { .. })
    }

    pub fn server_qr_item(&self) -> Option<&ResponseItem> {
        match &self.values {
            RepopulateValues::Single { server, .. } => Some(server),
            RepopulateValues::RepeatGroup { .. } => None,
        }
    }

    pub fn current_qr_item(&self) -> Option<&ResponseItem> {
        match &self.values {
            RepopulateValues::Single { current, .. } => current.as_ref(),
            RepopulateValues::RepeatGroup { .. } => None,
        }
    }

    pub fn server_qr_items(&self) -> Option<&[ResponseItem]> {
        match &self.values {
            RepopulateValues::RepeatGroup { server, .. } => Some(server),
            RepopulateValues::Single { .. } => None,
        }
    }

    pub fn current_qr_items(&self) -> Option<&[ResponseItem]> {
        match &self.values {
            RepopulateValues::RepeatGroup { current, .. } => current.as_deref(),
            RepopulateValues::Single { .. } => None,
        }
    }
}

/// Ordered change-set keyed by linkId.
///
/// Entries keep discovery order, which is definition order with nested leaves ahead of the
/// group that contains them.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemsToRepopulate(IndexMap<LinkId, ItemToRepopulate>);

impl ItemsToRepopulate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, link_id: &str) -> Option<&ItemToRepopulate> {
        self.0.get(link_id)
    }

    pub fn contains(&self, link_id: &str) -> bool {
        self.0.contains_key(link_id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&LinkId, &ItemToRepopulate)> {
        self.0.iter()
    }

    pub fn link_ids(&self) -> impl Iterator<Item = &LinkId> {
        self.0.keys()
    }

    /// The approved subset: entries whose linkId is in `keys`, in change-set order.
    ///
    /// Keys that name no candidate are ignored.
    pub fn select<I, S>(&self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let wanted: HashSet<String> = keys.into_iter().map(|k| k.as_ref().to_string()).collect();
        self.0
            .iter()
            .filter(|(link_id, _)| wanted.contains(link_id.as_str()))
            .map(|(link_id, candidate)| (link_id.clone(), candidate.clone()))
            .collect()
    }

    /// Fill in missing `qItem`s by looking each linkId up in `questionnaire`.
    ///
    /// Lookups that fail leave `qItem` null; the entry is kept.
    pub fn resolve_definitions(&mut self, questionnaire: &Questionnaire) {
        for (link_id, candidate) in self.0.iter_mut() {
            if candidate.q_item.is_some() {
                continue;
            }
            candidate.q_item = questionnaire.find_item(link_id.as_str()).cloned();
            if candidate.q_item.is_none() {
                tracing::debug!(link_id = %link_id, "candidate definition could not be resolved");
            }
        }
    }

    /// Keep only candidates whose definition opts in to repopulation.
    ///
    /// Candidates with an unresolved definition are dropped.
    pub fn filter_repopulatable(self) -> Self {
        self.0
            .into_iter()
            .filter(|(_, candidate)| {
                candidate
                    .q_item
                    .as_ref()
                    .is_some_and(QuestionnaireItem::is_repopulatable)
            })
            .collect()
    }

    pub fn into_inner(self) -> IndexMap<LinkId, ItemToRepopulate> {
        self.0
    }

    pub(crate) fn insert(&mut self, link_id: LinkId, candidate: ItemToRepopulate) {
        self.0.insert(link_id, candidate);
    }

    pub(crate) fn get_mut(&mut self, link_id: &str) -> Option<&mut ItemToRepopulate> {
        self.0.get_mut(link_id)
    }

    pub(crate) fn remove(&mut self, link_id: &str) -> Option<ItemToRepopulate> {
        self.0.shift_remove(link_id)
    }
}

impl FromIterator<(LinkId, ItemToRepopulate)> for ItemsToRepopulate {
    fn from_iter<T: IntoIterator<Item = (LinkId, ItemToRepopulate)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{link, questionnaire, response_item, string_answer};
    use serde_json::json;

    fn single(link_id: &str, server: &str, current: Option<&str>) -> ItemToRepopulate {
        ItemToRepopulate {
            q_item: None,
            section_item_text: None,
            parent_item_text: None,
            is_in_grid: false,
            values: RepopulateValues::Single {
                server: response_item(string_answer(link_id, server)),
                current: current.map(|c| response_item(string_answer(link_id, c))),
            },
        }
    }

    #[test]
    fn serialises_to_review_shape() {
        let candidates: ItemsToRepopulate = [(link("q1"), single("q1", "B", Some("A")))]
            .into_iter()
            .collect();

        let value = serde_json::to_value(&candidates).expect("render candidates");
        assert_eq!(
            value,
            json!({
                "q1": {
                    "qItem": null,
                    "sectionItemText": null,
                    "parentItemText": null,
                    "isInGrid": false,
                    "serverQRItem": { "linkId": "q1", "answer": [{ "valueString": "B" }] },
                    "currentQRItem": { "linkId": "q1", "answer": [{ "valueString": "A" }] }
                }
            })
        );
    }

    #[test]
    fn deserialises_both_value_shapes() {
        let parsed: ItemsToRepopulate = serde_json::from_value(json!({
            "q1": { "serverQRItem": { "linkId": "q1" } },
            "rg": {
                "isInGrid": true,
                "serverQRItems": [{ "linkId": "rg" }, { "linkId": "rg" }],
                "currentQRItems": []
            }
        }))
        .expect("parse candidates");

        let q1 = parsed.get("q1").expect("q1 present");
        assert!(!q1.is_repeat_group());
        assert!(q1.current_qr_item().is_none());

        let rg = parsed.get("rg").expect("rg present");
        assert!(rg.is_repeat_group());
        assert!(rg.is_in_grid);
        assert_eq!(rg.server_qr_items().map(<[_]>::len), Some(2));
        assert_eq!(rg.current_qr_items().map(<[_]>::len), Some(0));
        assert!(rg.server_qr_item().is_none());
    }

    #[test]
    fn select_keeps_change_set_order_and_ignores_unknown_keys() {
        let candidates: ItemsToRepopulate = ["a", "b", "c"]
            .into_iter()
            .map(|id| (link(id), single(id, "new", Some("old"))))
            .collect();

        let approved = candidates.select(["c", "missing", "a"]);
        let ids: Vec<&str> = approved.link_ids().map(LinkId::as_str).collect();
        assert_eq!(ids, vec!["a", "c"]);
    }

    #[test]
    fn resolves_missing_definitions_and_filters_repopulatable() {
        let q = questionnaire(json!([
            { "linkId": "g", "type": "group", "item": [
                { "linkId": "weight", "type": "decimal", "extension": [{
                    "url": "https://smartforms.csiro.au/ig/StructureDefinition/questionnaire-initialExpression-repopulatable",
                    "valueCode": "manual"
                }] },
                { "linkId": "height", "type": "decimal" }
            ] }
        ]));

        let mut candidates: ItemsToRepopulate = ["weight", "height", "ghost"]
            .into_iter()
            .map(|id| (link(id), single(id, "1", None)))
            .collect();
        candidates.resolve_definitions(&q);

        assert!(candidates.get("weight").and_then(|c| c.q_item.as_ref()).is_some());
        assert!(candidates.get("height").and_then(|c| c.q_item.as_ref()).is_some());
        assert!(candidates.get("ghost").is_some_and(|c| c.q_item.is_none()));

        let repopulatable = candidates.filter_repopulatable();
        let ids: Vec<&str> = repopulatable.link_ids().map(LinkId::as_str).collect();
        assert_eq!(ids, vec!["weight"]);
    }

    #[test]
    fn remove_preserves_remaining_order() {
        let mut candidates: ItemsToRepopulate = ["a", "b", "c"]
            .into_iter()
            .map(|id| (link(id), single(id, "x", None)))
            .collect();
        assert!(candidates.remove("a").is_some());
        let ids: Vec<&str> = candidates.link_ids().map(LinkId::as_str).collect();
        assert_eq!(ids, vec!["b", "c"]);
        assert!(candidates.remove("a").is_none());
    }
}
