//! Merge builder: applies approved candidates to the edited response.
//!
//! Responsibilities:
//! - Rebuild the edited response in definition order wherever an approved linkId lives
//! - Substitute server answers for approved items and server instance arrays for approved
//!   repeating groups
//! - Leave every other subtree exactly as it was
//!
//! Notes:
//! - A level with no approved linkId at or below it is copied verbatim, including its order
//!   and any response items the definition does not know about
//! - Rebuilt groups that end up with no children and no answer are pruned
//! - Merging is idempotent: merging the same approvals into the output changes nothing

use crate::align::align;
use crate::candidate::{ItemToRepopulate, ItemsToRepopulate};
use crate::repeat_group;
use fhir::{ItemKind, Questionnaire, QuestionnaireItem, QuestionnaireResponse, ResponseItem};

/// Merge the `approved` candidates into `edited`, returning a new response.
///
/// `edited` itself is never modified; the caller installs the returned tree as a whole.
pub fn merge(
    questionnaire: &Questionnaire,
    edited: &QuestionnaireResponse,
    approved: &ItemsToRepopulate,
) -> QuestionnaireResponse {
    if questionnaire.items().is_empty() || approved.is_empty() {
        return edited.clone();
    }

    let items = merge_items(questionnaire.items(), edited.items(), approved);
    tracing::debug!(
        approved = approved.len(),
        top_level_items = items.len(),
        "merged approved candidates"
    );

    QuestionnaireResponse {
        resource_type: edited.resource_type.clone(),
        id: edited.id.clone(),
        status: edited.status.clone(),
        item: if items.is_empty() && edited.item.is_none() {
            None
        } else {
            Some(items)
        },
        extra: edited.extra.clone(),
    }
}

/// Rebuild one level of the response tree.
fn merge_items(
    definitions: &[QuestionnaireItem],
    responses: &[ResponseItem],
    approved: &ItemsToRepopulate,
) -> Vec<ResponseItem> {
    if !definitions.iter().any(|d| touches(d, approved)) {
        return responses.to_vec();
    }

    let alignment = align(definitions, responses);
    let mut merged = Vec::with_capacity(responses.len());

    for (definition, slot) in definitions.iter().zip(alignment.iter()) {
        match definition.kind() {
            ItemKind::RepeatingGroup => {
                merged.extend(repeat_group::merge_instances(
                    definition,
                    slot.instances(),
                    approved,
                ));
            }
            ItemKind::Display => merged.extend(slot.single().cloned()),
            ItemKind::Group | ItemKind::Leaf => {
                merged.extend(merge_node(definition, slot.single(), approved));
            }
        }
    }

    merged
}

/// Rebuild one non-repeating node, or `None` if it should be omitted.
fn merge_node(
    definition: &QuestionnaireItem,
    existing: Option<&ResponseItem>,
    approved: &ItemsToRepopulate,
) -> Option<ResponseItem> {
    if !touches(definition, approved) {
        return existing.cloned();
    }

    let server = approved
        .get(definition.link_id.as_str())
        .and_then(ItemToRepopulate::server_qr_item);

    let answer = match server {
        Some(server) => server.answer.clone(),
        None => existing.and_then(|e| e.answer.clone()),
    };

    let mut node = existing
        .or(server)
        .cloned()
        .unwrap_or_else(|| new_node(definition));
    node.answer = answer;

    if definition.has_children() {
        let children = merge_items(
            definition.children(),
            existing.map(ResponseItem::items).unwrap_or_default(),
            approved,
        );
        node.item = (!children.is_empty()).then_some(children);
    }

    if !node.has_items_or_answer() {
        tracing::trace!(link_id = %definition.link_id, "pruned empty node");
        return None;
    }
    Some(node)
}

/// Whether `definition` or anything beneath it is approved.
fn touches(definition: &QuestionnaireItem, approved: &ItemsToRepopulate) -> bool {
    approved.contains(definition.link_id.as_str())
        || definition.children().iter().any(|c| touches(c, approved))
}

fn new_node(definition: &QuestionnaireItem) -> ResponseItem {
    let mut node = ResponseItem::new(definition.link_id.clone());
    node.text = definition.text.clone();
    node
}
