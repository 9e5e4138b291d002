//! Diff walker: computes the repopulation change-set.
//!
//! Responsibilities:
//! - Walk the definition tree against the server-populated response and record one candidate
//!   per visible linkId that has server data
//! - Walk the definition tree again against the edited response, attaching current values and
//!   dropping candidates that turn out unchanged
//!
//! Notes:
//! - Both passes follow definition order through the aligner; response order never matters
//! - Hidden items and everything beneath them are skipped in both passes
//! - The walk never fails: malformed or missing data only means fewer candidates

use crate::align::align;
use crate::candidate::{ItemToRepopulate, ItemsToRepopulate, RepopulateValues};
use crate::context::{Tabs, WalkContext};
use crate::equality::response_items_equal;
use crate::repeat_group;
use crate::visibility::{is_hidden, EnableWhenState};
use fhir::{ItemKind, Questionnaire, QuestionnaireItem, QuestionnaireResponse, ResponseItem};

/// Compute the candidates for repopulating `current` with data from `server`.
///
/// Returns an empty change-set when any of the three trees has no top-level items.
pub fn compute_candidates(
    questionnaire: &Questionnaire,
    server: &QuestionnaireResponse,
    current: &QuestionnaireResponse,
    tabs: &Tabs,
    enable_when: &EnableWhenState,
) -> ItemsToRepopulate {
    let mut candidates = ItemsToRepopulate::new();

    if questionnaire.items().is_empty() || server.items().is_empty() || current.items().is_empty() {
        tracing::debug!("questionnaire or a response has no items; nothing to repopulate");
        return candidates;
    }

    let walk = Walk { tabs, enable_when };
    walk.discover(questionnaire.items(), server.items(), &WalkContext::root(), &mut candidates);
    let discovered = candidates.len();

    walk.attach_current(questionnaire.items(), current.items(), &mut candidates);
    tracing::debug!(
        discovered,
        changed = candidates.len(),
        "repopulation candidates computed"
    );

    candidates
}

struct Walk<'a> {
    tabs: &'a Tabs,
    enable_when: &'a EnableWhenState,
}

impl Walk<'_> {
    /// First pass: record server values.
    fn discover(
        &self,
        definitions: &[QuestionnaireItem],
        responses: &[ResponseItem],
        ctx: &WalkContext,
        out: &mut ItemsToRepopulate,
    ) {
        let alignment = align(definitions, responses);

        for (definition, slot) in definitions.iter().zip(alignment.iter()) {
            if is_hidden(definition.link_id.as_str(), self.enable_when) {
                tracing::trace!(link_id = %definition.link_id, "hidden; skipped with descendants");
                continue;
            }

            match definition.kind() {
                ItemKind::Display => {}
                ItemKind::RepeatingGroup => {
                    if let Some(candidate) =
                        repeat_group::discover(definition, slot.instances(), ctx, self.tabs)
                    {
                        out.insert(definition.link_id.clone(), candidate);
                    }
                }
                ItemKind::Group => {
                    let Some(node) = slot.single() else { continue };

                    // Nested items are recorded ahead of the group itself.
                    let child_ctx = ctx.child(definition, self.tabs);
                    self.discover(definition.children(), node.items(), &child_ctx, out);

                    if node.has_answer() {
                        out.insert(
                            definition.link_id.clone(),
                            single_candidate(definition, ctx, self.tabs, group_answer_view(node)),
                        );
                    }
                }
                ItemKind::Leaf => {
                    // A server node without answers carries no data to offer.
                    let Some(node) = slot.single().filter(|n| n.has_answer()) else {
                        continue;
                    };
                    out.insert(
                        definition.link_id.clone(),
                        single_candidate(definition, ctx, self.tabs, node.clone()),
                    );
                }
            }
        }
    }

    /// Second pass: attach current values and drop unchanged candidates.
    fn attach_current(
        &self,
        definitions: &[QuestionnaireItem],
        responses: &[ResponseItem],
        out: &mut ItemsToRepopulate,
    ) {
        let alignment = align(definitions, responses);

        for (definition, slot) in definitions.iter().zip(alignment.iter()) {
            let link_id = definition.link_id.as_str();
            if is_hidden(link_id, self.enable_when) {
                continue;
            }

            match definition.kind() {
                ItemKind::Display => {}
                ItemKind::RepeatingGroup => {
                    let still_differs = match out.get_mut(link_id) {
                        Some(candidate) => {
                            repeat_group::attach_current(candidate, slot.instances())
                        }
                        None => continue,
                    };
                    if !still_differs {
                        out.remove(link_id);
                    }
                }
                ItemKind::Group => {
                    // An absent group still settles the repeating groups nested under it.
                    let node = slot.single();
                    let children = node.map(ResponseItem::items).unwrap_or_default();
                    self.attach_current(definition.children(), children, out);
                    if let Some(node) = node.filter(|_| out.contains(link_id)) {
                        attach_single(out, link_id, group_answer_view(node));
                    }
                }
                ItemKind::Leaf => {
                    if let Some(node) = slot.single() {
                        if out.contains(link_id) {
                            attach_single(out, link_id, node.clone());
                        }
                    }
                }
            }
        }
    }
}

fn single_candidate(
    definition: &QuestionnaireItem,
    ctx: &WalkContext,
    tabs: &Tabs,
    server: ResponseItem,
) -> ItemToRepopulate {
    let values = RepopulateValues::Single {
        server,
        current: None,
    };
    ItemToRepopulate::discovered(definition, ctx, tabs, values)
}

fn attach_single(out: &mut ItemsToRepopulate, link_id: &str, node: ResponseItem) {
    let unchanged = match out.get_mut(link_id).map(|c| &mut c.values) {
        Some(RepopulateValues::Single { server, current }) => {
            if response_items_equal(server, &node) {
                true
            } else {
                *current = Some(node);
                false
            }
        }
        _ => false,
    };

    if unchanged {
        tracing::trace!(link_id, "server and current values are equal");
        out.remove(link_id);
    }
}

/// The part of a group node that a group-level candidate compares and replaces: the node
/// without its nested items.
fn group_answer_view(node: &ResponseItem) -> ResponseItem {
    ResponseItem {
        link_id: node.link_id.clone(),
        text: node.text.clone(),
        answer: node.answer.clone(),
        item: None,
        extra: node.extra.clone(),
    }
}
