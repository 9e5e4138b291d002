//! Item index aligner.
//!
//! Pairs the children of one definition node with the response siblings at the same level, so
//! that definition order (not response order) drives every tree walk. Matching is scoped to
//! siblings: a linkId is never searched for elsewhere in the tree.
//!
//! Repeating groups appear in a response as a run of siblings sharing one linkId. The aligner
//! hides that irregularity by handing back the whole run as one slot.

use fhir::{QuestionnaireItem, ResponseItem};
use std::collections::HashMap;

/// What a definition child is paired with in one response level.
#[derive(Clone, Debug, PartialEq)]
pub enum AlignedSlot<'a> {
    /// No response node carries the definition's linkId.
    Absent,
    /// The response node for a non-repeating item.
    Single(&'a ResponseItem),
    /// Every instance of a repeating group, in response order (possibly none).
    Repeating(Vec<&'a ResponseItem>),
}

impl<'a> AlignedSlot<'a> {
    /// The matched node of a non-repeating slot.
    pub fn single(&self) -> Option<&'a ResponseItem> {
        match self {
            Self::Single(item) => Some(item),
            _ => None,
        }
    }

    /// The matched instances of a repeating slot; empty for any other slot.
    pub fn instances(&self) -> &[&'a ResponseItem] {
        match self {
            Self::Repeating(items) => items,
            _ => &[],
        }
    }
}

/// Position-indexed pairing of definition children with response siblings.
#[derive(Clone, Debug, PartialEq)]
pub struct Alignment<'a> {
    slots: Vec<AlignedSlot<'a>>,
}

impl<'a> Alignment<'a> {
    /// The slot for the definition child at `position`, if the position exists.
    pub fn get(&self, position: usize) -> Option<&AlignedSlot<'a>> {
        self.slots.get(position)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AlignedSlot<'a>> {
        self.slots.iter()
    }
}

/// Align `definitions` (one parent's children) with `responses` (the matching response level).
///
/// A repeating group takes every response sibling with its linkId. Any other item takes the
/// first one; further siblings with the same linkId are malformed input and are ignored.
/// Response siblings whose linkId matches no definition are ignored as well.
pub fn align<'a>(
    definitions: &[QuestionnaireItem],
    responses: &'a [ResponseItem],
) -> Alignment<'a> {
    let mut by_link_id: HashMap<&str, Vec<&'a ResponseItem>> = HashMap::new();
    for response in responses {
        by_link_id
            .entry(response.link_id.as_str())
            .or_default()
            .push(response);
    }

    let slots = definitions
        .iter()
        .map(|definition| {
            let link_id = definition.link_id.as_str();
            let matched = by_link_id.remove(link_id).unwrap_or_default();

            if definition.is_repeating_group() {
                return AlignedSlot::Repeating(matched);
            }

            let mut matched = matched.into_iter();
            match matched.next() {
                None => AlignedSlot::Absent,
                Some(first) => {
                    let ignored = matched.count();
                    if ignored > 0 {
                        tracing::warn!(
                            link_id,
                            ignored,
                            "non-repeating linkId appears more than once among siblings; using the first"
                        );
                    }
                    AlignedSlot::Single(first)
                }
            }
        })
        .collect();

    if !by_link_id.is_empty() {
        tracing::debug!(
            orphans = ?by_link_id.keys().collect::<Vec<_>>(),
            "response siblings without a matching definition were ignored"
        );
    }

    Alignment { slots }
}
