//! Repeating-group handling for the diff walker and the merge builder.
//!
//! Instances of a repeating group have no identity beyond their position, and position can
//! legitimately change between the server tree and local edits. The instance array is
//! therefore compared and replaced as one unit. A local edit to one instance and a server
//! change to another show up as a single changed array; approving it replaces every local
//! instance with the server instances.

use crate::candidate::{ItemToRepopulate, ItemsToRepopulate, RepopulateValues};
use crate::context::{Tabs, WalkContext};
use crate::equality::instances_equal;
use fhir::{QuestionnaireItem, ResponseItem};

/// Record the server instances of `definition` as one candidate.
///
/// A group with no server instances has no new data and yields no candidate.
pub(crate) fn discover(
    definition: &QuestionnaireItem,
    instances: &[&ResponseItem],
    ctx: &WalkContext,
    tabs: &Tabs,
) -> Option<ItemToRepopulate> {
    if instances.is_empty() {
        return None;
    }

    tracing::trace!(
        link_id = %definition.link_id,
        instances = instances.len(),
        "repeating group discovered"
    );

    let values = RepopulateValues::RepeatGroup {
        server: instances.iter().map(|i| (*i).clone()).collect(),
        current: None,
    };
    Some(ItemToRepopulate::discovered(definition, ctx, tabs, values))
}

/// Attach the current instances to a discovered candidate.
///
/// Returns `false` when the arrays are equal, meaning the candidate should be dropped.
pub(crate) fn attach_current(
    candidate: &mut ItemToRepopulate,
    instances: &[&ResponseItem],
) -> bool {
    match &mut candidate.values {
        RepopulateValues::RepeatGroup { server, current } => {
            if instances_equal(server.as_slice(), instances) {
                return false;
            }
            *current = Some(instances.iter().map(|i| (*i).clone()).collect());
            true
        }
        RepopulateValues::Single { .. } => true,
    }
}

/// The instance array `definition` should have after merging `approved`.
///
/// Approved groups take the server array wholesale (which may be empty); all others keep the
/// existing instances untouched.
pub fn merge_instances(
    definition: &QuestionnaireItem,
    existing: &[&ResponseItem],
    approved: &ItemsToRepopulate,
) -> Vec<ResponseItem> {
    match approved
        .get(definition.link_id.as_str())
        .and_then(ItemToRepopulate::server_qr_items)
    {
        Some(server) => server.to_vec(),
        None => existing.iter().map(|i| (*i).clone()).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{link, questionnaire, response_item};
    use serde_json::json;

    fn medications() -> QuestionnaireItem {
        questionnaire(json!([{
            "linkId": "meds",
            "type": "group",
            "repeats": true,
            "text": "Medications",
            "item": [{ "linkId": "med-name", "type": "string", "text": "Name" }]
        }]))
        .items()[0]
            .clone()
    }

    fn instance(name: &str) -> ResponseItem {
        response_item(json!({
            "linkId": "meds",
            "item": [{ "linkId": "med-name", "answer": [{ "valueString": name }] }]
        }))
    }

    #[test]
    fn no_server_instances_means_no_candidate() {
        let def = medications();
        assert!(discover(&def, &[], &WalkContext::root(), &Tabs::new()).is_none());
    }

    #[test]
    fn whole_array_is_one_candidate() {
        let def = medications();
        let (a, b) = (instance("Aspirin"), instance("Metformin"));
        let candidate =
            discover(&def, &[&a, &b], &WalkContext::root(), &Tabs::new()).expect("candidate");

        assert!(candidate.is_repeat_group());
        assert_eq!(candidate.server_qr_items(), Some(&[a, b][..]));
        assert_eq!(candidate.section_item_text.as_deref(), Some("Medications"));
    }

    #[test]
    fn equal_current_array_drops_candidate() {
        let def = medications();
        let (a, b) = (instance("Aspirin"), instance("Metformin"));
        let mut candidate =
            discover(&def, &[&a, &b], &WalkContext::root(), &Tabs::new()).expect("candidate");

        let (a2, b2) = (a.clone(), b.clone());
        assert!(!attach_current(&mut candidate, &[&a2, &b2]));
    }

    #[test]
    fn reordered_or_shorter_arrays_are_changes() {
        let def = medications();
        let (a, b) = (instance("Aspirin"), instance("Metformin"));
        let mut candidate =
            discover(&def, &[&a, &b], &WalkContext::root(), &Tabs::new()).expect("candidate");

        assert!(attach_current(&mut candidate, &[&b, &a]));
        assert_eq!(candidate.current_qr_items().map(<[_]>::len), Some(2));

        assert!(attach_current(&mut candidate, &[]));
        assert_eq!(candidate.current_qr_items(), Some(&[][..]));
    }

    #[test]
    fn merge_replaces_only_approved_arrays() {
        let def = medications();
        let (server_a, server_b) = (instance("Aspirin"), instance("Metformin"));
        let local = instance("Paracetamol");

        let candidate = discover(&def, &[&server_a, &server_b], &WalkContext::root(), &Tabs::new())
            .expect("candidate");
        let approved: ItemsToRepopulate = [(link("meds"), candidate)].into_iter().collect();

        let merged = merge_instances(&def, &[&local], &approved);
        assert_eq!(merged, vec![server_a, server_b]);

        let untouched = merge_instances(&def, &[&local], &ItemsToRepopulate::new());
        assert_eq!(untouched, vec![local]);
    }
}
