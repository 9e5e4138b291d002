//! Helpers for presenting a change-set to a reviewer.
//!
//! Responsibilities:
//! - Group candidates under their section headings
//! - Break a candidate down into per-field value changes, rendered as display strings
//! - Group the changes of a repeating group by row and classify a set of changes
//!
//! Notes:
//! - Only the first answer of each field is compared; this is a display aid, not the
//!   authoritative equality used by the diff walker
//! - Candidates without a definition degrade to one comparison of all their answers

use crate::candidate::{ItemToRepopulate, ItemsToRepopulate, RepopulateValues};
use crate::constants::UNSECTIONED_HEADING;
use fhir::{ItemType, LinkId, QuestionnaireItem, ResponseItem};
use indexmap::IndexMap;
use serde::Serialize;
use std::collections::BTreeMap;

// ============================================================================
// Public types
// ============================================================================

/// One field whose displayed value differs between server and current.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeEntry {
    /// Label of the field the change belongs to (a non-repeating group, or the item itself).
    pub field_label: String,
    /// Text of the changed item.
    pub item_text: String,
    pub link_id: String,
    pub server_value: Option<String>,
    pub current_value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row_index: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row_label: Option<String>,
}

/// The changes of one repeating-group row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RowChanges<'a> {
    pub row_index: usize,
    pub row_label: String,
    pub changes: Vec<&'a ChangeEntry>,
}

/// How a set of changes should be presented.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueChangeMode {
    /// Only server values are present.
    New,
    /// Both sides carry values.
    Updated,
    /// Only current values are present.
    Removed,
}

// ============================================================================
// Public operations
// ============================================================================

/// Group candidates by `sectionItemText`, keeping change-set order within and across sections.
pub fn group_by_section(
    candidates: &ItemsToRepopulate,
) -> IndexMap<String, Vec<(&LinkId, &ItemToRepopulate)>> {
    let mut sections: IndexMap<String, Vec<(&LinkId, &ItemToRepopulate)>> = IndexMap::new();
    for (link_id, candidate) in candidates.iter() {
        let heading = candidate
            .section_item_text
            .clone()
            .unwrap_or_else(|| UNSECTIONED_HEADING.to_string());
        sections.entry(heading).or_default().push((link_id, candidate));
    }
    sections
}

/// Per-field value changes of one candidate.
pub fn detect_changes(candidate: &ItemToRepopulate) -> Vec<ChangeEntry> {
    let mut changes = Vec::new();

    match (&candidate.q_item, &candidate.values) {
        (Some(definition), RepopulateValues::Single { server, current }) => {
            let walker = ChangeWalker {
                root: definition,
                row: None,
            };
            walker.visit(definition, definition, Some(server), current.as_ref(), &mut changes);
        }
        (Some(definition), RepopulateValues::RepeatGroup { server, current }) => {
            let current = current.as_deref().unwrap_or_default();
            for row_index in 0..server.len().max(current.len()) {
                let server_row = server.get(row_index);
                let current_row = current.get(row_index);
                let label = row_label(definition, row_index, server_row, current_row);
                let walker = ChangeWalker {
                    root: definition,
                    row: Some((row_index, &label)),
                };

                for column in definition.children() {
                    walker.visit(
                        column,
                        column,
                        server_row.and_then(|r| r.child(column.link_id.as_str())),
                        current_row.and_then(|r| r.child(column.link_id.as_str())),
                        &mut changes,
                    );
                }
            }
        }
        (None, RepopulateValues::Single { server, current }) => {
            push_flat_change(&mut changes, server, Some(server), current.as_ref(), None);
        }
        (None, RepopulateValues::RepeatGroup { server, current }) => {
            let current = current.as_deref().unwrap_or_default();
            let Some(label_node) = server.first().or(current.first()) else {
                return changes;
            };
            for row_index in 0..server.len().max(current.len()) {
                let row = (row_index, format!("Row {}", row_index + 1));
                push_flat_change(
                    &mut changes,
                    label_node,
                    server.get(row_index),
                    current.get(row_index),
                    Some(row),
                );
            }
        }
    }

    changes
}

/// Group row-scoped changes by row, ordered by row index. Changes without a row are skipped.
pub fn group_changes_by_row(changes: &[ChangeEntry]) -> Vec<RowChanges<'_>> {
    let mut rows: BTreeMap<usize, RowChanges<'_>> = BTreeMap::new();
    for change in changes {
        let Some(row_index) = change.row_index else {
            continue;
        };
        rows.entry(row_index)
            .or_insert_with(|| RowChanges {
                row_index,
                row_label: change
                    .row_label
                    .clone()
                    .unwrap_or_else(|| format!("Row {}", row_index + 1)),
                changes: Vec::new(),
            })
            .changes
            .push(change);
    }
    rows.into_values().collect()
}

/// Classify a set of changes for presentation.
pub fn value_change_mode(changes: &[ChangeEntry]) -> ValueChangeMode {
    let present = |value: &Option<String>| value.as_deref().is_some_and(|v| !v.is_empty());
    let has_current = changes.iter().any(|c| present(&c.current_value));
    let has_server = changes.iter().any(|c| present(&c.server_value));

    match (has_server, has_current) {
        (true, false) => ValueChangeMode::New,
        (false, true) => ValueChangeMode::Removed,
        _ => ValueChangeMode::Updated,
    }
}

// ============================================================================
// Helper functions (internal)
// ============================================================================

struct ChangeWalker<'a> {
    root: &'a QuestionnaireItem,
    row: Option<(usize, &'a str)>,
}

impl ChangeWalker<'_> {
    fn visit(
        &self,
        definition: &QuestionnaireItem,
        field: &QuestionnaireItem,
        server: Option<&ResponseItem>,
        current: Option<&ResponseItem>,
        out: &mut Vec<ChangeEntry>,
    ) {
        let is_group = definition.item_type == ItemType::Group;
        let is_choice_group = is_group
            && definition
                .extra
                .get("answerOption")
                .and_then(|v| v.as_array())
                .is_some_and(|options| !options.is_empty());

        if !is_group || is_choice_group {
            let server_value = server.and_then(first_answer_string);
            let current_value = current.and_then(first_answer_string);
            if server_value != current_value {
                out.push(ChangeEntry {
                    field_label: label_of(field),
                    item_text: label_of(definition),
                    link_id: definition.link_id.to_string(),
                    server_value,
                    current_value,
                    row_index: self.row.map(|(index, _)| index),
                    row_label: self.row.map(|(_, label)| label.to_string()),
                });
            }
        }

        // Plain groups below the candidate become the field label of their contents.
        let next_field = if is_group
            && definition.repeats != Some(true)
            && !definition.is_grid()
            && definition.link_id != self.root.link_id
        {
            definition
        } else {
            field
        };

        for child in definition.children() {
            let link_id = child.link_id.as_str();
            self.visit(
                child,
                next_field,
                server.and_then(|s| s.child(link_id)),
                current.and_then(|c| c.child(link_id)),
                out,
            );
        }
    }
}

fn row_label(
    definition: &QuestionnaireItem,
    row_index: usize,
    server_row: Option<&ResponseItem>,
    current_row: Option<&ResponseItem>,
) -> String {
    let fallback = || format!("Row {}", row_index + 1);
    let Some(first_column) = definition.children().first() else {
        return fallback();
    };

    let link_id = first_column.link_id.as_str();
    let cell = server_row
        .and_then(|r| r.child(link_id))
        .or_else(|| current_row.and_then(|r| r.child(link_id)));

    match cell.and_then(first_answer_string) {
        Some(value) => format!("{}: {value}", label_of(first_column)),
        None => fallback(),
    }
}

fn push_flat_change(
    out: &mut Vec<ChangeEntry>,
    label_node: &ResponseItem,
    server: Option<&ResponseItem>,
    current: Option<&ResponseItem>,
    row: Option<(usize, String)>,
) {
    let server_value = server.and_then(all_answer_strings);
    let current_value = current.and_then(all_answer_strings);
    if server_value == current_value {
        return;
    }

    let label = label_node
        .text
        .clone()
        .unwrap_or_else(|| label_node.link_id.to_string());
    let (row_index, row_label) = row.unzip();
    out.push(ChangeEntry {
        field_label: label.clone(),
        item_text: label,
        link_id: label_node.link_id.to_string(),
        server_value,
        current_value,
        row_index,
        row_label,
    });
}

fn label_of(item: &QuestionnaireItem) -> String {
    item.text
        .clone()
        .unwrap_or_else(|| item.link_id.to_string())
}

fn first_answer_string(node: &ResponseItem) -> Option<String> {
    node.first_answer()
        .map(|answer| answer.value().map(|v| v.to_string()).unwrap_or_default())
}

/// Every answer below `node`, depth first, joined for display.
fn all_answer_strings(node: &ResponseItem) -> Option<String> {
    let mut values = Vec::new();
    collect_answer_strings(node, &mut values);
    (!values.is_empty()).then(|| values.join(", "))
}

fn collect_answer_strings(node: &ResponseItem, out: &mut Vec<String>) {
    for answer in node.answers() {
        if let Some(value) = answer.value() {
            out.push(value.to_string());
        }
        for nested in answer.item.as_deref().unwrap_or_default() {
            collect_answer_strings(nested, out);
        }
    }
    for child in node.items() {
        collect_answer_strings(child, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Tabs;
    use crate::diff::compute_candidates;
    use crate::test_support::{questionnaire, response, response_item, string_answer};
    use crate::visibility::EnableWhenState;
    use serde_json::json;

    fn single(
        q_item: Option<QuestionnaireItem>,
        section: Option<&str>,
        server: serde_json::Value,
        current: Option<serde_json::Value>,
    ) -> ItemToRepopulate {
        ItemToRepopulate {
            q_item,
            section_item_text: section.map(str::to_string),
            parent_item_text: None,
            is_in_grid: false,
            values: RepopulateValues::Single {
                server: response_item(server),
                current: current.map(response_item),
            },
        }
    }

    fn weight_group() -> QuestionnaireItem {
        questionnaire(json!([{
            "linkId": "weight", "type": "group", "text": "Weight",
            "item": [
                { "linkId": "weight-value", "type": "decimal", "text": "Value" },
                { "linkId": "weight-date", "type": "date", "text": "Date performed" }
            ]
        }]))
        .items()[0]
            .clone()
    }

    #[test]
    fn groups_candidates_by_section_in_order() {
        let candidates: ItemsToRepopulate = [
            ("a", Some("About")),
            ("b", None),
            ("c", Some("About")),
        ]
        .into_iter()
        .map(|(id, section)| {
            (
                LinkId::new(id).expect("linkId"),
                single(None, section, string_answer(id, "x"), None),
            )
        })
        .collect();

        let sections = group_by_section(&candidates);
        let headings: Vec<&str> = sections.keys().map(String::as_str).collect();
        assert_eq!(headings, vec!["About", ""]);
        let about: Vec<&str> = sections["About"].iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(about, vec!["a", "c"]);
    }

    #[test]
    fn leaf_change_compares_first_answers() {
        let def = questionnaire(json!([{ "linkId": "q1", "type": "string", "text": "Name" }]))
            .items()[0]
            .clone();
        let candidate = single(
            Some(def),
            None,
            string_answer("q1", "B"),
            Some(string_answer("q1", "A")),
        );

        assert_eq!(
            detect_changes(&candidate),
            vec![ChangeEntry {
                field_label: "Name".into(),
                item_text: "Name".into(),
                link_id: "q1".into(),
                server_value: Some("B".into()),
                current_value: Some("A".into()),
                row_index: None,
                row_label: None,
            }]
        );
    }

    #[test]
    fn group_changes_are_reported_per_field() {
        let server = json!({ "linkId": "weight", "item": [
            { "linkId": "weight-value", "answer": [{ "valueDecimal": 80.5 }] },
            { "linkId": "weight-date", "answer": [{ "valueDate": "2026-01-01" }] }
        ] });
        let current = json!({ "linkId": "weight", "item": [
            { "linkId": "weight-value", "answer": [{ "valueDecimal": 78 }] },
            { "linkId": "weight-date", "answer": [{ "valueDate": "2026-01-01" }] }
        ] });
        let candidate = single(Some(weight_group()), None, server, Some(current));

        let changes = detect_changes(&candidate);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].field_label, "Weight");
        assert_eq!(changes[0].item_text, "Value");
        assert_eq!(changes[0].server_value.as_deref(), Some("80.5"));
        assert_eq!(changes[0].current_value.as_deref(), Some("78"));
        assert_eq!(value_change_mode(&changes), ValueChangeMode::Updated);
    }

    #[test]
    fn repeating_group_changes_are_labelled_by_row() {
        let q = questionnaire(json!([{
            "linkId": "conditions", "type": "group", "repeats": true, "text": "Conditions",
            "item": [
                { "linkId": "condition", "type": "string", "text": "Condition" },
                { "linkId": "status", "type": "string", "text": "Status" }
            ]
        }]));
        let row = |condition: &str, status: &str| {
            json!({ "linkId": "conditions", "item": [
                string_answer("condition", condition),
                string_answer("status", status)
            ] })
        };
        let server = response(json!([row("CKD", "active"), row("Asthma", "resolved")]));
        let current = response(json!([row("CKD", "inactive")]));

        let candidates =
            compute_candidates(&q, &server, &current, &Tabs::new(), &EnableWhenState::new());
        let candidate = candidates.get("conditions").expect("conditions candidate");

        let changes = detect_changes(candidate);
        let rows = group_changes_by_row(&changes);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].row_label, "Condition: CKD");
        assert_eq!(rows[0].changes.len(), 1);
        assert_eq!(rows[0].changes[0].link_id, "status");
        assert_eq!(rows[1].row_label, "Condition: Asthma");
        assert_eq!(rows[1].changes.len(), 2);
        assert_eq!(value_change_mode(&changes), ValueChangeMode::Updated);
    }

    #[test]
    fn unresolved_definition_degrades_to_one_comparison() {
        let server = json!({ "linkId": "bp", "item": [
            { "linkId": "sys", "answer": [{ "valueInteger": 120 }] },
            { "linkId": "dia", "answer": [{ "valueInteger": 80 }] }
        ] });
        let candidate = single(None, None, server, None);

        let changes = detect_changes(&candidate);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].field_label, "bp");
        assert_eq!(changes[0].server_value.as_deref(), Some("120, 80"));
        assert_eq!(changes[0].current_value, None);
        assert_eq!(value_change_mode(&changes), ValueChangeMode::New);
    }

    #[test]
    fn removed_values_are_classified() {
        let changes = vec![ChangeEntry {
            field_label: "Smoking".into(),
            item_text: "Smoking".into(),
            link_id: "smoking".into(),
            server_value: Some(String::new()),
            current_value: Some("yes".into()),
            row_index: Some(0),
            row_label: None,
        }];
        assert_eq!(value_change_mode(&changes), ValueChangeMode::Removed);
        assert_eq!(group_changes_by_row(&changes)[0].row_label, "Row 1");
    }
}
