//! Fixture builders shared by the unit tests.

use fhir::{LinkId, Questionnaire, QuestionnaireResponse, ResponseItem};
use serde_json::{json, Value};

pub(crate) fn link(id: &str) -> LinkId {
    LinkId::new(id).expect("valid linkId")
}

pub(crate) fn questionnaire(items: Value) -> Questionnaire {
    Questionnaire::with_items(serde_json::from_value(items).expect("parse questionnaire items"))
}

pub(crate) fn response(items: Value) -> QuestionnaireResponse {
    QuestionnaireResponse::with_items(serde_json::from_value(items).expect("parse response items"))
}

pub(crate) fn response_item(item: Value) -> ResponseItem {
    serde_json::from_value(item).expect("parse response item fixture")
}

pub(crate) fn string_answer(link_id: &str, value: &str) -> Value {
    json!({ "linkId": link_id, "answer": [{ "valueString": value }] })
}
