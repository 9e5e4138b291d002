//! Equality oracle over response subtrees.
//!
//! Structural equality decides whether a candidate carries a real change. It is total and
//! reflexive over any response shape: unknown members are compared as JSON, object member
//! order is irrelevant, and numbers compare by value so `1` and `1.0` are equal.
//!
//! `answer: []` and an absent `answer` are different shapes and compare unequal.

use fhir::{Answer, ResponseItem};
use serde_json::{Map, Number, Value};
use std::borrow::Borrow;

/// Deep equality of two response nodes, including their whole subtrees.
pub fn response_items_equal(a: &ResponseItem, b: &ResponseItem) -> bool {
    a.link_id == b.link_id
        && a.text == b.text
        && options_equal(a.answer.as_deref(), b.answer.as_deref(), answers_equal)
        && options_equal(a.item.as_deref(), b.item.as_deref(), items_equal)
        && maps_equal(&a.extra, &b.extra)
}

/// Deep equality of two repeating-group instance arrays. Order matters.
pub fn instances_equal<A, B>(a: &[A], b: &[B]) -> bool
where
    A: Borrow<ResponseItem>,
    B: Borrow<ResponseItem>,
{
    a.len() == b.len()
        && a
            .iter()
            .zip(b)
            .all(|(x, y)| response_items_equal(x.borrow(), y.borrow()))
}

/// Deep equality of two arbitrary JSON values.
pub fn json_values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Number(x), Value::Number(y)) => numbers_equal(x, y),
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(l, r)| json_values_equal(l, r))
        }
        (Value::Object(x), Value::Object(y)) => maps_equal(x, y),
        _ => false,
    }
}

fn items_equal(a: &[ResponseItem], b: &[ResponseItem]) -> bool {
    instances_equal(a, b)
}

fn answers_equal(a: &[Answer], b: &[Answer]) -> bool {
    a.len() == b.len()
        && a.iter().zip(b).all(|(x, y)| {
            options_equal(x.item.as_deref(), y.item.as_deref(), items_equal)
                && maps_equal(&x.fields, &y.fields)
        })
}

fn options_equal<T: ?Sized>(a: Option<&T>, b: Option<&T>, eq: fn(&T, &T) -> bool) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(x), Some(y)) => eq(x, y),
        _ => false,
    }
}

fn maps_equal(a: &Map<String, Value>, b: &Map<String, Value>) -> bool {
    a.len() == b.len()
        && a.iter()
            .all(|(key, value)| b.get(key).is_some_and(|other| json_values_equal(value, other)))
}

fn numbers_equal(a: &Number, b: &Number) -> bool {
    if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
        return x == y;
    }
    if let (Some(x), Some(y)) = (a.as_u64(), b.as_u64()) {
        return x == y;
    }
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => false,
    }
}
