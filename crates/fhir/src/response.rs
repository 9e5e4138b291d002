//! FHIR `QuestionnaireResponse` wire models.
//!
//! Responsibilities:
//! - Define the response tree as it appears in FHIR JSON
//! - Provide a typed, read-only view over `answer.value[x]` for display purposes
//! - Parse and render whole `QuestionnaireResponse` resources
//!
//! Notes:
//! - A repeating group is not a node with an array property: it is a run of sibling
//!   [`ResponseItem`]s that share one linkId
//! - `answer: None` and `answer: Some(vec![])` are kept distinct so that rendering reproduces
//!   the input shape exactly

use crate::{deserialize_with_path, expect_resource_type, FhirResult, LinkId};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

// ============================================================================
// Public domain-level types
// ============================================================================

/// A FHIR `QuestionnaireResponse` resource.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionnaireResponse {
    pub resource_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item: Option<Vec<ResponseItem>>,

    /// Members not interpreted by this crate (questionnaire, subject, authored, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl QuestionnaireResponse {
    /// Create an in-progress response with the given top-level items.
    pub fn with_items(items: Vec<ResponseItem>) -> Self {
        Self {
            resource_type: ResponseResource::RESOURCE_TYPE.to_string(),
            id: None,
            status: Some("in-progress".to_string()),
            item: Some(items),
            extra: Map::new(),
        }
    }

    /// Top-level items, or an empty slice when `item` is absent.
    pub fn items(&self) -> &[ResponseItem] {
        self.item.as_deref().unwrap_or_default()
    }
}

/// One node of a response tree.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseItem {
    pub link_id: LinkId,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<Vec<Answer>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item: Option<Vec<ResponseItem>>,

    /// Members not interpreted by this crate (id, definition, extension, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ResponseItem {
    pub fn new(link_id: LinkId) -> Self {
        Self {
            link_id,
            text: None,
            answer: None,
            item: None,
            extra: Map::new(),
        }
    }

    pub fn answers(&self) -> &[Answer] {
        self.answer.as_deref().unwrap_or_default()
    }

    pub fn items(&self) -> &[ResponseItem] {
        self.item.as_deref().unwrap_or_default()
    }

    pub fn has_answer(&self) -> bool {
        !self.answers().is_empty()
    }

    /// Whether the node carries anything worth keeping in a response.
    pub fn has_items_or_answer(&self) -> bool {
        self.has_answer() || !self.items().is_empty()
    }

    pub fn first_answer(&self) -> Option<&Answer> {
        self.answers().first()
    }

    /// First direct child with the given linkId.
    pub fn child(&self, link_id: &str) -> Option<&ResponseItem> {
        self.items().iter().find(|i| i.link_id.as_str() == link_id)
    }
}

/// A FHIR `QuestionnaireResponse.item.answer`.
///
/// `value[x]` and any other members live in `fields`; [`Answer::value`] gives a typed view.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item: Option<Vec<ResponseItem>>,

    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Answer {
    pub fn value_string(value: impl Into<String>) -> Self {
        Self::with_value("valueString", Value::String(value.into()))
    }

    pub fn value_integer(value: i64) -> Self {
        Self::with_value("valueInteger", Value::from(value))
    }

    pub fn value_boolean(value: bool) -> Self {
        Self::with_value("valueBoolean", Value::Bool(value))
    }

    fn with_value(key: &str, value: Value) -> Self {
        let mut fields = Map::new();
        fields.insert(key.to_string(), value);
        Self { item: None, fields }
    }

    /// Typed view of `value[x]`, if the answer carries a recognised value.
    pub fn value(&self) -> Option<AnswerValue<'_>> {
        self.fields
            .iter()
            .find_map(|(key, value)| AnswerValue::from_member(key, value))
    }
}

/// Borrowed, typed view of an answer's `value[x]`.
#[derive(Clone, Debug, PartialEq)]
pub enum AnswerValue<'a> {
    String(&'a str),
    Integer(i64),
    Decimal(f64),
    Boolean(bool),
    Date(&'a str),
    DateTime(&'a str),
    Time(&'a str),
    Uri(&'a str),
    Coding {
        code: Option<&'a str>,
        display: Option<&'a str>,
    },
    Quantity {
        value: Option<f64>,
        unit: Option<&'a str>,
    },
    Reference {
        reference: Option<&'a str>,
        display: Option<&'a str>,
    },
    Attachment {
        title: Option<&'a str>,
        url: Option<&'a str>,
    },
}

impl<'a> AnswerValue<'a> {
    fn from_member(key: &str, value: &'a Value) -> Option<Self> {
        let str_of = |field: &str| value.get(field).and_then(Value::as_str);
        match key {
            "valueString" => value.as_str().map(Self::String),
            "valueInteger" => value.as_i64().map(Self::Integer),
            "valueDecimal" => value.as_f64().map(Self::Decimal),
            "valueBoolean" => value.as_bool().map(Self::Boolean),
            "valueDate" => value.as_str().map(Self::Date),
            "valueDateTime" => value.as_str().map(Self::DateTime),
            "valueTime" => value.as_str().map(Self::Time),
            "valueUri" => value.as_str().map(Self::Uri),
            "valueCoding" => value.is_object().then(|| Self::Coding {
                code: str_of("code"),
                display: str_of("display"),
            }),
            "valueQuantity" => value.is_object().then(|| Self::Quantity {
                value: value.get("value").and_then(Value::as_f64),
                unit: str_of("unit").or(str_of("code")),
            }),
            "valueReference" => value.is_object().then(|| Self::Reference {
                reference: str_of("reference"),
                display: str_of("display"),
            }),
            "valueAttachment" => value.is_object().then(|| Self::Attachment {
                title: str_of("title"),
                url: str_of("url"),
            }),
            _ => None,
        }
    }
}

impl fmt::Display for AnswerValue<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) | Self::Date(s) | Self::DateTime(s) | Self::Time(s) | Self::Uri(s) => {
                write!(f, "{s}")
            }
            Self::Integer(n) => write!(f, "{n}"),
            Self::Decimal(n) => write!(f, "{n}"),
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Coding { code, display } => write!(f, "{}", display.or(*code).unwrap_or("")),
            Self::Quantity { value, unit } => match (value, unit) {
                (Some(v), Some(u)) => write!(f, "{v} {u}"),
                (Some(v), None) => write!(f, "{v}"),
                (None, Some(u)) => write!(f, "{u}"),
                (None, None) => Ok(()),
            },
            Self::Reference { reference, display } => {
                write!(f, "{}", display.or(*reference).unwrap_or(""))
            }
            Self::Attachment { title, url } => write!(f, "{}", title.or(*url).unwrap_or("")),
        }
    }
}

// ============================================================================
// Public QuestionnaireResponse operations
// ============================================================================

/// QuestionnaireResponse parse/render operations.
///
/// This is a zero-sized type used for namespacing response-related operations.
/// All methods are associated functions.
pub struct ResponseResource;

impl ResponseResource {
    pub const RESOURCE_TYPE: &'static str = "QuestionnaireResponse";

    /// Parse a questionnaire response from JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`crate::FhirError`] if the JSON does not match the model (the error names the
    /// failing path), any `linkId` is empty, or `resourceType` is not `QuestionnaireResponse`.
    pub fn parse_json(json_text: &str) -> FhirResult<QuestionnaireResponse> {
        let mut deserializer = serde_json::Deserializer::from_str(json_text);
        let response: QuestionnaireResponse =
            deserialize_with_path(&mut deserializer, Self::RESOURCE_TYPE)?;
        deserializer.end()?;
        expect_resource_type(&response.resource_type, Self::RESOURCE_TYPE)?;
        Ok(response)
    }

    /// Parse a questionnaire response from YAML text.
    pub fn parse_yaml(yaml_text: &str) -> FhirResult<QuestionnaireResponse> {
        let deserializer = serde_yaml::Deserializer::from_str(yaml_text);
        let response: QuestionnaireResponse =
            deserialize_with_path(deserializer, Self::RESOURCE_TYPE)?;
        expect_resource_type(&response.resource_type, Self::RESOURCE_TYPE)?;
        Ok(response)
    }

    /// Render a questionnaire response as pretty-printed JSON.
    pub fn render_json(response: &QuestionnaireResponse) -> FhirResult<String> {
        Ok(serde_json::to_string_pretty(response)?)
    }
}
