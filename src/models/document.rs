use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Document accepted by the `lk/documents/create` endpoint. Field names
/// follow the API's JSON schema, which mixes snake and camel case. Unset
/// fields are left out of the request body.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Document {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<Description>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc_type: Option<String>,
    #[serde(rename = "importRequest", default)]
    pub import_request: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_inn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub participant_inn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub producer_inn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub production_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub production_type: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub products: Vec<Product>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reg_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reg_number: Option<String>,
}

impl Document {
    /// Identifier used in log lines.
    pub fn display_id(&self) -> &str {
        self.doc_id.as_deref().unwrap_or("<no doc_id>")
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Description {
    #[serde(rename = "participantInn", skip_serializing_if = "Option::is_none")]
    pub participant_inn: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Product {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub certificate_document: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub certificate_document_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub certificate_document_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_inn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub producer_inn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub production_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tnved_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uit_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uitu_code: Option<String>,
}
