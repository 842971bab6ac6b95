use serde::{Deserialize, Serialize};

/// Payload of the "create document" call. The limiter never looks inside it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub description: Description,
    pub doc_id: String,
    pub doc_status: String,
    pub doc_type: String,
    #[serde(rename = "importRequest")]
    pub import_request: bool,
    pub owner_inn: String,
    pub participant_inn: String,
    pub producer_inn: String,
    pub production_date: String,
    pub production_type: String,
    pub products: Vec<Product>,
    pub reg_date: String,
    pub reg_number: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Description {
    #[serde(rename = "participantInn")]
    pub participant_inn: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub certificate_document: String,
    pub certificate_document_date: String,
    pub certificate_document_number: String,
    pub owner_inn: String,
    pub producer_inn: String,
    pub production_date: String,
    pub tnved_code: String,
    pub uit_code: String,
    pub uitu_code: String,
}
