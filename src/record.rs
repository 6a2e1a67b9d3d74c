//! Records emitted by the crawler, shaped for line-delimited JSON output.

use serde::Serialize;

/// One line item of a purchase's object table.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PurchasePosition {
    pub code: String,
    pub name: String,
    pub unit: String,
    pub quantity: Option<f64>,
    pub price_per_unit: Option<f64>,
    pub total_price: Option<f64>,
}

/// One row of the outcome page's participant table.
///
/// `number` stays a string: the registry sometimes lists several sequence
/// numbers in one cell.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Supplier {
    pub name: String,
    pub number: String,
    pub offer: Option<f64>,
}

/// A fully assembled purchase, keyed by the registry number.
///
/// Missing sections of the detail page degrade to empty or `None` fields;
/// the registry's markup varies across listing types and partial records
/// are acceptable.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PurchaseRecord {
    pub id: String,
    pub url: String,
    pub object: String,
    pub customer: Option<String>,
    pub placement_date: Option<String>,
    pub application_deadline: Option<String>,
    pub region: Option<String>,
    pub start_price: Option<f64>,
    pub currency: Option<String>,
    pub purchase_positions: Vec<PurchasePosition>,
    /// Only present when the detail page linked an outcome section.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suppliers: Option<Vec<Supplier>>,
}
