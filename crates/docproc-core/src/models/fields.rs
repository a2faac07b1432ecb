//! Parsed invoice fields and line items.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Sentinel stored in place of a field the parser could not match.
///
/// Internally fields are `Option<String>`; the literal sentinel appears only
/// in persisted/observed payloads, for compatibility with existing readers.
pub const NOT_FOUND: &str = "not found";

/// Business fields extracted from one invoice.
///
/// Every field is always present in the stored payload: a matched value or
/// the [`NOT_FOUND`] sentinel, never an absent key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InvoiceFields {
    pub invoice_number: Option<String>,
    pub invoice_date: Option<String>,
    pub due_date: Option<String>,
    pub vendor_name: Option<String>,
    pub vendor_pin: Option<String>,
    pub vendor_address: Option<String>,
    pub buyer_name: Option<String>,
    pub buyer_pin: Option<String>,
    pub buyer_address: Option<String>,
    pub subtotal: Option<String>,
    pub taxable_amount: Option<String>,
    pub tax_amount: Option<String>,
    pub total_amount: Option<String>,
    pub currency: Option<String>,
    pub payment_terms: Option<String>,
    pub purchase_order: Option<String>,
    pub payment_instructions: Option<String>,
    pub delivery_address: Option<String>,
    pub remarks: Option<String>,

    /// Ordered line-item table; empty when no rows matched.
    pub line_items: Vec<LineItem>,
}

impl InvoiceFields {
    /// All named fields with their stored keys, in declaration order.
    pub fn entries(&self) -> [(&'static str, &Option<String>); 19] {
        [
            ("invoice_number", &self.invoice_number),
            ("invoice_date", &self.invoice_date),
            ("due_date", &self.due_date),
            ("vendor_name", &self.vendor_name),
            ("vendor_pin", &self.vendor_pin),
            ("vendor_address", &self.vendor_address),
            ("buyer_name", &self.buyer_name),
            ("buyer_pin", &self.buyer_pin),
            ("buyer_address", &self.buyer_address),
            ("subtotal", &self.subtotal),
            ("taxable_amount", &self.taxable_amount),
            ("tax_amount", &self.tax_amount),
            ("total_amount", &self.total_amount),
            ("currency", &self.currency),
            ("payment_terms", &self.payment_terms),
            ("purchase_order", &self.purchase_order),
            ("payment_instructions", &self.payment_instructions),
            ("delivery_address", &self.delivery_address),
            ("remarks", &self.remarks),
        ]
    }

    /// Render the fields for persistence, substituting the sentinel for
    /// unmatched fields so every key is always populated.
    pub fn to_stored_value(&self) -> Value {
        let mut map = serde_json::Map::new();
        for (key, value) in self.entries() {
            let rendered = value.as_deref().unwrap_or(NOT_FOUND);
            map.insert(key.to_string(), json!(rendered));
        }
        map.insert(
            "line_items".to_string(),
            serde_json::to_value(&self.line_items).unwrap_or(Value::Array(Vec::new())),
        );
        Value::Object(map)
    }
}

/// One row of the invoice's line-item table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    /// Item code (SKU or catalogue reference).
    pub code: String,

    /// Item description.
    pub description: String,

    /// Quantity.
    pub quantity: Decimal,

    /// Price per unit before tax.
    pub unit_price: Decimal,

    /// Tax rate in percent.
    pub tax_rate: Decimal,

    /// Line subtotal before tax.
    pub subtotal: Decimal,

    /// Tax amount for this line.
    pub tax_amount: Decimal,

    /// Line total after tax.
    pub total: Decimal,
}
