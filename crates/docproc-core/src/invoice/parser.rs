//! Field parser over the formatted recognized text of all pages.

use std::str::FromStr;

use regex::Regex;
use rust_decimal::Decimal;
use tracing::debug;

use super::patterns::*;
use crate::models::fields::{InvoiceFields, LineItem};

/// Currency inference: first matching symbol wins. Checked against the
/// uppercased text since the formatter uppercases short total lines.
const CURRENCY_SYMBOLS: [(&str, &str); 8] = [
    ("KSH", "KES"),
    ("KES", "KES"),
    ("USD", "USD"),
    ("$", "USD"),
    ("EUR", "EUR"),
    ("€", "EUR"),
    ("GBP", "GBP"),
    ("£", "GBP"),
];

/// Extracts named business fields and the line-item table from the joined
/// formatted text. Stateless; parsing identical text twice yields identical
/// fields.
#[derive(Debug, Default)]
pub struct FieldParser;

impl FieldParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse all fields. Unmatched fields become `None` (rendered as the
    /// "not found" sentinel at persistence time); this never fails, so a
    /// document whose pages all degraded still flows through the pipeline
    /// with all-sentinel fields.
    pub fn parse(&self, text: &str) -> InvoiceFields {
        let fields = InvoiceFields {
            invoice_number: single_pattern(text, &INVOICE_NUMBER),
            invoice_date: single_pattern(text, &INVOICE_DATE),
            due_date: single_pattern(text, &DUE_DATE),
            vendor_name: single_pattern(text, &VENDOR_NAME),
            vendor_pin: single_pattern(text, &VENDOR_PIN),
            vendor_address: labeled_block(text, "vendor address"),
            buyer_name: single_pattern(text, &BUYER_NAME),
            buyer_pin: single_pattern(text, &BUYER_PIN),
            buyer_address: labeled_block(text, "buyer address"),
            subtotal: single_pattern(text, &SUBTOTAL),
            taxable_amount: single_pattern(text, &TAXABLE_AMOUNT),
            tax_amount: single_pattern(text, &TAX_AMOUNT),
            total_amount: single_pattern(text, &TOTAL_AMOUNT),
            currency: infer_currency(text),
            payment_terms: single_pattern(text, &PAYMENT_TERMS),
            purchase_order: single_pattern(text, &PURCHASE_ORDER),
            payment_instructions: labeled_block(text, "payment instructions"),
            delivery_address: labeled_block(text, "delivery address"),
            remarks: labeled_block(text, "remarks"),
            line_items: extract_line_items(text),
        };

        let matched = fields.entries().iter().filter(|(_, v)| v.is_some()).count();
        debug!(
            matched,
            line_items = fields.line_items.len(),
            "field extraction complete"
        );

        fields
    }
}

/// Single-pattern strategy: apply one fixed pattern, return the first
/// capture group trimmed.
fn single_pattern(text: &str, pattern: &Regex) -> Option<String> {
    pattern
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Labeled multi-line strategy: find the line whose prefix matches `label`,
/// take the text after its first colon as the first fragment, then consume
/// subsequent lines verbatim until a blank line, a separator line (only
/// dashes/spaces), or a line ending in a colon (the next label). Fragments
/// are concatenated with no inserted whitespace.
fn labeled_block(text: &str, label: &str) -> Option<String> {
    let label_lower = label.to_lowercase();
    let lines: Vec<&str> = text.lines().collect();
    let start = lines
        .iter()
        .position(|line| line.trim_start().to_lowercase().starts_with(&label_lower))?;

    let mut fragments: Vec<&str> = Vec::new();
    if let Some((_, rest)) = lines[start].split_once(':') {
        fragments.push(rest);
    }

    for line in &lines[start + 1..] {
        let trimmed = line.trim();
        if trimmed.is_empty() || is_separator(trimmed) || trimmed.ends_with(':') {
            break;
        }
        fragments.push(line);
    }

    let joined = fragments.concat();
    let joined = joined.trim();
    (!joined.is_empty()).then(|| joined.to_string())
}

fn is_separator(line: &str) -> bool {
    !line.is_empty() && line.chars().all(|c| c == '-' || c == ' ')
}

fn infer_currency(text: &str) -> Option<String> {
    let upper = text.to_uppercase();
    CURRENCY_SYMBOLS
        .iter()
        .find(|(symbol, _)| upper.contains(symbol))
        .map(|(_, code)| code.to_string())
}

/// Each line-item match is one ordered record; zero matches is a valid
/// empty table. Rows whose numerics fail to parse are dropped.
fn extract_line_items(text: &str) -> Vec<LineItem> {
    LINE_ITEM
        .captures_iter(text)
        .filter_map(|caps| {
            Some(LineItem {
                code: caps[1].to_string(),
                description: caps[2].trim().to_string(),
                quantity: parse_decimal(&caps[3])?,
                unit_price: parse_decimal(&caps[4])?,
                tax_rate: parse_decimal(&caps[5])?,
                subtotal: parse_decimal(&caps[6])?,
                tax_amount: parse_decimal(&caps[7])?,
                total: parse_decimal(&caps[8])?,
            })
        })
        .collect()
}

fn parse_decimal(raw: &str) -> Option<Decimal> {
    Decimal::from_str(&raw.replace(',', "")).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SAMPLE: &str = "\
TAX INVOICE

INVOICE NO: INV-2024-001
INVOICE DATE: 2024-01-15
DUE DATE: 2024-02-14
P.O. Number: PO-7781

Vendor: Savanna Traders Ltd
Vendor PIN: P051234567X
Vendor Address: Plot 12, Mombasa Road
Industrial Area
Nairobi

Buyer: Acme Supplies Ltd
Buyer PIN: A009876543Z
Buyer Address: 4th Floor, Westlands Square
Nairobi

ITM001 Office Chair 2 5,000.00 16% 10,000.00 1,600.00 11,600.00
ITM002 Desk Lamp 5 1,200.00 16% 6,000.00 960.00 6,960.00

SUBTOTAL: 16,000.00
TAXABLE AMOUNT: 16,000.00
VAT AMOUNT: 2,560.00
TOTAL KSH 18,560.00

Payment Terms: Net 30
Payment Instructions: Bank transfer to account 0110022
MPESA Paybill 400200
----------
Remarks: Goods remain vendor property until paid
";

    #[test]
    fn parses_single_pattern_fields() {
        let fields = FieldParser::new().parse(SAMPLE);

        assert_eq!(fields.invoice_number.as_deref(), Some("INV-2024-001"));
        assert_eq!(fields.invoice_date.as_deref(), Some("2024-01-15"));
        assert_eq!(fields.due_date.as_deref(), Some("2024-02-14"));
        assert_eq!(fields.vendor_name.as_deref(), Some("Savanna Traders Ltd"));
        assert_eq!(fields.vendor_pin.as_deref(), Some("P051234567X"));
        assert_eq!(fields.buyer_name.as_deref(), Some("Acme Supplies Ltd"));
        assert_eq!(fields.buyer_pin.as_deref(), Some("A009876543Z"));
        assert_eq!(fields.subtotal.as_deref(), Some("16,000.00"));
        assert_eq!(fields.taxable_amount.as_deref(), Some("16,000.00"));
        assert_eq!(fields.tax_amount.as_deref(), Some("2,560.00"));
        assert_eq!(fields.total_amount.as_deref(), Some("18,560.00"));
        assert_eq!(fields.payment_terms.as_deref(), Some("Net 30"));
        assert_eq!(fields.purchase_order.as_deref(), Some("PO-7781"));
        assert_eq!(fields.currency.as_deref(), Some("KES"));
    }

    #[test]
    fn labeled_blocks_concatenate_until_terminator() {
        let fields = FieldParser::new().parse(SAMPLE);

        // Continuation lines join the first fragment with no inserted
        // whitespace; the next label line ("Buyer: ...") does not bleed in
        // because the block stops at the preceding blank line.
        assert_eq!(
            fields.vendor_address.as_deref(),
            Some("Plot 12, Mombasa RoadIndustrial AreaNairobi")
        );
        assert_eq!(
            fields.buyer_address.as_deref(),
            Some("4th Floor, Westlands SquareNairobi")
        );
        // Separator line of dashes terminates the block.
        assert_eq!(
            fields.payment_instructions.as_deref(),
            Some("Bank transfer to account 0110022MPESA Paybill 400200")
        );
        assert_eq!(
            fields.remarks.as_deref(),
            Some("Goods remain vendor property until paid")
        );
    }

    #[test]
    fn block_stops_at_next_label_colon() {
        let text = "Delivery Address: Warehouse 9\nEnterprise Road\nContact Person:\nJane";
        let fields = FieldParser::new().parse(text);
        assert_eq!(
            fields.delivery_address.as_deref(),
            Some("Warehouse 9Enterprise Road")
        );
    }

    #[test]
    fn missing_labels_yield_none() {
        let fields = FieldParser::new().parse("nothing of interest here");
        assert_eq!(fields.invoice_number, None);
        assert_eq!(fields.vendor_address, None);
        assert_eq!(fields.currency, None);
        assert!(fields.line_items.is_empty());
    }

    #[test]
    fn empty_text_parses_to_all_sentinels() {
        let fields = FieldParser::new().parse("");
        for (key, value) in fields.entries() {
            assert!(value.is_none(), "expected {key} to be unmatched");
        }
    }

    #[test]
    fn line_items_parse_in_order() {
        let fields = FieldParser::new().parse(SAMPLE);
        assert_eq!(fields.line_items.len(), 2);

        let first = &fields.line_items[0];
        assert_eq!(first.code, "ITM001");
        assert_eq!(first.description, "Office Chair");
        assert_eq!(first.quantity, Decimal::from(2));
        assert_eq!(first.unit_price, Decimal::new(500000, 2));
        assert_eq!(first.tax_rate, Decimal::from(16));
        assert_eq!(first.total, Decimal::new(1160000, 2));

        assert_eq!(fields.line_items[1].code, "ITM002");
    }

    #[test]
    fn parsing_is_idempotent() {
        let parser = FieldParser::new();
        assert_eq!(parser.parse(SAMPLE), parser.parse(SAMPLE));
    }

    #[test]
    fn currency_from_dollar_symbol() {
        let fields = FieldParser::new().parse("TOTAL $ 99.00");
        assert_eq!(fields.currency.as_deref(), Some("USD"));
    }
}
