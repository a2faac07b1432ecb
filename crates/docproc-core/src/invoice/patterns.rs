//! Regex patterns for invoice field extraction.
//!
//! Tuned to the single tax-invoice layout the pipeline targets; labels and
//! number formats follow that layout, not invoices in general.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Identifiers
    pub static ref INVOICE_NUMBER: Regex = Regex::new(
        r"(?i)invoice\s*(?:number|num|no|#)\.?\s*:?\s*([A-Za-z0-9][A-Za-z0-9/-]*)"
    ).unwrap();

    pub static ref PURCHASE_ORDER: Regex = Regex::new(
        r"(?i)\b(?:purchase\s+order|p\.?o\.?)\s*(?:number|no|#)?\.?[\s:]*([A-Za-z0-9][A-Za-z0-9/-]*)"
    ).unwrap();

    // Dates (value taken verbatim to the end of the line)
    pub static ref INVOICE_DATE: Regex = Regex::new(
        r"(?i)invoice\s+date[\s:]*(.+?)(?:\n|$)"
    ).unwrap();

    pub static ref DUE_DATE: Regex = Regex::new(
        r"(?i)(?:due\s+date|payment\s+due)[\s:]*(.+?)(?:\n|$)"
    ).unwrap();

    // Parties
    pub static ref VENDOR_NAME: Regex = Regex::new(
        r"(?im)^\s*(?:vendor|seller|supplier)(?:\s+name)?\s*:\s*(.+?)\s*$"
    ).unwrap();

    pub static ref BUYER_NAME: Regex = Regex::new(
        r"(?im)^\s*(?:buyer|customer|bill\s+to)(?:\s+name)?\s*:\s*(.+?)\s*$"
    ).unwrap();

    pub static ref VENDOR_PIN: Regex = Regex::new(
        r"(?i)(?:vendor|seller|supplier)\s+pin\s*:?\s*([A-Za-z0-9]{6,})"
    ).unwrap();

    pub static ref BUYER_PIN: Regex = Regex::new(
        r"(?i)(?:buyer|customer)\s+pin\s*:?\s*([A-Za-z0-9]{6,})"
    ).unwrap();

    // Totals block (anchored per line; label then first number on the line)
    pub static ref SUBTOTAL: Regex = Regex::new(
        r"(?im)^\s*sub\s*-?\s*total\b[^0-9\n]*([0-9][0-9,]*(?:\.[0-9]{1,2})?)"
    ).unwrap();

    pub static ref TAXABLE_AMOUNT: Regex = Regex::new(
        r"(?im)^\s*taxable(?:\s+amount)?\b[^0-9\n]*([0-9][0-9,]*(?:\.[0-9]{1,2})?)"
    ).unwrap();

    pub static ref TAX_AMOUNT: Regex = Regex::new(
        r"(?im)^\s*(?:vat|tax)(?:\s+amount)?\b[^0-9\n]*([0-9][0-9,]*(?:\.[0-9]{1,2})?)"
    ).unwrap();

    pub static ref TOTAL_AMOUNT: Regex = Regex::new(
        r"(?im)^\s*(?:grand\s+)?total(?:\s+amount)?\b[^0-9\n]*([0-9][0-9,]*(?:\.[0-9]{1,2})?)"
    ).unwrap();

    // Terms
    pub static ref PAYMENT_TERMS: Regex = Regex::new(
        r"(?i)payment\s+terms[\s:]*(.+?)(?:\n|$)"
    ).unwrap();

    // Line-item rows: code, description, quantity, unit price, tax rate %,
    // subtotal, tax amount, total.
    pub static ref LINE_ITEM: Regex = Regex::new(
        r"(?m)^\s*([A-Z0-9][A-Z0-9-]{2,})\s+(.+?)\s+(\d+(?:\.\d+)?)\s+([\d,]+(?:\.\d{1,2})?)\s+(\d+(?:\.\d+)?)\s*%\s+([\d,]+(?:\.\d{1,2})?)\s+([\d,]+(?:\.\d{1,2})?)\s+([\d,]+(?:\.\d{1,2})?)\s*$"
    ).unwrap();
}
