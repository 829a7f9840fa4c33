//! Canonical invoice/receipt data model for Vietnamese e-invoices.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Default currency for Vietnamese documents.
pub const DEFAULT_CURRENCY: &str = "VND";

/// A complete invoice or receipt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    /// Identifier assigned by the producing collaborator (empty when unknown).
    #[serde(default)]
    pub id: String,

    /// Invoice header information.
    pub header: InvoiceHeader,

    /// Seller information.
    pub seller: Party,

    /// Buyer information.
    pub buyer: Party,

    /// Line items, in document order.
    #[serde(default)]
    pub items: Vec<LineItem>,

    /// Monetary totals.
    pub summary: InvoiceSummary,

    /// Invoice or receipt.
    #[serde(default)]
    pub document_type: DocumentType,

    /// Receipt-only fields.
    #[serde(default, skip_serializing_if = "ReceiptDetails::is_empty")]
    pub receipt: ReceiptDetails,

    /// Digital signature block, carried as-is.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<Signature>,

    /// Path of the file this invoice was read from.
    #[serde(default)]
    pub source_file: String,

    /// Original input bytes, kept for audit.
    #[serde(skip)]
    pub raw_source: Vec<u8>,
}

/// Invoice header with basic information.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceHeader {
    /// Invoice (or receipt) number.
    pub number: String,

    /// Invoice series (ký hiệu).
    #[serde(default)]
    pub series: String,

    /// Issue date; `None` when the source date could not be read.
    #[serde(default)]
    pub date: Option<NaiveDate>,

    /// Type of invoice.
    #[serde(default)]
    pub invoice_type: InvoiceType,

    /// E-invoice provider that issued the document.
    #[serde(default)]
    pub provider: Provider,

    /// Currency code.
    #[serde(default = "default_currency")]
    pub currency: String,

    /// Exchange rate to VND for foreign-currency invoices.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exchange_rate: Option<Decimal>,

    /// Free-form remarks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remarks: Option<String>,

    /// Payment terms.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_terms: Option<String>,
}

fn default_currency() -> String {
    DEFAULT_CURRENCY.to_string()
}

impl Default for InvoiceHeader {
    fn default() -> Self {
        Self {
            number: String::new(),
            series: String::new(),
            date: None,
            invoice_type: InvoiceType::Normal,
            provider: Provider::Unknown,
            currency: default_currency(),
            exchange_rate: None,
            remarks: None,
            payment_terms: None,
        }
    }
}

/// Type of invoice document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvoiceType {
    /// Original invoice.
    #[default]
    Normal,
    /// Replaces a previously issued invoice (hóa đơn thay thế).
    Replacement,
    /// Adjusts a previously issued invoice (hóa đơn điều chỉnh).
    Adjustment,
}

impl InvoiceType {
    /// Parse a loosely-typed type string; anything unrecognised is `Normal`.
    pub fn parse_lenient(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "replacement" => InvoiceType::Replacement,
            "adjustment" => InvoiceType::Adjustment,
            _ => InvoiceType::Normal,
        }
    }
}

/// Invoice versus retail receipt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    /// Formal tax invoice.
    #[default]
    Invoice,
    /// Retail POS receipt.
    Receipt,
}

impl DocumentType {
    /// Parse a loosely-typed document type; anything but "receipt" is an invoice.
    pub fn parse_lenient(s: &str) -> Self {
        if s.trim().eq_ignore_ascii_case("receipt") {
            DocumentType::Receipt
        } else {
            DocumentType::Invoice
        }
    }
}

/// E-invoice provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Provider {
    /// General Department of Taxation portal.
    Tct,
    Vnpt,
    Misa,
    Viettel,
    Fpt,
    #[default]
    Unknown,
}

/// A party (seller or buyer) on the invoice.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Party {
    /// Full legal name.
    #[serde(default)]
    pub name: String,

    /// Tax identification number (mã số thuế).
    #[serde(default)]
    pub tax_id: String,

    /// Full address.
    #[serde(default)]
    pub address: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bank_account: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bank_name: Option<String>,
}

impl Party {
    /// Check if the party carries any data.
    pub fn is_empty(&self) -> bool {
        self.name.is_empty()
            && self.tax_id.is_empty()
            && self.address.is_empty()
            && self.phone.is_none()
            && self.email.is_none()
            && self.bank_account.is_none()
            && self.bank_name.is_none()
    }
}

/// A single line item on the invoice.
///
/// `amount`, `discount_amount`, `vat_amount` and `total` are derived; only
/// [`LineItem::calculate`] writes them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    /// Sequential number on the invoice.
    #[serde(default)]
    pub number: u32,

    /// Product code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,

    /// Product/service name.
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Unit of measure.
    #[serde(default)]
    pub unit: String,

    pub quantity: Decimal,

    pub unit_price: Decimal,

    /// Discount percentage (0 - 100).
    #[serde(default)]
    pub discount_percent: Decimal,

    #[serde(default)]
    pub vat_rate: VatRate,

    /// quantity × unit price.
    #[serde(default)]
    pub amount: Decimal,

    #[serde(default)]
    pub discount_amount: Decimal,

    #[serde(default)]
    pub vat_amount: Decimal,

    /// Taxable amount plus VAT.
    #[serde(default)]
    pub total: Decimal,
}

impl LineItem {
    /// Create a line item from its authoritative inputs.
    ///
    /// Derived fields stay zero until [`LineItem::calculate`] runs.
    pub fn new(number: u32, name: impl Into<String>, quantity: Decimal, unit_price: Decimal) -> Self {
        Self {
            number,
            name: name.into(),
            quantity,
            unit_price,
            ..Self::default()
        }
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = unit.into();
        self
    }

    pub fn with_discount(mut self, percent: Decimal) -> Self {
        self.discount_percent = percent;
        self
    }

    pub fn with_vat_rate(mut self, rate: VatRate) -> Self {
        self.vat_rate = rate;
        self
    }
}

/// Vietnamese VAT rates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub enum VatRate {
    /// 0% (exports, exempt goods).
    #[default]
    Zero,
    /// Reduced rate: 5%.
    Reduced5,
    /// Standard rate: 10%.
    Standard10,
    /// Any other rate reported by a source document (e.g. temporary 8%).
    Other(u8),
}

impl VatRate {
    /// Rate in percent.
    pub fn percent(&self) -> u8 {
        match self {
            VatRate::Zero => 0,
            VatRate::Reduced5 => 5,
            VatRate::Standard10 => 10,
            VatRate::Other(rate) => *rate,
        }
    }

    /// Rate in percent as a decimal.
    pub fn as_decimal(&self) -> Decimal {
        Decimal::from(self.percent())
    }

    /// Format for display.
    pub fn display(&self) -> String {
        format!("{}%", self.percent())
    }
}

impl From<u8> for VatRate {
    fn from(rate: u8) -> Self {
        match rate {
            0 => VatRate::Zero,
            5 => VatRate::Reduced5,
            10 => VatRate::Standard10,
            other => VatRate::Other(other),
        }
    }
}

impl From<VatRate> for u8 {
    fn from(rate: VatRate) -> Self {
        rate.percent()
    }
}

/// Invoice totals. VND has no minor unit, so computed totals carry no fraction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InvoiceSummary {
    /// Sum of taxable amounts (after discount, before VAT).
    pub subtotal: Decimal,

    /// Total VAT.
    pub tax: Decimal,

    /// Subtotal plus VAT.
    pub total: Decimal,

    /// Payment method as printed on the document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<String>,
}

/// Fields that only appear on retail receipts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReceiptDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cashier: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terminal_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receipt_number: Option<String>,

    /// Time printed on the receipt (HH:MM).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receipt_time: Option<String>,

    /// Cash handed over by the customer.
    #[serde(default, skip_serializing_if = "Decimal::is_zero")]
    pub amount_tendered: Decimal,

    /// Change returned.
    #[serde(default, skip_serializing_if = "Decimal::is_zero")]
    pub change: Decimal,
}

impl ReceiptDetails {
    pub fn is_empty(&self) -> bool {
        self.cashier.is_none()
            && self.terminal_id.is_none()
            && self.receipt_number.is_none()
            && self.receipt_time.is_none()
            && self.amount_tendered.is_zero()
            && self.change.is_zero()
    }
}

/// Digital signature data. Carried opaquely; never verified here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signature {
    /// Base64-encoded signature value.
    pub value: String,
    pub date: DateTime<Utc>,
    pub signer_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signer_position: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cert_serial: Option<String>,
}

impl Invoice {
    /// Create a new empty invoice with default values.
    pub fn new() -> Self {
        Self {
            id: String::new(),
            header: InvoiceHeader::default(),
            seller: Party::default(),
            buyer: Party::default(),
            items: Vec::new(),
            summary: InvoiceSummary::default(),
            document_type: DocumentType::Invoice,
            receipt: ReceiptDetails::default(),
            signature: None,
            source_file: String::new(),
            raw_source: Vec::new(),
        }
    }

    /// Report fields a reviewer would expect but that are missing.
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        if self.header.number.is_empty() {
            issues.push("Missing invoice number".to_string());
        }

        if self.header.date.is_none() {
            issues.push("Missing or unreadable date".to_string());
        }

        if self.seller.name.is_empty() {
            issues.push("Missing seller name".to_string());
        }

        if self.document_type == DocumentType::Invoice {
            if self.seller.tax_id.is_empty() {
                issues.push("Missing seller tax ID".to_string());
            }
            if self.buyer.is_empty() {
                issues.push("Missing buyer information".to_string());
            }
        }

        if self.items.is_empty() {
            issues.push("No line items".to_string());
        }

        if self.summary.total.is_zero() {
            issues.push("Total is zero".to_string());
        }

        issues
    }
}

impl Default for Invoice {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_vat_rate_from_percent() {
        assert_eq!(VatRate::from(0), VatRate::Zero);
        assert_eq!(VatRate::from(5), VatRate::Reduced5);
        assert_eq!(VatRate::from(10), VatRate::Standard10);
        assert_eq!(VatRate::from(8), VatRate::Other(8));
        assert_eq!(VatRate::Standard10.as_decimal(), Decimal::from(10));
        assert_eq!(VatRate::Other(8).display(), "8%");
    }

    #[test]
    fn test_vat_rate_serializes_as_number() {
        let json = serde_json::to_string(&VatRate::Standard10).unwrap();
        assert_eq!(json, "10");
        let rate: VatRate = serde_json::from_str("5").unwrap();
        assert_eq!(rate, VatRate::Reduced5);
    }

    #[test]
    fn test_lenient_enum_parsing() {
        assert_eq!(InvoiceType::parse_lenient("REPLACEMENT"), InvoiceType::Replacement);
        assert_eq!(InvoiceType::parse_lenient("adjustment"), InvoiceType::Adjustment);
        assert_eq!(InvoiceType::parse_lenient(""), InvoiceType::Normal);
        assert_eq!(InvoiceType::parse_lenient("credit note"), InvoiceType::Normal);
        assert_eq!(DocumentType::parse_lenient("Receipt"), DocumentType::Receipt);
        assert_eq!(DocumentType::parse_lenient("invoice"), DocumentType::Invoice);
        assert_eq!(DocumentType::parse_lenient(""), DocumentType::Invoice);
    }

    #[test]
    fn test_new_invoice_defaults() {
        let invoice = Invoice::new();
        assert_eq!(invoice.header.currency, "VND");
        assert_eq!(invoice.header.provider, Provider::Unknown);
        assert_eq!(invoice.document_type, DocumentType::Invoice);
        assert!(invoice.receipt.is_empty());
    }

    #[test]
    fn test_validate_reports_missing_fields() {
        let issues = Invoice::new().validate();
        assert!(issues.contains(&"Missing invoice number".to_string()));
        assert!(issues.contains(&"No line items".to_string()));
        assert!(issues.contains(&"Missing seller tax ID".to_string()));
    }

    #[test]
    fn test_receipt_skips_buyer_checks() {
        let mut invoice = Invoice::new();
        invoice.document_type = DocumentType::Receipt;
        let issues = invoice.validate();
        assert!(!issues.contains(&"Missing buyer information".to_string()));
    }

    #[test]
    fn test_invoice_json_field_names() {
        let mut invoice = Invoice::new();
        invoice.header.number = "0000123".to_string();
        let value = serde_json::to_value(&invoice).unwrap();
        assert_eq!(value["header"]["number"], "0000123");
        assert_eq!(value["header"]["provider"], "UNKNOWN");
        assert_eq!(value["document_type"], "invoice");
        assert!(value.get("raw_source").is_none());
        assert!(value.get("receipt").is_none());
    }
}
