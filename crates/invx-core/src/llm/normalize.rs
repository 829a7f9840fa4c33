//! Turn the model's loosely-typed answer into a canonical [`Invoice`].
//!
//! This is a lexical transform. Nothing here checks that stated totals agree
//! with the line items.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use super::response::{WireInvoice, WireLineItem, WireParty};
use crate::error::CalcError;
use crate::models::config::ExtractionConfig;
use crate::models::invoice::{DocumentType, Invoice, InvoiceType, LineItem, Party, Provider, VatRate};

/// Date layouts tried in order; the first that parses wins.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%-d/%-m/%Y", "%d-%m-%Y"];

/// Parse a number written the Vietnamese way: `.` groups thousands and `,`
/// marks decimals. Exponent forms such as `1e3` are accepted. Anything
/// unparsable, including "", is zero.
pub fn parse_decimal(s: &str) -> Decimal {
    let normalized = s.trim().replace('.', "").replace(',', ".");
    Decimal::from_str(&normalized)
        .or_else(|_| Decimal::from_scientific(&normalized))
        .unwrap_or(Decimal::ZERO)
}

/// Parse a date in any of the accepted layouts, falling back to RFC 3339.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(s, format).ok())
        .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.date_naive()))
}

fn non_empty(s: &str) -> Option<String> {
    let s = s.trim();
    (!s.is_empty()).then(|| s.to_string())
}

fn to_party(wire: &WireParty) -> Party {
    Party {
        name: wire.name.trim().to_string(),
        tax_id: wire.tax_id.trim().to_string(),
        address: wire.address.trim().to_string(),
        phone: non_empty(&wire.phone),
        email: non_empty(&wire.email),
        bank_account: non_empty(&wire.bank_account),
        bank_name: non_empty(&wire.bank_name),
    }
}

fn to_line_item(wire: &WireLineItem, position: usize) -> Result<LineItem, CalcError> {
    // Items without a usable number are numbered by position.
    let number = wire
        .number
        .trim()
        .parse::<u32>()
        .ok()
        .filter(|n| *n > 0)
        .unwrap_or(position as u32 + 1);

    let mut item = LineItem::new(
        number,
        wire.name.trim(),
        parse_decimal(&wire.quantity),
        parse_decimal(&wire.unit_price),
    )
    .with_unit(wire.unit.trim())
    .with_discount(parse_decimal(&wire.discount_percent));
    item.code = non_empty(&wire.code);
    item.description = non_empty(&wire.description);

    // Only a non-zero rate overrides the default, so an explicit 0% and a
    // missing rate look the same.
    let rate = parse_decimal(&wire.vat_rate);
    if !rate.is_zero() {
        if let Some(percent) = rate.trunc().to_u8() {
            item.vat_rate = VatRate::from(percent);
        }
    }

    item.calculate()?;
    Ok(item)
}

/// Build a canonical invoice from a decoded model answer.
///
/// Line-item money fields are recomputed from quantity, unit price, discount
/// and VAT rate. Invoice totals are taken as stated unless
/// `config.recompute_totals` is set.
pub fn to_invoice(wire: &WireInvoice, config: &ExtractionConfig) -> Result<Invoice, CalcError> {
    let mut invoice = Invoice::new();

    invoice.header.number = non_empty(&wire.invoice_number)
        .or_else(|| non_empty(&wire.receipt_number))
        .unwrap_or_default();
    invoice.header.series = wire.series.trim().to_string();
    invoice.header.date = parse_date(&wire.date);
    invoice.header.invoice_type = InvoiceType::parse_lenient(&wire.invoice_type);
    invoice.header.provider = Provider::Unknown;
    invoice.header.currency =
        non_empty(&wire.currency).unwrap_or_else(|| config.default_currency.clone());
    invoice.header.remarks = non_empty(&wire.notes);
    invoice.document_type = DocumentType::parse_lenient(&wire.document_type);

    invoice.seller = to_party(&wire.seller);
    invoice.buyer = to_party(&wire.buyer);

    invoice.items = wire
        .items
        .iter()
        .enumerate()
        .map(|(position, item)| to_line_item(item, position))
        .collect::<Result<_, _>>()?;

    invoice.summary.subtotal = parse_decimal(&wire.subtotal);
    invoice.summary.tax = parse_decimal(&wire.total_vat);
    invoice.summary.total = parse_decimal(&wire.total_amount);
    invoice.summary.payment_method = non_empty(&wire.payment_method);

    invoice.receipt.receipt_number = non_empty(&wire.receipt_number);
    invoice.receipt.cashier = non_empty(&wire.cashier);
    invoice.receipt.terminal_id = non_empty(&wire.terminal_id);
    invoice.receipt.receipt_time = non_empty(&wire.time);
    invoice.receipt.amount_tendered = parse_decimal(&wire.amount_tendered);
    invoice.receipt.change = parse_decimal(&wire.change);

    if config.recompute_totals {
        invoice.calculate_totals()?;
    }

    Ok(invoice)
}
