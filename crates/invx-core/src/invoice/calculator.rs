//! Deterministic VND arithmetic for line items and invoice totals.
//!
//! All intermediate values are exact decimals. Rounding happens only at the
//! points listed below, always to zero fractional digits with midpoints
//! rounded away from zero:
//!
//! ```text
//! amount          = quantity × unit_price
//! discount_amount = round(amount × discount% / 100)     (0 when discount% = 0)
//! taxable         = amount − discount_amount
//! vat_amount      = round(taxable × vat% / 100)
//! total           = round(taxable + vat_amount)
//!
//! subtotal = round(Σ taxable)
//! tax      = round(Σ vat_amount)
//! total    = round(Σ taxable + Σ vat_amount)
//! ```

use rust_decimal::{Decimal, RoundingStrategy};

use crate::error::CalcError;
use crate::models::invoice::{Invoice, LineItem};

/// Round to whole đồng.
pub fn round_vnd(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
}

fn percent_of(value: Decimal, percent: Decimal) -> Option<Decimal> {
    value.checked_mul(percent)?.checked_div(Decimal::ONE_HUNDRED)
}

impl LineItem {
    /// Recompute `amount`, `discount_amount`, `vat_amount` and `total` from
    /// quantity, unit price, discount percent and VAT rate.
    pub fn calculate(&mut self) -> Result<(), CalcError> {
        let line = self.number;
        let overflow = |field| CalcError::Overflow { field, line };

        let amount = self
            .quantity
            .checked_mul(self.unit_price)
            .ok_or_else(|| overflow("amount"))?;

        let discount_amount = if self.discount_percent.is_zero() {
            Decimal::ZERO
        } else {
            round_vnd(percent_of(amount, self.discount_percent).ok_or_else(|| overflow("discount"))?)
        };

        let taxable = amount
            .checked_sub(discount_amount)
            .ok_or_else(|| overflow("taxable amount"))?;

        let vat_amount = round_vnd(
            percent_of(taxable, self.vat_rate.as_decimal()).ok_or_else(|| overflow("VAT"))?,
        );

        let total = round_vnd(taxable.checked_add(vat_amount).ok_or_else(|| overflow("total"))?);

        self.amount = amount;
        self.discount_amount = discount_amount;
        self.vat_amount = vat_amount;
        self.total = total;
        Ok(())
    }

    /// Amount after discount, before VAT.
    pub fn taxable_amount(&self) -> Decimal {
        self.amount - self.discount_amount
    }
}

impl Invoice {
    /// Recompute every line item, then the invoice subtotal, tax and total.
    pub fn calculate_totals(&mut self) -> Result<(), CalcError> {
        let mut subtotal = Decimal::ZERO;
        let mut tax = Decimal::ZERO;

        for item in &mut self.items {
            item.calculate()?;
            subtotal = subtotal
                .checked_add(item.taxable_amount())
                .ok_or(CalcError::TotalOverflow("subtotal"))?;
            tax = tax
                .checked_add(item.vat_amount)
                .ok_or(CalcError::TotalOverflow("tax"))?;
        }

        let total = subtotal
            .checked_add(tax)
            .ok_or(CalcError::TotalOverflow("total"))?;

        self.summary.subtotal = round_vnd(subtotal);
        self.summary.tax = round_vnd(tax);
        self.summary.total = round_vnd(total);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::invoice::VatRate;
    use pretty_assertions::assert_eq;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_simple_line_item() {
        let mut item = LineItem::new(1, "Giấy A4", dec("10"), dec("55000"))
            .with_vat_rate(VatRate::Standard10);
        item.calculate().unwrap();

        assert_eq!(item.amount, dec("550000"));
        assert_eq!(item.discount_amount, Decimal::ZERO);
        assert_eq!(item.vat_amount, dec("55000"));
        assert_eq!(item.total, dec("605000"));
    }

    #[test]
    fn test_midpoint_rounds_away_from_zero() {
        // 25 × 10% = 2.5 must become 3, not the banker's 2.
        let mut item = LineItem::new(1, "Kẹo", dec("1"), dec("25")).with_vat_rate(VatRate::Standard10);
        item.calculate().unwrap();
        assert_eq!(item.vat_amount, dec("3"));
        assert_eq!(item.total, dec("28"));

        let mut credit = LineItem::new(2, "Điều chỉnh", dec("-1"), dec("25"))
            .with_vat_rate(VatRate::Standard10);
        credit.calculate().unwrap();
        assert_eq!(credit.vat_amount, dec("-3"));
        assert_eq!(credit.total, dec("-28"));
    }

    #[test]
    fn test_discount_rounded_before_vat() {
        let mut item = LineItem::new(1, "Máy in", dec("1"), dec("1000005"))
            .with_discount(dec("10"))
            .with_vat_rate(VatRate::Reduced5);
        item.calculate().unwrap();

        // 100000.5 -> 100001
        assert_eq!(item.discount_amount, dec("100001"));
        assert_eq!(item.taxable_amount(), dec("900004"));
        // 45000.2 -> 45000
        assert_eq!(item.vat_amount, dec("45000"));
        assert_eq!(item.total, dec("945004"));
    }

    #[test]
    fn test_fractional_amount_is_not_rounded() {
        let mut item = LineItem::new(1, "Xăng", dec("3"), dec("33333.5"))
            .with_vat_rate(VatRate::Standard10);
        item.calculate().unwrap();

        assert_eq!(item.amount, dec("100000.5"));
        assert_eq!(item.vat_amount, dec("10000"));
        // 100000.5 + 10000 = 110000.5 -> 110001
        assert_eq!(item.total, dec("110001"));
    }

    #[test]
    fn test_zero_discount_clears_stale_value() {
        let mut item = LineItem::new(1, "Bút", dec("2"), dec("5000"));
        item.discount_amount = dec("999");
        item.calculate().unwrap();
        assert_eq!(item.discount_amount, Decimal::ZERO);
        assert_eq!(item.total, dec("10000"));
    }

    #[test]
    fn test_line_total_identity() {
        let items = [
            LineItem::new(1, "a", dec("7"), dec("14285.7")).with_discount(dec("3.5")).with_vat_rate(VatRate::Standard10),
            LineItem::new(2, "b", dec("0.333"), dec("99999")).with_vat_rate(VatRate::Reduced5),
            LineItem::new(3, "c", dec("12"), dec("1250.25")).with_discount(dec("12.5")),
            LineItem::new(4, "d", dec("1"), dec("19999")).with_vat_rate(VatRate::Other(8)),
        ];

        for mut item in items {
            item.calculate().unwrap();
            let discount = if item.discount_percent.is_zero() {
                Decimal::ZERO
            } else {
                round_vnd(item.amount * item.discount_percent / Decimal::ONE_HUNDRED)
            };
            let vat = round_vnd((item.amount - discount) * item.vat_rate.as_decimal() / Decimal::ONE_HUNDRED);
            assert_eq!(item.discount_amount, discount);
            assert_eq!(item.vat_amount, vat);
            assert_eq!(item.total, round_vnd(item.amount - item.discount_amount + item.vat_amount));
        }
    }

    fn golden_invoice() -> Invoice {
        let mut invoice = Invoice::new();
        invoice.items = vec![
            LineItem::new(1, "Dịch vụ tư vấn", dec("1"), dec("15000000")).with_vat_rate(VatRate::Standard10),
            LineItem::new(2, "Sách", dec("3"), dec("120000")).with_vat_rate(VatRate::Zero),
            LineItem::new(3, "Văn phòng phẩm", dec("4"), dec("37500.5"))
                .with_discount(dec("5"))
                .with_vat_rate(VatRate::Standard10),
        ];
        invoice
    }

    #[test]
    fn test_invoice_totals_golden() {
        let mut invoice = golden_invoice();
        invoice.calculate_totals().unwrap();

        // Line 3: amount 150002, discount 7500.1 -> 7500, taxable 142502, VAT 14250.2 -> 14250.
        let line3 = &invoice.items[2];
        assert_eq!(line3.amount, dec("150002"));
        assert_eq!(line3.discount_amount, dec("7500"));
        assert_eq!(line3.vat_amount, dec("14250"));
        assert_eq!(line3.total, dec("156752"));

        assert_eq!(invoice.summary.subtotal, dec("15502502"));
        assert_eq!(invoice.summary.tax, dec("1514250"));
        assert_eq!(invoice.summary.total, dec("17016752"));
    }

    #[test]
    fn test_subtotal_rounds_the_sum_not_each_item() {
        let mut invoice = Invoice::new();
        invoice.items = vec![
            LineItem::new(1, "a", dec("1"), dec("0.3")),
            LineItem::new(2, "b", dec("1"), dec("0.3")),
        ];
        invoice.calculate_totals().unwrap();
        assert_eq!(invoice.summary.subtotal, dec("1"));
        assert_eq!(invoice.summary.tax, Decimal::ZERO);
        assert_eq!(invoice.summary.total, dec("1"));
    }

    #[test]
    fn test_calculate_is_idempotent() {
        let mut once = golden_invoice();
        once.calculate_totals().unwrap();
        let mut twice = once.clone();
        twice.calculate_totals().unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_overflow_is_reported() {
        let mut item = LineItem::new(7, "x", Decimal::MAX, dec("2"));
        let err = item.calculate().unwrap_err();
        assert_eq!(err, CalcError::Overflow { field: "amount", line: 7 });
    }

    #[test]
    fn test_empty_invoice_totals_are_zero() {
        let mut invoice = Invoice::new();
        invoice.calculate_totals().unwrap();
        assert_eq!(invoice.summary.subtotal, Decimal::ZERO);
        assert_eq!(invoice.summary.total, Decimal::ZERO);
    }
}
