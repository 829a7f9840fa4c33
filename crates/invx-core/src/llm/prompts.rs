//! Prompts sent to the model.

/// System prompt for formal Vietnamese tax invoices.
pub const INVOICE_SYSTEM_PROMPT: &str = r#"You extract structured data from Vietnamese e-invoices (hóa đơn điện tử), given as text or as an image. Documents may be in Vietnamese or English.

Vocabulary:
- Hóa đơn: invoice
- Số hóa đơn: invoice number
- Ký hiệu: series
- Ngày: date
- Mã số thuế (MST): tax ID
- Người bán / Bên bán: seller
- Người mua / Bên mua: buyer
- Địa chỉ: address
- Tên hàng hóa, dịch vụ: item name
- Đơn vị tính: unit
- Số lượng: quantity
- Đơn giá: unit price
- Thành tiền: amount
- Thuế suất: VAT rate
- Tiền thuế: VAT amount
- Cộng tiền hàng: subtotal
- Tổng cộng: total
- Thuế GTGT: VAT

Report every field you can find and leave out fields that are not on the document.
Answer with a single JSON object following the requested structure.
Write VND amounts as integers and other amounts as decimals.
Write dates as YYYY-MM-DD."#;

/// System prompt for retail POS receipts.
pub const RECEIPT_SYSTEM_PROMPT: &str = r#"You extract structured data from retail receipts printed by point-of-sale terminals in shops, supermarkets, restaurants and cafés.

Vocabulary (Vietnamese / English):
- Hóa đơn bán hàng, Phiếu thanh toán: receipt
- Số HD / Receipt No: receipt number
- Ngày / Date: date
- Giờ / Time: time
- Nhân viên / Cashier: cashier
- Máy / Terminal: terminal ID
- Tên hàng: item name
- SL / Qty: quantity
- Đơn giá: unit price
- Thành tiền: amount
- Tổng cộng / Total: total
- Tiền mặt / Cash: cash
- Thẻ / Card: card
- Chuyển khoản: bank transfer
- Ví điện tử: e-wallet (MoMo, ZaloPay, VNPay)
- Tiền khách đưa: amount tendered
- Tiền thừa / Change: change

Receipts usually have no buyer tax ID, no signature and often no separate VAT line.

Report every field you can find and leave out fields that are not on the receipt.
Always set document_type to "receipt".
Answer with a single JSON object following the requested structure."#;

const INVOICE_SCHEMA: &str = r#"{
  "invoice_number": "string",
  "series": "string",
  "date": "YYYY-MM-DD",
  "type": "normal|replacement|adjustment",
  "seller": {
    "name": "string",
    "tax_id": "string",
    "address": "string",
    "phone": "string",
    "email": "string",
    "bank_account": "string",
    "bank_name": "string"
  },
  "buyer": {
    "name": "string",
    "tax_id": "string",
    "address": "string",
    "phone": "string",
    "email": "string"
  },
  "items": [
    {
      "number": 1,
      "code": "string",
      "name": "string",
      "unit": "string",
      "quantity": 1,
      "unit_price": 100000,
      "discount_percent": 0,
      "discount_amount": 0,
      "amount": 100000,
      "vat_rate": 10,
      "vat_amount": 10000,
      "total": 110000
    }
  ],
  "subtotal": 100000,
  "total_discount": 0,
  "total_vat": 10000,
  "total_amount": 110000,
  "currency": "VND",
  "payment_method": "string",
  "notes": "string"
}"#;

const RECEIPT_SCHEMA: &str = r#"{
  "document_type": "receipt",
  "receipt_number": "string",
  "date": "YYYY-MM-DD",
  "time": "HH:MM",
  "seller": {
    "name": "string",
    "address": "string",
    "phone": "string"
  },
  "cashier": "string",
  "terminal_id": "string",
  "items": [
    {
      "number": 1,
      "name": "string",
      "unit": "string",
      "quantity": 1,
      "unit_price": 50000,
      "amount": 50000
    }
  ],
  "subtotal": 100000,
  "total_vat": 0,
  "total_amount": 100000,
  "payment_method": "cash|card|e-wallet|transfer",
  "amount_tendered": 200000,
  "change": 100000,
  "currency": "VND"
}"#;

/// User prompt for clean text pulled from a PDF.
pub fn text_extraction(text: &str) -> String {
    format!(
        "Extract the invoice data from this text:\n\n---\n{}\n---\n\nAnswer with JSON shaped like this:\n{}",
        text, INVOICE_SCHEMA
    )
}

/// User prompt for noisy text that may need OCR-style correction first.
pub fn ocr_correction(text: &str) -> String {
    format!(
        "The text below was recovered from a Vietnamese invoice and may contain recognition errors.\n\n\
         Text:\n---\n{}\n---\n\n\
         1. Fix obvious recognition errors, in particular broken Vietnamese diacritics.\n\
         2. Extract the invoice data.\n\n\
         Answer with JSON shaped like this:\n{}",
        text, INVOICE_SCHEMA
    )
}

/// User prompt sent with an invoice image.
pub fn invoice_image() -> String {
    format!(
        "Extract the invoice data from this invoice image.\n\nAnswer with JSON shaped like this:\n{}\n\n\
         Read everything visible on the page. Where text is blurry, give your best reading.",
        INVOICE_SCHEMA
    )
}

/// User prompt sent with a receipt image.
pub fn receipt_image() -> String {
    format!(
        "Extract the receipt data from this receipt image.\n\nAnswer with JSON shaped like this:\n{}\n\n\
         - Leave out the buyer; receipts rarely name one.\n\
         - Set total_vat to 0 when VAT is not printed separately.\n\
         - payment_method is one of cash, card, e-wallet, transfer.\n\
         - amount_tendered and change only apply to cash payments.\n\
         - Include time only if it is printed.\n\
         - The store name is usually in the header or logo.",
        RECEIPT_SCHEMA
    )
}

/// User prompt that lets the model decide between invoice and receipt.
pub fn auto_detect_image() -> String {
    r#"Look at this document image and decide what it is:
- "invoice": a formal tax invoice with seller and buyer tax IDs, a VAT breakdown and an invoice series and number
- "receipt": a retail POS receipt, usually thermal paper, without a buyer tax ID

Then extract its data as JSON shaped like this, including only fields present on the document:
{
  "document_type": "invoice|receipt",
  "invoice_number": "string (invoices)",
  "receipt_number": "string (receipts)",
  "series": "string (invoices)",
  "date": "YYYY-MM-DD",
  "seller": {
    "name": "string",
    "tax_id": "string (invoices)",
    "address": "string",
    "phone": "string"
  },
  "buyer": {
    "name": "string (invoices)",
    "tax_id": "string (invoices)"
  },
  "cashier": "string (receipts)",
  "terminal_id": "string (receipts)",
  "items": [
    {
      "number": 1,
      "name": "string",
      "unit": "string",
      "quantity": 1,
      "unit_price": 100000,
      "discount_percent": 0,
      "vat_rate": 10
    }
  ],
  "subtotal": 0,
  "total_vat": 0,
  "total_amount": 0,
  "payment_method": "string",
  "currency": "VND"
}"#
    .to_string()
}
