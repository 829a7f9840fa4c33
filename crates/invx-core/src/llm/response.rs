//! Wire shape of the model's JSON answer.
//!
//! Every field is optional and loosely typed. Numbers are kept as their
//! literal token text (never `f64`) so locale conversion sees exactly what
//! the model wrote.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Top-level JSON object returned by the model.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WireInvoice {
    #[serde(deserialize_with = "lenient_string")]
    pub invoice_number: String,
    #[serde(deserialize_with = "lenient_string")]
    pub series: String,
    #[serde(deserialize_with = "lenient_string")]
    pub date: String,
    #[serde(rename = "type", deserialize_with = "lenient_string")]
    pub invoice_type: String,
    #[serde(deserialize_with = "lenient_party")]
    pub seller: WireParty,
    #[serde(deserialize_with = "lenient_party")]
    pub buyer: WireParty,
    #[serde(deserialize_with = "lenient_items")]
    pub items: Vec<WireLineItem>,
    #[serde(deserialize_with = "number_token")]
    pub subtotal: String,
    #[serde(deserialize_with = "number_token")]
    pub total_discount: String,
    #[serde(deserialize_with = "number_token")]
    pub total_vat: String,
    #[serde(deserialize_with = "number_token")]
    pub total_amount: String,
    #[serde(deserialize_with = "lenient_string")]
    pub currency: String,
    #[serde(deserialize_with = "lenient_string")]
    pub payment_method: String,
    #[serde(deserialize_with = "lenient_string")]
    pub notes: String,

    // Receipt fields
    #[serde(deserialize_with = "lenient_string")]
    pub document_type: String,
    #[serde(deserialize_with = "lenient_string")]
    pub receipt_number: String,
    #[serde(deserialize_with = "lenient_string")]
    pub cashier: String,
    #[serde(deserialize_with = "lenient_string")]
    pub terminal_id: String,
    #[serde(deserialize_with = "lenient_string")]
    pub time: String,
    #[serde(deserialize_with = "number_token")]
    pub amount_tendered: String,
    #[serde(deserialize_with = "number_token")]
    pub change: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WireParty {
    #[serde(deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(deserialize_with = "lenient_string")]
    pub tax_id: String,
    #[serde(deserialize_with = "lenient_string")]
    pub address: String,
    #[serde(deserialize_with = "lenient_string")]
    pub phone: String,
    #[serde(deserialize_with = "lenient_string")]
    pub email: String,
    #[serde(deserialize_with = "lenient_string")]
    pub bank_account: String,
    #[serde(deserialize_with = "lenient_string")]
    pub bank_name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WireLineItem {
    #[serde(deserialize_with = "number_token")]
    pub number: String,
    #[serde(deserialize_with = "lenient_string")]
    pub code: String,
    #[serde(deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(deserialize_with = "lenient_string")]
    pub description: String,
    #[serde(deserialize_with = "lenient_string")]
    pub unit: String,
    #[serde(deserialize_with = "number_token")]
    pub quantity: String,
    #[serde(deserialize_with = "number_token")]
    pub unit_price: String,
    #[serde(deserialize_with = "number_token")]
    pub discount_percent: String,
    #[serde(deserialize_with = "number_token")]
    pub discount_amount: String,
    #[serde(deserialize_with = "number_token")]
    pub amount: String,
    #[serde(deserialize_with = "number_token")]
    pub vat_rate: String,
    #[serde(deserialize_with = "number_token")]
    pub vat_amount: String,
    #[serde(deserialize_with = "number_token")]
    pub total: String,
}

/// A number as its literal token, a string as-is, anything else as "".
fn number_token<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::String(s)) => s,
        _ => String::new(),
    })
}

/// A string as-is, a number or bool as its text, anything else as "".
fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => s,
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    })
}

/// An object as a party, a bare string as the party name, anything else as empty.
fn lenient_party<'de, D>(deserializer: D) -> Result<WireParty, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        Some(value @ Value::Object(_)) => {
            serde_json::from_value(value).map_err(<D::Error as serde::de::Error>::custom)
        }
        Some(Value::String(name)) => Ok(WireParty {
            name,
            ..WireParty::default()
        }),
        _ => Ok(WireParty::default()),
    }
}

/// An array of item objects; `null` or a missing list is empty.
fn lenient_items<'de, D>(deserializer: D) -> Result<Vec<WireLineItem>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<WireLineItem>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Isolate the JSON object inside a model answer.
///
/// Markdown code fences are stripped, then the text from the first `{` to the
/// last `}` is taken. When there is no such span the stripped text is
/// returned unchanged and decoding reports the problem.
pub fn extract_json(raw: &str) -> &str {
    let stripped = raw
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();

    match (stripped.find('{'), stripped.rfind('}')) {
        (Some(start), Some(end)) if start < end => &stripped[start..=end],
        _ => stripped,
    }
}

/// Decode a raw model answer into the wire shape.
pub fn decode(raw: &str) -> Result<WireInvoice, serde_json::Error> {
    let json = extract_json(raw);
    let value: Value = serde_json::from_str(json)?;
    if !value.is_object() {
        return Err(serde::de::Error::custom("expected a JSON object"));
    }
    serde_json::from_value(value)
}
