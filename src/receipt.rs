//! Printable receipt for a single transaction, with a WhatsApp share link.

use reqwest::Url;
use serde::Serialize;
use serde_json::Value;

use crate::{
    tenant::ClientConfig,
    utils::{display_value, format_money},
};

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ReceiptView {
    pub receipt_no: String,
    pub date: String,
    pub kind: String,
    pub category: String,
    pub donor: String,
    pub payment_method: String,
    pub description: String,
    pub amount: String,
    pub whatsapp_url: String,
}

/// A field that the backend sends either flattened (`donor_name`) or as a
/// nested object (`donor.name`).
fn name_of(record: &Value, object: &str, flat: &str) -> String {
    record
        .get(object)
        .and_then(|o| o.get("name"))
        .or_else(|| record.get(flat))
        .map(display_value)
        .unwrap_or_default()
}

fn text_of(record: &Value, key: &str) -> String {
    record.get(key).map(display_value).unwrap_or_default()
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

impl ReceiptView {
    pub fn new(record: &Value, client: &ClientConfig) -> ReceiptView {
        let receipt_no = match text_of(record, "receipt_no") {
            no if no.is_empty() => text_of(record, "id"),
            no => no,
        };
        let amount = format_money(record.get("amount").unwrap_or(&Value::Null), &client.currency);

        let mut view = ReceiptView {
            receipt_no,
            date: text_of(record, "date"),
            kind: capitalize(&text_of(record, "type")),
            category: name_of(record, "category", "category_name"),
            donor: name_of(record, "donor", "donor_name"),
            payment_method: capitalize(&text_of(record, "payment_method")),
            description: text_of(record, "description"),
            amount,
            whatsapp_url: String::new(),
        };
        view.whatsapp_url = whatsapp_url(&view.share_text(client));
        view
    }

    /// Plain text summary sent through WhatsApp. Empty lines are left out.
    pub fn share_text(&self, client: &ClientConfig) -> String {
        let lines = [
            client.name.clone(),
            format!("Receipt #{}", self.receipt_no),
            labelled("Date", &self.date),
            labelled(
                if self.kind.is_empty() { "Category" } else { self.kind.as_str() },
                &self.category,
            ),
            labelled("Amount", &self.amount),
            labelled("Received from", &self.donor),
            self.description.clone(),
            client.receipt_footer.clone(),
        ];
        lines
            .into_iter()
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn labelled(label: &str, value: &str) -> String {
    if value.is_empty() {
        String::new()
    } else {
        format!("{}: {}", label, value)
    }
}

pub fn whatsapp_url(text: &str) -> String {
    match Url::parse_with_params("https://wa.me/", &[("text", text)]) {
        // form encoding writes spaces as '+', real pluses are already %2B
        Ok(url) => url.as_str().replace('+', "%20"),
        Err(e) => {
            log::error!("Failed to build share link: {}", e);
            "https://wa.me/".to_string()
        }
    }
}
