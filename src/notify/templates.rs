//! Message templates: order and contact emails (HTML) and the WhatsApp order summary.
//!
//! All customer-supplied text is HTML-escaped before it is placed in an email body.

use crate::{
    core::contact::ContactMessage,
    models::{Customer, Order},
};
use std::fmt::Write;

/// Escapes the five HTML-significant characters.
#[must_use]
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Formats an amount with `.` thousands separators and a `,` decimal part only when needed,
/// e.g. `1234.5` -> `1.234,50`, `1000.0` -> `1.000`.
#[must_use]
pub fn format_amount(amount: f64) -> String {
    let cents = (amount.abs() * 100.0).round();
    let whole = (cents / 100.0).trunc();
    let fraction = cents - whole * 100.0;

    let digits = format!("{whole:.0}");
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(c);
    }

    let sign = if amount < 0.0 && cents > 0.0 { "-" } else { "" };
    if fraction > 0.0 {
        format!("{sign}{grouped},{fraction:02.0}")
    } else {
        format!("{sign}{grouped}")
    }
}

fn address_line(customer: &Customer) -> Option<String> {
    let parts: Vec<&str> = [customer.address.as_deref(), customer.city.as_deref()]
        .into_iter()
        .flatten()
        .filter(|s| !s.trim().is_empty())
        .collect();
    (!parts.is_empty()).then(|| parts.join(", "))
}

/// Subject and HTML body of the notification sent to the shop for a new order.
#[must_use]
pub fn order_email(order: &Order, shop_name: &str) -> (String, String) {
    let customer = &order.customer;
    let subject = format!("New order from {}", customer.name);

    let mut html = String::new();
    let _ = write!(
        html,
        "<h1>New order received - {}</h1><h2>Customer</h2><ul>",
        escape_html(shop_name)
    );
    let _ = write!(html, "<li><strong>Name:</strong> {}</li>", escape_html(&customer.name));
    if let Some(email) = &customer.email {
        let _ = write!(html, "<li><strong>Email:</strong> {}</li>", escape_html(email));
    }
    let _ = write!(html, "<li><strong>Phone:</strong> {}</li>", escape_html(&customer.phone));
    if !customer.delivery_method.is_empty() {
        let _ = write!(
            html,
            "<li><strong>Delivery:</strong> {}</li>",
            escape_html(&customer.delivery_method)
        );
    }
    if let Some(address) = address_line(customer) {
        let _ = write!(html, "<li><strong>Address:</strong> {}</li>", escape_html(&address));
    }
    if let Some(postal_code) = &customer.postal_code {
        let _ = write!(html, "<li><strong>Postal code:</strong> {}</li>", escape_html(postal_code));
    }
    if let Some(references) = &customer.references {
        let _ = write!(html, "<li><strong>References:</strong> {}</li>", escape_html(references));
    }
    if let Some(delivery_time) = &customer.delivery_time {
        let _ = write!(
            html,
            "<li><strong>Delivery time:</strong> {}</li>",
            escape_html(delivery_time)
        );
    }

    html.push_str(
        "</ul><h2>Items</h2><table border=\"1\" cellpadding=\"10\" cellspacing=\"0\" \
         style=\"width: 100%; border-collapse: collapse;\"><thead><tr>\
         <th>Product</th><th>Quantity</th><th>Subtotal</th></tr></thead><tbody>",
    );
    for item in &order.items {
        let _ = write!(
            html,
            "<tr><td>{}</td><td style=\"text-align: center;\">{}</td>\
             <td style=\"text-align: right;\">${}</td></tr>",
            escape_html(&item.name),
            item.quantity,
            format_amount(item.subtotal())
        );
    }
    let _ = write!(
        html,
        "</tbody></table><h3 style=\"text-align: right;\">Total: ${}</h3>\
         <p><strong>Payment method:</strong> {}</p><p><strong>Order:</strong> {}</p>",
        format_amount(order.total),
        escape_html(&order.payment_method),
        escape_html(&order.id)
    );

    (subject, html)
}

/// Subject and HTML body for a message sent through the contact form.
#[must_use]
pub fn contact_email(message: &ContactMessage, shop_name: &str) -> (String, String) {
    let subject = format!("New enquiry from {}", message.name);

    let mut html = String::from("<h1>New message from the website</h1><h3>Contact</h3><ul>");
    let _ = write!(html, "<li><strong>Name:</strong> {}</li>", escape_html(&message.name));
    let _ = write!(html, "<li><strong>Phone:</strong> {}</li>", escape_html(&message.phone));
    if let Some(email) = &message.email {
        let _ = write!(html, "<li><strong>Email:</strong> {}</li>", escape_html(email));
    }
    let body = message
        .message
        .as_deref()
        .filter(|m| !m.trim().is_empty())
        .map_or_else(|| "No message was written.".to_string(), escape_html);
    let _ = write!(
        html,
        "</ul><h3>Message</h3>\
         <p style=\"background-color:#f4f4f4; padding: 15px; border-radius: 5px;\">{body}</p>\
         <hr><p style=\"font-size: 0.9em; color: #777;\">Sent from the {} contact form</p>",
        escape_html(shop_name)
    );

    (subject, html)
}

/// Plain-text order summary the customer sends to the shop over WhatsApp.
#[must_use]
pub fn whatsapp_message(order: &Order, shop_name: &str) -> String {
    let customer = &order.customer;
    let mut text = format!("Hello {shop_name}! I'd like to place an order:\n\n");
    for item in &order.items {
        let _ = writeln!(
            text,
            "- {} x {}: ${}",
            item.quantity,
            item.name,
            format_amount(item.subtotal())
        );
    }
    let _ = writeln!(text, "\nTotal: ${}", format_amount(order.total));
    let _ = writeln!(text, "Name: {}", customer.name);
    let _ = writeln!(text, "Phone: {}", customer.phone);
    if !customer.delivery_method.is_empty() {
        let _ = writeln!(text, "Delivery: {}", customer.delivery_method);
    }
    if let Some(address) = address_line(customer) {
        let _ = writeln!(text, "Address: {address}");
    }
    if let Some(delivery_time) = &customer.delivery_time {
        let _ = writeln!(text, "Delivery time: {delivery_time}");
    }
    let _ = writeln!(text, "Payment: {}", order.payment_method);
    let _ = write!(text, "Order: {}", order.id);
    text
}

/// `wa.me` deep link opening a chat with `number` prefilled with `text`.
/// Returns `None` when no usable number is configured.
#[must_use]
pub fn whatsapp_url(number: &str, text: &str) -> Option<String> {
    let digits: String = number.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return None;
    }
    reqwest::Url::parse_with_params(&format!("https://wa.me/{digits}"), &[("text", text)])
        .ok()
        .map(String::from)
}
