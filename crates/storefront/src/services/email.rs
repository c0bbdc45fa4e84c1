//! Order confirmation email.
//!
//! Uses SMTP via lettre for delivery with Askama HTML and plain-text templates.

use askama::Template;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{MultiPart, SinglePart, header::ContentType},
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use secrecy::ExposeSecret;
use thiserror::Error;
use tracing::instrument;

use brickhaus_core::Price;

use crate::config::EmailConfig;
use crate::models::OrderWithLines;

/// One rendered order line.
struct EmailLine {
    name: String,
    item_no: String,
    condition: &'static str,
    qty: i32,
    total: String,
}

/// HTML template for the order confirmation.
#[derive(Template)]
#[template(path = "email/order_confirmation.html")]
struct OrderConfirmationHtml<'a> {
    short_code: &'a str,
    customer_name: Option<&'a str>,
    lines: &'a [EmailLine],
    subtotal: &'a str,
    shipping: &'a str,
    total: &'a str,
    order_url: &'a str,
}

/// Plain text template for the order confirmation.
#[derive(Template)]
#[template(path = "email/order_confirmation.txt")]
struct OrderConfirmationText<'a> {
    short_code: &'a str,
    customer_name: Option<&'a str>,
    lines: &'a [EmailLine],
    subtotal: &'a str,
    shipping: &'a str,
    total: &'a str,
    order_url: &'a str,
}

/// Errors that can occur when sending email.
#[derive(Debug, Error)]
pub enum EmailError {
    /// SMTP transport error.
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    /// Failed to build email message.
    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// Template rendering error.
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),

    /// The order has no address to send to.
    #[error("order has no email address")]
    NoRecipient,
}

/// Email service for sending transactional emails.
#[derive(Clone)]
pub struct EmailService {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
    base_url: String,
}

impl EmailService {
    /// Create a new email service from configuration.
    ///
    /// `base_url` is the shop's public URL, used for the order status link.
    ///
    /// # Errors
    ///
    /// Returns error if the SMTP relay cannot be configured.
    pub fn new(config: &EmailConfig, base_url: &str) -> Result<Self, SmtpError> {
        let credentials = Credentials::new(
            config.smtp_username.clone(),
            config.smtp_password.expose_secret().to_string(),
        );

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port)
            .credentials(credentials)
            .build();

        Ok(Self {
            mailer,
            from_address: config.from_address.clone(),
            base_url: base_url.to_string(),
        })
    }

    /// Send the confirmation for a paid order.
    ///
    /// # Errors
    ///
    /// Returns error if the order has no email, a template fails to render,
    /// or delivery fails.
    #[instrument(skip_all, fields(reference = %order.order.reference))]
    pub async fn send_order_confirmation(&self, order: &OrderWithLines) -> Result<(), EmailError> {
        let to = order.order.email.as_deref().ok_or(EmailError::NoRecipient)?;
        let rendered = render_order_confirmation(order, &self.base_url)?;
        let subject = format!("Your Brickhaus order {}", order.order.reference.short_code());

        self.send_multipart_email(to, &subject, &rendered.text, &rendered.html)
            .await
    }

    /// Send a multipart email with both plain text and HTML versions.
    async fn send_multipart_email(
        &self,
        to: &str,
        subject: &str,
        text_body: &str,
        html_body: &str,
    ) -> Result<(), EmailError> {
        let email = Message::builder()
            .from(
                self.from_address
                    .parse()
                    .map_err(|_| EmailError::InvalidAddress(self.from_address.clone()))?,
            )
            .to(to
                .parse()
                .map_err(|_| EmailError::InvalidAddress(to.to_string()))?)
            .subject(subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(text_body.to_string()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html_body.to_string()),
                    ),
            )?;

        self.mailer.send(email).await?;

        tracing::info!(to = %to, subject = %subject, "Email sent successfully");
        Ok(())
    }
}

struct RenderedEmail {
    html: String,
    text: String,
}

fn render_order_confirmation(
    order: &OrderWithLines,
    base_url: &str,
) -> Result<RenderedEmail, askama::Error> {
    let currency = order.order.currency_code();
    let money = |amount| Price::new(amount, currency).to_string();

    let lines: Vec<EmailLine> = order
        .lines
        .iter()
        .map(|line| EmailLine {
            name: line.name.clone(),
            item_no: line.item_no.clone(),
            condition: line.condition.label(),
            qty: line.qty,
            total: money(line.line_total()),
        })
        .collect();

    let short_code = order.order.reference.short_code();
    let subtotal = money(order.order.subtotal);
    let shipping = money(order.order.shipping);
    let total = money(order.order.total);
    let order_url = format!("{base_url}/orders/{}", order.order.reference);
    let customer_name = order.order.customer_name.as_deref();

    let html = OrderConfirmationHtml {
        short_code: &short_code,
        customer_name,
        lines: &lines,
        subtotal: &subtotal,
        shipping: &shipping,
        total: &total,
        order_url: &order_url,
    }
    .render()?;
    let text = OrderConfirmationText {
        short_code: &short_code,
        customer_name,
        lines: &lines,
        subtotal: &subtotal,
        shipping: &shipping,
        total: &total,
        order_url: &order_url,
    }
    .render()?;

    Ok(RenderedEmail { html, text })
}
