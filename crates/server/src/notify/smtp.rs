//! SMTP notifier backed by lettre, with askama email templates.

use askama::Template;
use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{MultiPart, SinglePart, header::ContentType},
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use secrecy::ExposeSecret;

use tourline_core::{Email, OrderStatus};

use crate::config::EmailConfig;
use crate::models::{Order, OrderLine};
use crate::notify::{Notification, Notifier, NotifyError};

/// HTML template for the verification code email.
#[derive(Template)]
#[template(path = "email/otp_code.html")]
struct OtpCodeHtml<'a> {
    code: &'a str,
}

/// Plain text template for the verification code email.
#[derive(Template)]
#[template(path = "email/otp_code.txt")]
struct OtpCodeText<'a> {
    code: &'a str,
}

/// HTML template for the order confirmation email.
#[derive(Template)]
#[template(path = "email/order_created.html")]
struct OrderCreatedHtml<'a> {
    order: &'a Order,
    lines: &'a [OrderLine],
}

/// Plain text template for the order confirmation email.
#[derive(Template)]
#[template(path = "email/order_created.txt")]
struct OrderCreatedText<'a> {
    order: &'a Order,
    lines: &'a [OrderLine],
}

/// HTML template for the status update email.
#[derive(Template)]
#[template(path = "email/order_status_changed.html")]
struct OrderStatusChangedHtml<'a> {
    order: &'a Order,
    old_status: OrderStatus,
}

/// Plain text template for the status update email.
#[derive(Template)]
#[template(path = "email/order_status_changed.txt")]
struct OrderStatusChangedText<'a> {
    order: &'a Order,
    old_status: OrderStatus,
}

/// [`Notifier`] that delivers multipart (text + HTML) email over SMTP.
#[derive(Clone)]
pub struct SmtpNotifier {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
}

impl SmtpNotifier {
    /// Create a new SMTP notifier from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the SMTP relay cannot be configured.
    pub fn new(config: &EmailConfig) -> Result<Self, SmtpError> {
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
        })
    }

    /// Send a multipart email with both plain text and HTML versions.
    async fn send_multipart_email(
        &self,
        to: &str,
        subject: &str,
        text_body: &str,
        html_body: &str,
    ) -> Result<(), NotifyError> {
        let email = Message::builder()
            .from(
                self.from_address
                    .parse()
                    .map_err(|_| NotifyError::InvalidAddress(self.from_address.clone()))?,
            )
            .to(to
                .parse()
                .map_err(|_| NotifyError::InvalidAddress(to.to_owned()))?)
            .subject(subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(text_body.to_owned()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html_body.to_owned()),
                    ),
            )?;

        self.mailer.send(email).await?;
        Ok(())
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn notify(
        &self,
        recipient: &Email,
        notification: Notification,
    ) -> Result<(), NotifyError> {
        let (subject, text, html) = match &notification {
            Notification::OtpIssued { code, .. } => (
                "Your Tourline verification code".to_owned(),
                OtpCodeText { code }.render()?,
                OtpCodeHtml { code }.render()?,
            ),
            Notification::OrderCreated { order, lines } => (
                format!("Order #{} received", order.id),
                OrderCreatedText { order, lines }.render()?,
                OrderCreatedHtml { order, lines }.render()?,
            ),
            Notification::OrderStatusChanged { order, old_status } => (
                format!("Order #{} status update", order.id),
                OrderStatusChangedText {
                    order,
                    old_status: *old_status,
                }
                .render()?,
                OrderStatusChangedHtml {
                    order,
                    old_status: *old_status,
                }
                .render()?,
            ),
        };

        self.send_multipart_email(recipient.as_str(), &subject, &text, &html)
            .await
    }
}
