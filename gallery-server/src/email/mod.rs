//! Customer email notifications
//!
//! All sends are best-effort: the order state transition is authoritative
//! whether or not the email goes out, so every failure here is logged and
//! swallowed by the caller.

use async_trait::async_trait;
use aws_sdk_sesv2::Client as SesClient;
use aws_sdk_sesv2::types::{Body, Content, Destination, EmailContent, Message};

use shared::models::order::OrderStatus;

use crate::db::orders::{Order, OrderItem};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Fire-and-forget notification seam.
///
/// The reconciler and the admin status endpoint call this; reconciliation
/// tests substitute a counting fake to assert the exactly-once guarantee.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Payment confirmation, sent on the first transition into `paid` only
    async fn payment_confirmed(&self, order: &Order, items: &[OrderItem]) -> Result<(), BoxError>;

    /// Fulfillment update (shipped / delivered / cancelled)
    async fn status_changed(&self, order: &Order, status: OrderStatus) -> Result<(), BoxError>;
}

/// SES-backed notifier
pub struct SesNotifier {
    ses: SesClient,
    from_email: String,
}

impl SesNotifier {
    pub fn new(ses: SesClient, from_email: String) -> Self {
        Self { ses, from_email }
    }

    async fn send(&self, to: &str, subject: &str, body_text: String) -> Result<(), BoxError> {
        let subject = Content::builder().data(subject).build()?;
        let body = Body::builder()
            .text(Content::builder().data(body_text).build()?)
            .build();
        let message = Message::builder().subject(subject).body(body).build();

        self.ses
            .send_email()
            .from_email_address(&self.from_email)
            .destination(Destination::builder().to_addresses(to).build())
            .content(EmailContent::builder().simple(message).build())
            .send()
            .await?;

        Ok(())
    }
}

fn item_lines(items: &[OrderItem]) -> String {
    items
        .iter()
        .map(|item| {
            format!(
                "  {} x{} at {} = {}",
                item.painting_title, item.quantity, item.price, item.subtotal
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[async_trait]
impl Notifier for SesNotifier {
    async fn payment_confirmed(&self, order: &Order, items: &[OrderItem]) -> Result<(), BoxError> {
        let body = format!(
            "Dear {},\n\n\
             Your payment for order {} has been received.\n\n\
             Items:\n{}\n\n\
             Subtotal: {}\n\
             Shipping: {}\n\
             Total:    {}\n\n\
             We will start preparing your artwork for shipment shortly.\n\n\
             Thank you for supporting the gallery.",
            order.customer_name,
            order.order_number,
            item_lines(items),
            order.subtotal,
            order.shipping_cost,
            order.total,
        );

        self.send(
            &order.customer_email,
            &format!("Order {} confirmed", order.order_number),
            body,
        )
        .await?;

        tracing::info!(
            order_number = %order.order_number,
            to = %order.customer_email,
            "Payment confirmation email sent"
        );
        Ok(())
    }

    async fn status_changed(&self, order: &Order, status: OrderStatus) -> Result<(), BoxError> {
        let (subject, line) = match status {
            OrderStatus::Shipped => (
                format!("Order {} shipped", order.order_number),
                "Your artwork is on its way.",
            ),
            OrderStatus::Delivered => (
                format!("Order {} delivered", order.order_number),
                "Your artwork has been delivered. We hope you enjoy it.",
            ),
            OrderStatus::Cancelled => (
                format!("Order {} cancelled", order.order_number),
                "Your order has been cancelled. If this was a mistake, please contact us.",
            ),
            // No email for the remaining states; paid has its own template
            _ => return Ok(()),
        };

        let body = format!(
            "Dear {},\n\n{}\n\nOrder number: {}\nTotal: {}\n\nThank you for supporting the gallery.",
            order.customer_name, line, order.order_number, order.total,
        );

        self.send(&order.customer_email, &subject, body).await?;

        tracing::info!(
            order_number = %order.order_number,
            status = %status,
            "Status change email sent"
        );
        Ok(())
    }
}
