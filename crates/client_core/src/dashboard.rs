use serde::Serialize;
use shared::{
    domain::{DeliveryStatus, OrderId, PaymentStatus},
    protocol::{Order, Payment, Product, User},
};
use tracing::warn;

use crate::{ClientError, GatewayClient};

const RECENT_ORDER_COUNT: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecentOrder {
    pub id: OrderId,
    pub user_label: String,
    pub total: f64,
    pub status: DeliveryStatus,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PaymentStatusCounts {
    pub pending: usize,
    pub paid: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSnapshot {
    pub revenue: f64,
    pub order_count: usize,
    pub user_count: usize,
    pub product_count: usize,
    pub recent_orders: Vec<RecentOrder>,
    pub payment_status: PaymentStatusCounts,
}

pub fn summarize(
    users: &[User],
    products: &[Product],
    orders: &[Order],
    payments: &[Payment],
) -> DashboardSnapshot {
    let revenue = payments
        .iter()
        .filter(|payment| payment.status == PaymentStatus::Paid)
        .map(|payment| payment.amount)
        .sum();

    let recent_orders = orders
        .iter()
        .rev()
        .take(RECENT_ORDER_COUNT)
        .map(|order| RecentOrder {
            id: order.id,
            user_label: users
                .iter()
                .find(|user| user.id == order.user_id)
                .map(|user| user.name.clone())
                .unwrap_or_else(|| format!("ID: {}", order.user_id)),
            total: order.total,
            status: order.status,
        })
        .collect();

    // Refunded and unrecognised statuses are not counted.
    let payment_status =
        payments
            .iter()
            .fold(PaymentStatusCounts::default(), |mut acc, payment| {
                match payment.status {
                    PaymentStatus::Paid => acc.paid += 1,
                    PaymentStatus::Pending => acc.pending += 1,
                    PaymentStatus::Failed => acc.failed += 1,
                    PaymentStatus::Refunded | PaymentStatus::Other(_) => {}
                }
                acc
            });

    DashboardSnapshot {
        revenue,
        order_count: orders.len(),
        user_count: users.len(),
        product_count: products.len(),
        recent_orders,
        payment_status,
    }
}

/// Fetches all four lists concurrently and summarizes them.
pub async fn load_dashboard(client: &GatewayClient) -> Result<DashboardSnapshot, ClientError> {
    let fetched = futures::try_join!(
        client.list_users(""),
        client.list_products(""),
        client.list_orders(""),
        client.list_payments(""),
    );
    let (users, products, orders, payments) = fetched.inspect_err(|err| {
        warn!(error = %err, "failed to load dashboard data");
    })?;
    Ok(summarize(&users, &products, &orders, &payments))
}
