use client_core::{
    dashboard::DashboardSnapshot,
    screens::{order_user_label, product_names},
};
use shared::{
    domain::DeliveryStatus,
    protocol::{Order, Payment, Product, User},
};

/// Plain left-aligned text table; column widths follow the widest cell.
pub fn table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    let mut out = vec![
        table_line(headers.iter().copied(), &widths),
        table_line(rule.iter().map(String::as_str), &widths),
    ];
    if rows.is_empty() {
        out.push("(none)".to_string());
    }
    for row in rows {
        out.push(table_line(row.iter().map(String::as_str), &widths));
    }
    out.join("\n")
}

fn table_line<'a>(cells: impl Iterator<Item = &'a str>, widths: &[usize]) -> String {
    cells
        .zip(widths.iter().copied())
        .map(|(cell, width)| format!("{cell:<width$}"))
        .collect::<Vec<_>>()
        .join("  ")
        .trim_end()
        .to_string()
}

pub fn money(amount: f64) -> String {
    format!("${amount:.2}")
}

pub fn drone_label(status: DeliveryStatus) -> &'static str {
    match status {
        DeliveryStatus::Pending => "ready to dispatch",
        DeliveryStatus::Delivering => "drone en route",
        DeliveryStatus::Completed => "delivered",
        DeliveryStatus::Unknown => "unknown status",
    }
}

pub fn users(users: &[User]) -> String {
    let rows = users
        .iter()
        .map(|u| vec![u.id.to_string(), u.name.clone(), u.email.clone()])
        .collect::<Vec<_>>();
    table(&["ID", "Name", "Email"], &rows)
}

pub fn products(products: &[Product]) -> String {
    let rows = products
        .iter()
        .map(|p| vec![p.id.to_string(), p.name.clone(), money(p.price)])
        .collect::<Vec<_>>();
    table(&["ID", "Name", "Price"], &rows)
}

pub fn orders(orders: &[Order], products: &[Product]) -> String {
    let rows = orders
        .iter()
        .map(|o| {
            vec![
                o.id.to_string(),
                order_user_label(o),
                product_names(o, products),
                money(o.total),
                o.status.to_string(),
                drone_label(o.status).to_string(),
            ]
        })
        .collect::<Vec<_>>();
    table(&["ID", "User", "Products", "Total", "Status", "Drone"], &rows)
}

pub fn payments(payments: &[Payment]) -> String {
    let rows = payments
        .iter()
        .map(|p| {
            vec![
                p.id.to_string(),
                format!("#{}", p.order_id),
                money(p.amount),
                p.method.clone(),
                p.status.to_string(),
            ]
        })
        .collect::<Vec<_>>();
    table(&["ID", "Order", "Amount", "Method", "Status"], &rows)
}

pub fn dashboard(snapshot: &DashboardSnapshot) -> String {
    let mut out = vec![
        format!("Revenue:   {}", money(snapshot.revenue)),
        format!("Orders:    {}", snapshot.order_count),
        format!("Users:     {}", snapshot.user_count),
        format!("Products:  {}", snapshot.product_count),
        format!(
            "Payments:  {} pending, {} paid, {} failed",
            snapshot.payment_status.pending,
            snapshot.payment_status.paid,
            snapshot.payment_status.failed
        ),
        String::new(),
        "Recent orders".to_string(),
    ];
    let rows = snapshot
        .recent_orders
        .iter()
        .map(|o| {
            vec![
                format!("#{}", o.id),
                o.user_label.clone(),
                money(o.total),
                o.status.to_string(),
            ]
        })
        .collect::<Vec<_>>();
    out.push(table(&["Order", "User", "Total", "Status"], &rows));
    out.join("\n")
}
