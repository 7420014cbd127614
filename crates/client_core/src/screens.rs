//! Form checks and display helpers shared by the four CRUD screens.

use std::{collections::HashMap, sync::OnceLock};

use regex::Regex;
use shared::{
    domain::{DeliveryStatus, OrderId, PaymentId, PaymentMethod, PaymentStatus, ProductId, UserId},
    protocol::{
        NewOrder, NewPayment, NewProduct, NewUser, Order, OrderUpdate, PaymentUpdate, Product,
        ProductUpdate, Resource, UserUpdate,
    },
};
use thiserror::Error;

use crate::ClientError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please enter name and email!")]
    MissingNameOrEmail,
    #[error("Invalid email format! Email must contain @ and domain (e.g., user@gmail.com)")]
    InvalidEmail,
    #[error("Please enter name and price!")]
    MissingNameOrPrice,
    #[error("Price must be greater than 0!")]
    NonPositivePrice,
    #[error("ID must be positive!")]
    NonPositiveId,
    #[error("Please select a user!")]
    MissingUser,
    #[error("Please select at least one product!")]
    NoProducts,
    #[error("Please select an order!")]
    MissingOrder,
    #[error("Please select a payment method!")]
    MissingMethod,
    #[error("Unknown payment method '{0}'")]
    UnknownMethod(String),
}

fn email_pattern() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("email regex")
    })
}

pub fn is_valid_email(email: &str) -> bool {
    email_pattern().is_match(email)
}

fn positive_id(id: i64) -> Result<i64, ValidationError> {
    if id <= 0 {
        return Err(ValidationError::NonPositiveId);
    }
    Ok(id)
}

fn optional_id(id: Option<i64>) -> Result<Option<i64>, ValidationError> {
    id.map(positive_id).transpose()
}

fn user_fields(name: &str, email: &str) -> Result<(String, String), ValidationError> {
    let (name, email) = (name.trim(), email.trim());
    if name.is_empty() || email.is_empty() {
        return Err(ValidationError::MissingNameOrEmail);
    }
    if !is_valid_email(email) {
        return Err(ValidationError::InvalidEmail);
    }
    Ok((name.to_string(), email.to_string()))
}

pub fn new_user(id: Option<i64>, name: &str, email: &str) -> Result<NewUser, ValidationError> {
    let (name, email) = user_fields(name, email)?;
    Ok(NewUser {
        id: optional_id(id)?.map(UserId),
        name,
        email,
    })
}

/// Full edit of a user; `id` may differ from the record being edited to re-key it.
pub fn user_edit(id: i64, name: &str, email: &str) -> Result<UserUpdate, ValidationError> {
    let (name, email) = user_fields(name, email)?;
    Ok(UserUpdate {
        id: Some(UserId(positive_id(id)?)),
        name: Some(name),
        email: Some(email),
    })
}

fn product_fields(name: &str, price: Option<f64>) -> Result<(String, f64), ValidationError> {
    let name = name.trim();
    let Some(price) = price.filter(|_| !name.is_empty()) else {
        return Err(ValidationError::MissingNameOrPrice);
    };
    if price.is_nan() || price <= 0.0 {
        return Err(ValidationError::NonPositivePrice);
    }
    Ok((name.to_string(), price))
}

pub fn new_product(
    id: Option<i64>,
    name: &str,
    price: Option<f64>,
) -> Result<NewProduct, ValidationError> {
    let (name, price) = product_fields(name, price)?;
    Ok(NewProduct {
        id: optional_id(id)?.map(ProductId),
        name,
        price,
    })
}

pub fn product_edit(
    id: i64,
    name: &str,
    price: Option<f64>,
) -> Result<ProductUpdate, ValidationError> {
    let (name, price) = product_fields(name, price)?;
    Ok(ProductUpdate {
        id: Some(ProductId(positive_id(id)?)),
        name: Some(name),
        price: Some(price),
    })
}

fn order_fields(
    user_id: Option<i64>,
    product_ids: &[i64],
) -> Result<(UserId, Vec<ProductId>), ValidationError> {
    let user_id = user_id.ok_or(ValidationError::MissingUser)?;
    if product_ids.is_empty() {
        return Err(ValidationError::NoProducts);
    }
    Ok((
        UserId(user_id),
        product_ids.iter().copied().map(ProductId).collect(),
    ))
}

pub fn new_order(
    id: Option<i64>,
    user_id: Option<i64>,
    product_ids: &[i64],
) -> Result<NewOrder, ValidationError> {
    let (user_id, product_ids) = order_fields(user_id, product_ids)?;
    Ok(NewOrder {
        id: optional_id(id)?.map(OrderId),
        user_id,
        product_ids,
    })
}

/// Edit of an order's id, owner and products. `status` is left to the
/// dispatch flow unless given explicitly.
pub fn order_edit(
    id: i64,
    user_id: Option<i64>,
    product_ids: &[i64],
    status: Option<DeliveryStatus>,
) -> Result<OrderUpdate, ValidationError> {
    let (user_id, product_ids) = order_fields(user_id, product_ids)?;
    Ok(OrderUpdate {
        id: Some(OrderId(positive_id(id)?)),
        user_id: Some(user_id),
        product_ids: Some(product_ids),
        status,
    })
}

fn payment_method(method: &str) -> Result<PaymentMethod, ValidationError> {
    if method.trim().is_empty() {
        return Err(ValidationError::MissingMethod);
    }
    method
        .parse()
        .map_err(|_| ValidationError::UnknownMethod(method.to_string()))
}

pub fn new_payment(
    id: Option<i64>,
    order_id: Option<i64>,
    method: &str,
    status: PaymentStatus,
) -> Result<NewPayment, ValidationError> {
    let order_id = order_id.ok_or(ValidationError::MissingOrder)?;
    let method = payment_method(method)?;
    Ok(NewPayment {
        id: optional_id(id)?.map(PaymentId),
        order_id: OrderId(order_id),
        method: method.as_str().to_string(),
        status,
    })
}

pub fn payment_edit(
    id: i64,
    order_id: Option<i64>,
    amount: Option<f64>,
    method: &str,
    status: PaymentStatus,
) -> Result<PaymentUpdate, ValidationError> {
    let order_id = order_id.ok_or(ValidationError::MissingOrder)?;
    let method = payment_method(method)?;
    Ok(PaymentUpdate {
        id: Some(PaymentId(positive_id(id)?)),
        order_id: Some(OrderId(order_id)),
        amount,
        method: Some(method.as_str().to_string()),
        status: Some(status),
    })
}

/// Pending orders first, then newest id first.
pub fn sort_orders_for_display(orders: &mut [Order]) {
    orders.sort_by(|a, b| {
        let a_pending = a.status == DeliveryStatus::Pending;
        let b_pending = b.status == DeliveryStatus::Pending;
        b_pending.cmp(&a_pending).then_with(|| b.id.cmp(&a.id))
    });
}

/// Sum of known product prices; unknown ids count as zero.
pub fn prospective_total(product_ids: &[ProductId], products: &[Product]) -> f64 {
    let prices: HashMap<ProductId, f64> = products.iter().map(|p| (p.id, p.price)).collect();
    product_ids
        .iter()
        .map(|id| prices.get(id).copied().unwrap_or(0.0))
        .sum()
}

pub fn product_names(order: &Order, products: &[Product]) -> String {
    let ids = order.product_id_list();
    if ids.is_empty() {
        return "N/A".to_string();
    }
    ids.iter()
        .map(|id| {
            products
                .iter()
                .find(|product| product.id == *id)
                .map(|product| product.name.clone())
                .unwrap_or_else(|| format!("ID:{id}"))
        })
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn order_user_label(order: &Order) -> String {
    order
        .user_name
        .clone()
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| format!("ID: {}", order.user_id))
}

pub fn describe_order(order_id: OrderId, orders: &[Order]) -> String {
    match orders.iter().find(|order| order.id == order_id) {
        Some(order) => {
            let owner = order
                .user_name
                .clone()
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| format!("User {}", order.user_id));
            format!("Order #{} - {owner}", order.id)
        }
        None => format!("Order #{order_id}"),
    }
}

/// Amount a new payment for `order_id` will carry, taken from the order total.
pub fn prospective_amount(order_id: OrderId, orders: &[Order]) -> Option<f64> {
    orders
        .iter()
        .find(|order| order.id == order_id)
        .map(|order| order.total)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScreenAction {
    Fetch,
    Create,
    Update,
    Delete,
}

impl ScreenAction {
    fn gerund(self) -> &'static str {
        match self {
            Self::Fetch => "fetching",
            Self::Create => "creating",
            Self::Update => "updating",
            Self::Delete => "deleting",
        }
    }
}

/// One-line message for a failed screen action.
pub fn describe_failure(resource: Resource, action: ScreenAction, err: &ClientError) -> String {
    if err.is_conflict() && matches!(action, ScreenAction::Create | ScreenAction::Update) {
        return match resource {
            Resource::Users => err
                .server_message()
                .filter(|message| !message.is_empty())
                .unwrap_or("ID or Email already exists!")
                .to_string(),
            _ => "ID already exists! Please choose another ID.".to_string(),
        };
    }

    let detail = match action {
        ScreenAction::Delete | ScreenAction::Fetch => err.to_string(),
        ScreenAction::Create | ScreenAction::Update => err
            .server_message()
            .map(str::to_string)
            .unwrap_or_else(|| err.to_string()),
    };
    let noun = match action {
        ScreenAction::Fetch => resource.path(),
        _ => resource.noun(),
    };
    format!("Error {} {noun}: {detail}", action.gerund())
}

#[cfg(test)]
#[path = "tests/screens_tests.rs"]
mod tests;
