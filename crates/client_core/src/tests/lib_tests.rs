use std::{
    collections::BTreeMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use super::*;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use shared::domain::PaymentStatus;
use tokio::{net::TcpListener, sync::Mutex};

#[derive(Default)]
struct GatewayData {
    users: BTreeMap<i64, User>,
    products: BTreeMap<i64, Product>,
    orders: BTreeMap<i64, Order>,
    // Raw rows, so tests can seed records this client never writes.
    payments: BTreeMap<i64, Value>,
    next_id: i64,
    searches: Vec<String>,
    failing_list: Option<&'static str>,
}

impl GatewayData {
    fn allocate_id(&mut self, requested: Option<i64>) -> i64 {
        match requested {
            Some(id) => id,
            None => {
                self.next_id += 1;
                self.next_id
            }
        }
    }

    fn check_list(&self, resource: &str) -> Result<(), (StatusCode, Json<Value>)> {
        match self.failing_list {
            Some(failing) if failing == resource => Err(gateway_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "database unavailable",
            )),
            _ => Ok(()),
        }
    }
}

#[derive(Clone)]
struct MockGateway {
    data: Arc<Mutex<GatewayData>>,
    list_delay: Duration,
    in_flight: Arc<AtomicUsize>,
    peak_in_flight: Arc<AtomicUsize>,
}

impl MockGateway {
    /// Holds a list request open for `list_delay`, recording how many overlap.
    async fn hold_list(&self) {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.list_delay).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

#[derive(Deserialize)]
struct SearchQuery {
    #[serde(default)]
    search: String,
}

type Reply = Result<(StatusCode, Json<Value>), (StatusCode, Json<Value>)>;
type ListReply<T> = Result<Json<Vec<T>>, (StatusCode, Json<Value>)>;

fn gateway_error(status: StatusCode, message: &str) -> (StatusCode, Json<Value>) {
    (status, Json(json!({ "error": message })))
}

async fn list_users(
    State(state): State<MockGateway>,
    Query(query): Query<SearchQuery>,
) -> ListReply<User> {
    state.hold_list().await;
    let mut data = state.data.lock().await;
    data.check_list("users")?;
    data.searches.push(query.search.clone());
    let needle = query.search.to_lowercase();
    Ok(Json(
        data.users
            .values()
            .filter(|user| {
                needle.is_empty()
                    || user.name.to_lowercase().contains(&needle)
                    || user.id.0.to_string() == needle
            })
            .cloned()
            .collect(),
    ))
}

async fn create_user(State(state): State<MockGateway>, Json(body): Json<NewUser>) -> Reply {
    let mut data = state.data.lock().await;
    if let Some(UserId(id)) = body.id {
        if data.users.contains_key(&id) {
            return Err(gateway_error(StatusCode::CONFLICT, "ID already exists"));
        }
    }
    if data.users.values().any(|user| user.email == body.email) {
        return Err(gateway_error(StatusCode::CONFLICT, "Email already exists"));
    }
    let id = data.allocate_id(body.id.map(|id| id.0));
    data.users.insert(
        id,
        User {
            id: UserId(id),
            name: body.name,
            email: body.email,
        },
    );
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "User created", "id": id })),
    ))
}

async fn update_user(
    State(state): State<MockGateway>,
    Path(id): Path<i64>,
    Json(body): Json<UserUpdate>,
) -> Reply {
    let mut data = state.data.lock().await;
    let Some(mut user) = data.users.remove(&id) else {
        return Err(gateway_error(StatusCode::NOT_FOUND, "User not found"));
    };
    if let Some(name) = body.name {
        user.name = name;
    }
    if let Some(email) = body.email {
        user.email = email;
    }
    let new_id = body.id.map(|id| id.0).unwrap_or(id);
    user.id = UserId(new_id);
    data.users.insert(new_id, user);
    Ok((StatusCode::OK, Json(json!({ "message": "User updated" }))))
}

async fn delete_user(State(state): State<MockGateway>, Path(id): Path<i64>) -> Reply {
    let mut data = state.data.lock().await;
    match data.users.remove(&id) {
        Some(_) => Ok((StatusCode::OK, Json(json!({ "message": "User deleted" })))),
        None => Err(gateway_error(StatusCode::NOT_FOUND, "User not found")),
    }
}

async fn list_products(
    State(state): State<MockGateway>,
    Query(query): Query<SearchQuery>,
) -> ListReply<Product> {
    state.hold_list().await;
    let data = state.data.lock().await;
    data.check_list("products")?;
    let needle = query.search.to_lowercase();
    Ok(Json(
        data.products
            .values()
            .filter(|product| needle.is_empty() || product.name.to_lowercase().contains(&needle))
            .cloned()
            .collect(),
    ))
}

async fn create_product(
    State(state): State<MockGateway>,
    Json(body): Json<NewProduct>,
) -> Reply {
    let mut data = state.data.lock().await;
    if let Some(ProductId(id)) = body.id {
        if data.products.contains_key(&id) {
            return Err(gateway_error(StatusCode::CONFLICT, "ID already exists"));
        }
    }
    let id = data.allocate_id(body.id.map(|id| id.0));
    data.products.insert(
        id,
        Product {
            id: ProductId(id),
            name: body.name,
            price: body.price,
        },
    );
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Product created", "id": id })),
    ))
}

async fn update_product(
    State(state): State<MockGateway>,
    Path(id): Path<i64>,
    Json(body): Json<ProductUpdate>,
) -> Reply {
    let mut data = state.data.lock().await;
    let new_id = body.id.map(|id| id.0).unwrap_or(id);
    if new_id != id && data.products.contains_key(&new_id) {
        return Err(gateway_error(StatusCode::CONFLICT, "ID already exists"));
    }
    let Some(mut product) = data.products.remove(&id) else {
        return Err(gateway_error(StatusCode::NOT_FOUND, "Product not found"));
    };
    if let Some(name) = body.name {
        product.name = name;
    }
    if let Some(price) = body.price {
        product.price = price;
    }
    product.id = ProductId(new_id);
    data.products.insert(new_id, product);
    let reply = if new_id == id {
        json!({ "message": "Product updated" })
    } else {
        json!({ "message": "Product updated with new ID", "new_id": new_id })
    };
    Ok((StatusCode::OK, Json(reply)))
}

async fn delete_product(State(state): State<MockGateway>, Path(id): Path<i64>) -> Reply {
    let mut data = state.data.lock().await;
    match data.products.remove(&id) {
        Some(_) => Ok((StatusCode::OK, Json(json!({ "message": "Product deleted" })))),
        None => Err(gateway_error(StatusCode::NOT_FOUND, "Product not found")),
    }
}

async fn list_orders(
    State(state): State<MockGateway>,
    Query(query): Query<SearchQuery>,
) -> ListReply<Order> {
    state.hold_list().await;
    let mut data = state.data.lock().await;
    data.check_list("orders")?;
    data.searches.push(query.search.clone());
    let wanted = query.search.trim().parse::<i64>().ok();
    Ok(Json(
        data.orders
            .values()
            .filter(|order| match wanted {
                Some(id) => order.id.0 == id || order.user_id.0 == id,
                None => true,
            })
            .cloned()
            .collect(),
    ))
}

async fn create_order(State(state): State<MockGateway>, Json(body): Json<NewOrder>) -> Reply {
    let mut data = state.data.lock().await;
    if body.product_ids.is_empty() {
        return Err(gateway_error(
            StatusCode::BAD_REQUEST,
            "Please select at least one product",
        ));
    }
    let id = data.allocate_id(body.id.map(|id| id.0));
    let total: f64 = body
        .product_ids
        .iter()
        .filter_map(|id| data.products.get(&id.0))
        .map(|product| product.price)
        .sum();
    let product_ids = body
        .product_ids
        .iter()
        .map(|id| id.0.to_string())
        .collect::<Vec<_>>()
        .join(",");
    let user_name = data.users.get(&body.user_id.0).map(|user| user.name.clone());
    data.orders.insert(
        id,
        Order {
            id: OrderId(id),
            user_id: body.user_id,
            user_name,
            product_ids: Some(product_ids),
            product_list: Vec::new(),
            total,
            status: DeliveryStatus::Pending,
        },
    );
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Order created", "id": id, "total": total })),
    ))
}

async fn update_order(
    State(state): State<MockGateway>,
    Path(id): Path<i64>,
    Json(body): Json<OrderUpdate>,
) -> Reply {
    let mut data = state.data.lock().await;
    let Some(order) = data.orders.get_mut(&id) else {
        return Err(gateway_error(StatusCode::NOT_FOUND, "Order not found"));
    };
    if let Some(status) = body.status {
        order.status = status;
    }
    if let Some(user_id) = body.user_id {
        order.user_id = user_id;
    }
    Ok((StatusCode::OK, Json(json!({ "message": "Order updated" }))))
}

async fn delete_order(
    State(state): State<MockGateway>,
    Path(id): Path<i64>,
) -> Result<StatusCode, (StatusCode, Json<Value>)> {
    let mut data = state.data.lock().await;
    match data.orders.remove(&id) {
        Some(_) => Ok(StatusCode::NO_CONTENT),
        None => Err(gateway_error(StatusCode::NOT_FOUND, "Order not found")),
    }
}

async fn list_payments(
    State(state): State<MockGateway>,
    Query(_query): Query<SearchQuery>,
) -> ListReply<Value> {
    state.hold_list().await;
    let data = state.data.lock().await;
    data.check_list("payments")?;
    Ok(Json(data.payments.values().cloned().collect()))
}

async fn create_payment(
    State(state): State<MockGateway>,
    Json(body): Json<NewPayment>,
) -> Reply {
    let mut data = state.data.lock().await;
    let amount = data
        .orders
        .get(&body.order_id.0)
        .map(|order| order.total)
        .filter(|total| *total > 0.0)
        .ok_or_else(|| {
            gateway_error(
                StatusCode::BAD_REQUEST,
                "Invalid order or order total is 0",
            )
        })?;
    if let Some(PaymentId(id)) = body.id {
        if data.payments.contains_key(&id) {
            return Err(gateway_error(StatusCode::CONFLICT, "ID already exists"));
        }
    }
    let id = data.allocate_id(body.id.map(|id| id.0));
    data.payments.insert(
        id,
        json!({
            "id": id,
            "order_id": body.order_id,
            "amount": amount,
            "method": body.method,
            "status": body.status,
        }),
    );
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Payment created",
            "id": id,
            "amount": amount,
            "status": body.status,
        })),
    ))
}

async fn update_payment(
    State(state): State<MockGateway>,
    Path(id): Path<i64>,
    Json(body): Json<PaymentUpdate>,
) -> Reply {
    let mut data = state.data.lock().await;
    let Some(row) = data.payments.get_mut(&id) else {
        return Err(gateway_error(StatusCode::NOT_FOUND, "Payment not found"));
    };
    let patch = serde_json::to_value(&body).expect("patch");
    if let (Some(row), Some(patch)) = (row.as_object_mut(), patch.as_object()) {
        for (key, value) in patch {
            if key != "id" {
                row.insert(key.clone(), value.clone());
            }
        }
    }
    Ok((StatusCode::OK, Json(json!({ "message": "Payment updated" }))))
}

async fn delete_payment(State(state): State<MockGateway>, Path(id): Path<i64>) -> Reply {
    let mut data = state.data.lock().await;
    match data.payments.remove(&id) {
        Some(_) => Ok((StatusCode::OK, Json(json!({ "message": "Payment deleted" })))),
        None => Err(gateway_error(StatusCode::NOT_FOUND, "Payment not found")),
    }
}

async fn spawn_gateway() -> (String, MockGateway) {
    spawn_gateway_with_delay(Duration::ZERO).await
}

async fn spawn_gateway_with_delay(list_delay: Duration) -> (String, MockGateway) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let state = MockGateway {
        data: Arc::new(Mutex::new(GatewayData::default())),
        list_delay,
        in_flight: Arc::new(AtomicUsize::new(0)),
        peak_in_flight: Arc::new(AtomicUsize::new(0)),
    };
    let app = Router::new()
        .route("/api/users/", get(list_users).post(create_user))
        .route("/api/users/:id/", put(update_user).delete(delete_user))
        .route("/api/products/", get(list_products).post(create_product))
        .route(
            "/api/products/:id/",
            put(update_product).delete(delete_product),
        )
        .route("/api/orders/", get(list_orders).post(create_order))
        .route("/api/orders/:id/", put(update_order).delete(delete_order))
        .route("/api/payments/", get(list_payments).post(create_payment))
        .route(
            "/api/payments/:id/",
            put(update_payment).delete(delete_payment),
        )
        .with_state(state.clone());
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (format!("http://{addr}/api"), state)
}

fn client(base_url: &str) -> GatewayClient {
    GatewayClient::new(base_url, DEFAULT_REQUEST_TIMEOUT).expect("client")
}

#[tokio::test]
async fn user_crud_round_trip() {
    let (base_url, _) = spawn_gateway().await;
    let client = client(&base_url);

    let created = client
        .create_user(&NewUser {
            id: None,
            name: "Doanh".to_string(),
            email: "doanh@gmail.com".to_string(),
        })
        .await
        .expect("create");
    let id = UserId(created.id);

    let users = client.list_users("").await.expect("list");
    assert!(users.iter().any(|user| user.id == id && user.name == "Doanh"));

    client
        .update_user(
            id,
            &UserUpdate {
                name: Some("Doanh Nguyen".to_string()),
                ..UserUpdate::default()
            },
        )
        .await
        .expect("update");
    let users = client.list_users("").await.expect("list");
    let user = users.iter().find(|user| user.id == id).expect("still listed");
    assert_eq!(user.name, "Doanh Nguyen");
    assert_eq!(user.email, "doanh@gmail.com");

    let reply = client.delete_user(id).await.expect("delete");
    assert_eq!(reply.message, "User deleted");
    let users = client.list_users("").await.expect("list");
    assert!(users.iter().all(|user| user.id != id));
}

#[tokio::test]
async fn custom_id_collision_maps_to_conflict() {
    let (base_url, _) = spawn_gateway().await;
    let client = client(&base_url);
    let user = |email: &str| NewUser {
        id: Some(UserId(7)),
        name: "Lan".to_string(),
        email: email.to_string(),
    };

    client.create_user(&user("lan@example.com")).await.expect("first");
    let err = client
        .create_user(&user("lan2@example.com"))
        .await
        .expect_err("duplicate id");

    assert!(err.is_conflict(), "unexpected error: {err}");
    assert_eq!(err.server_message(), Some("ID already exists"));
}

#[tokio::test]
async fn missing_record_maps_to_not_found() {
    let (base_url, _) = spawn_gateway().await;
    let client = client(&base_url);

    let err = client.delete_user(UserId(404)).await.expect_err("missing");
    assert_eq!(err.code(), ErrorCode::NotFound);
    assert!(matches!(err, ClientError::Api { status: 404, .. }));
}

#[tokio::test]
async fn rejected_payload_maps_to_validation() {
    let (base_url, _) = spawn_gateway().await;
    let client = client(&base_url);

    let err = client
        .create_order(&NewOrder {
            id: None,
            user_id: UserId(1),
            product_ids: Vec::new(),
        })
        .await
        .expect_err("empty order");
    assert_eq!(err.code(), ErrorCode::Validation);
    assert_eq!(
        err.server_message(),
        Some("Please select at least one product")
    );
}

#[tokio::test]
async fn list_always_sends_search_term() {
    let (base_url, gateway) = spawn_gateway().await;
    let client = client(&base_url);

    client.list_users("").await.expect("list");
    client.list_users("doanh").await.expect("search");

    let data = gateway.data.lock().await;
    assert_eq!(data.searches, vec!["".to_string(), "doanh".to_string()]);
}

#[tokio::test]
async fn order_gateway_updates_status_and_tolerates_empty_delete_reply() {
    let (base_url, _) = spawn_gateway().await;
    let client = client(&base_url);

    let created = client
        .create_order(&NewOrder {
            id: Some(OrderId(12)),
            user_id: UserId(3),
            product_ids: vec![ProductId(1), ProductId(2)],
        })
        .await
        .expect("create");
    assert_eq!(created.id, 12);

    let gateway: &dyn OrderGateway = &client;
    gateway
        .set_order_status(OrderId(12), DeliveryStatus::Delivering)
        .await
        .expect("status");

    let order = client
        .find_order(OrderId(12))
        .await
        .expect("find")
        .expect("order present");
    assert_eq!(order.status, DeliveryStatus::Delivering);
    assert_eq!(order.product_id_list(), vec![ProductId(1), ProductId(2)]);

    let reply = client.delete_order(OrderId(12)).await.expect("delete");
    assert!(reply.message.is_empty());
    assert!(client.find_order(OrderId(12)).await.expect("find").is_none());
}

#[tokio::test]
async fn find_order_ignores_orders_matched_by_user_id() {
    let (base_url, _) = spawn_gateway().await;
    let client = client(&base_url);

    client
        .create_order(&NewOrder {
            id: Some(OrderId(1)),
            user_id: UserId(5),
            product_ids: vec![ProductId(1)],
        })
        .await
        .expect("create");

    assert!(client.find_order(OrderId(5)).await.expect("find").is_none());
    assert_eq!(client.list_orders("5").await.expect("list").len(), 1);
}

#[tokio::test]
async fn unreachable_gateway_is_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    let client = client(&format!("http://{addr}/api"));
    let err = client.list_products("").await.expect_err("no server");
    assert!(matches!(err, ClientError::Transport { resource: "products", .. }));
    assert_eq!(err.code(), ErrorCode::Unavailable);
}

#[test]
fn rejects_unparseable_base_url() {
    let err = GatewayClient::new("not a url", DEFAULT_REQUEST_TIMEOUT).expect_err("bad url");
    assert!(matches!(err, ClientError::InvalidBaseUrl { .. }));
}

#[test]
fn trailing_slash_is_trimmed_from_base_url() {
    let client = client("http://localhost:8000/api/");
    assert_eq!(client.base_url(), "http://localhost:8000/api");
    assert_eq!(
        client.item_url(Resource::Payments, 4),
        "http://localhost:8000/api/payments/4/"
    );
}

#[tokio::test]
async fn product_crud_round_trip_and_rekey() {
    let (base_url, _) = spawn_gateway().await;
    let client = client(&base_url);

    client
        .create_product(&NewProduct {
            id: Some(ProductId(5)),
            name: "Pho".to_string(),
            price: 3.5,
        })
        .await
        .expect("create");
    let err = client
        .create_product(&NewProduct {
            id: Some(ProductId(5)),
            name: "Bun cha".to_string(),
            price: 4.0,
        })
        .await
        .expect_err("duplicate id");
    assert!(err.is_conflict(), "unexpected error: {err}");

    let reply = client
        .update_product(
            ProductId(5),
            &ProductUpdate {
                id: Some(ProductId(9)),
                price: Some(4.25),
                ..ProductUpdate::default()
            },
        )
        .await
        .expect("update");
    assert_eq!(reply.new_id, Some(9));

    let products = client.list_products("ph").await.expect("list");
    assert_eq!(
        products,
        vec![Product {
            id: ProductId(9),
            name: "Pho".to_string(),
            price: 4.25,
        }]
    );

    client.delete_product(ProductId(9)).await.expect("delete");
    assert!(client.list_products("").await.expect("list").is_empty());
}

#[tokio::test]
async fn payment_crud_round_trip_takes_amount_from_order() {
    let (base_url, _) = spawn_gateway().await;
    let client = client(&base_url);
    client
        .create_product(&NewProduct {
            id: Some(ProductId(1)),
            name: "Pho".to_string(),
            price: 3.5,
        })
        .await
        .expect("product");
    let order = client
        .create_order(&NewOrder {
            id: None,
            user_id: UserId(2),
            product_ids: vec![ProductId(1), ProductId(1)],
        })
        .await
        .expect("order");
    assert_eq!(order.total, Some(7.0));

    let created = client
        .create_payment(&NewPayment {
            id: None,
            order_id: OrderId(order.id),
            method: "E-Wallet".to_string(),
            status: PaymentStatus::Pending,
        })
        .await
        .expect("payment");
    assert_eq!(created.amount, Some(7.0));
    assert_eq!(created.status.as_deref(), Some("Pending"));
    let id = PaymentId(created.id);

    client
        .update_payment(
            id,
            &PaymentUpdate {
                status: Some(PaymentStatus::Paid),
                method: Some("Cash".to_string()),
                ..PaymentUpdate::default()
            },
        )
        .await
        .expect("update");
    let payments = client.list_payments("").await.expect("list");
    let payment = payments.iter().find(|p| p.id == id).expect("listed");
    assert_eq!(payment.status, PaymentStatus::Paid);
    assert_eq!(payment.method, "Cash");
    assert_eq!(payment.amount, 7.0);

    client.delete_payment(id).await.expect("delete");
    let err = client.delete_payment(id).await.expect_err("already gone");
    assert_eq!(err.code(), ErrorCode::NotFound);
}

#[tokio::test]
async fn payment_for_unpriced_order_is_rejected() {
    let (base_url, _) = spawn_gateway().await;
    let client = client(&base_url);

    let err = client
        .create_payment(&NewPayment {
            id: None,
            order_id: OrderId(77),
            method: "Cash".to_string(),
            status: PaymentStatus::Pending,
        })
        .await
        .expect_err("no such order");
    assert_eq!(err.code(), ErrorCode::Validation);
    assert_eq!(
        err.server_message(),
        Some("Invalid order or order total is 0")
    );
}

async fn seed_dashboard_data(gateway: &MockGateway) {
    let mut data = gateway.data.lock().await;
    data.users.insert(
        1,
        User {
            id: UserId(1),
            name: "Doanh".to_string(),
            email: "doanh@gmail.com".to_string(),
        },
    );
    data.products.insert(
        1,
        Product {
            id: ProductId(1),
            name: "Pho".to_string(),
            price: 4.0,
        },
    );
    for id in 1..=2 {
        data.orders.insert(
            id,
            Order {
                id: OrderId(id),
                user_id: UserId(1),
                user_name: None,
                product_ids: Some("1".to_string()),
                product_list: Vec::new(),
                total: 4.0,
                status: DeliveryStatus::Pending,
            },
        );
    }
    data.payments.insert(
        1,
        json!({ "id": 1, "order_id": 1, "amount": 4.0, "method": "Cash", "status": "Paid" }),
    );
    // Rows written before method and status were constrained.
    data.payments.insert(
        2,
        json!({ "id": 2, "order_id": 2, "amount": 4.0, "method": null, "status": "pending" }),
    );
    data.payments.insert(
        3,
        json!({ "id": 3, "order_id": 2, "amount": 9.0, "status": "completed" }),
    );
}

#[tokio::test]
async fn dashboard_fetches_all_four_lists_concurrently() {
    let (base_url, gateway) = spawn_gateway_with_delay(Duration::from_millis(200)).await;
    seed_dashboard_data(&gateway).await;
    let client = client(&base_url);

    let snapshot = load_dashboard(&client).await.expect("dashboard");

    assert_eq!(snapshot.user_count, 1);
    assert_eq!(snapshot.product_count, 1);
    assert_eq!(snapshot.order_count, 2);
    assert_eq!(snapshot.revenue, 4.0);
    assert_eq!(snapshot.payment_status.paid, 1);
    assert_eq!(snapshot.payment_status.pending, 1);
    assert_eq!(snapshot.payment_status.failed, 0);
    assert_eq!(snapshot.recent_orders[0].id, OrderId(2));
    assert_eq!(snapshot.recent_orders[0].user_label, "Doanh");
    assert_eq!(gateway.peak_in_flight.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn dashboard_fails_when_any_list_fails() {
    let (base_url, gateway) = spawn_gateway().await;
    seed_dashboard_data(&gateway).await;
    gateway.data.lock().await.failing_list = Some("payments");
    let client = client(&base_url);

    let err = load_dashboard(&client).await.expect_err("payments list is down");
    assert_eq!(err.code(), ErrorCode::Internal);
    assert!(matches!(err, ClientError::Api { status: 500, .. }));
    assert_eq!(err.server_message(), Some("database unavailable"));
}
