use std::{
    io::{self, BufRead, Write},
    sync::Arc,
    time::Duration,
};

use anyhow::{anyhow, bail, Context, Result};
use client_core::{
    dispatch::DispatchEvent,
    load_dashboard,
    screens::{self, describe_failure, ScreenAction},
    AdminSession, ClientError, DispatchOutcome, Dispatcher, GatewayClient, OrderGateway,
    SessionError, SessionGuard,
};
use serde::Serialize;
use serde_json::json;
use shared::{
    domain::{OrderId, PaymentId, ProductId, UserId},
    protocol::Resource,
};
use tokio::sync::broadcast::error::RecvError;
use tracing::info;

use crate::{
    cli::{Command, OrderCommand, PaymentCommand, ProductCommand, UserCommand},
    config::Settings,
    render,
};

fn fail(resource: Resource, action: ScreenAction) -> impl FnOnce(ClientError) -> anyhow::Error {
    move |err| anyhow!(describe_failure(resource, action, &err))
}

/// Prompts on stderr so `--json` output on stdout stays parseable.
fn confirm(prompt: &str) -> Result<bool> {
    ask(prompt, &mut io::stdin().lock(), &mut io::stderr())
}

fn ask(prompt: &str, input: &mut impl BufRead, prompt_out: &mut impl Write) -> Result<bool> {
    write!(prompt_out, "{prompt} [y/N] ")?;
    prompt_out.flush()?;
    let mut answer = String::new();
    input
        .read_line(&mut answer)
        .context("failed to read confirmation")?;
    Ok(matches!(
        answer.trim().to_ascii_lowercase().as_str(),
        "y" | "yes"
    ))
}

pub struct Console {
    settings: Settings,
    client: GatewayClient,
    guard: SessionGuard,
    json: bool,
}

impl Console {
    pub fn new(settings: Settings, json: bool) -> Result<Self> {
        let client = GatewayClient::new(&settings.gateway_url, settings.request_timeout)
            .context("failed to configure gateway client")?;
        let guard = SessionGuard::new(settings.credentials(), settings.state_dir.clone());
        Ok(Self {
            settings,
            client,
            guard,
            json,
        })
    }

    pub async fn run(&self, command: Command) -> Result<()> {
        match command {
            Command::Login { username, password } => self.login(&username, &password),
            Command::Logout => self.logout(),
            Command::Whoami => self.whoami(),
            protected => {
                self.require_admin()?;
                match protected {
                    Command::Dashboard => self.dashboard().await,
                    Command::Users { action } => self.users(action).await,
                    Command::Products { action } => self.products(action).await,
                    Command::Orders { action } => self.orders(action).await,
                    Command::Payments { action } => self.payments(action).await,
                    Command::Login { .. } | Command::Logout | Command::Whoami => Ok(()),
                }
            }
        }
    }

    fn emit<T: Serialize>(&self, value: &T, text: impl FnOnce() -> String) -> Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(value)?);
        } else {
            println!("{}", text());
        }
        Ok(())
    }

    fn require_admin(&self) -> Result<AdminSession> {
        match self.guard.require_admin() {
            Err(SessionError::NotAuthenticated) => bail!(
                "please log in first: foodfast-admin login --username <name> --password <password>"
            ),
            other => other.context("failed to read admin session"),
        }
    }

    fn login(&self, username: &str, password: &str) -> Result<()> {
        match self.guard.login(username, password) {
            Ok(session) => self.emit(&session, || format!("Logged in as {}", session.username)),
            Err(SessionError::InvalidCredentials) if self.guard.credentials().is_default() => {
                bail!("Invalid credentials! Use admin/admin123")
            }
            Err(SessionError::InvalidCredentials) => bail!("Invalid credentials!"),
            Err(err) => Err(err).context("failed to start admin session"),
        }
    }

    fn logout(&self) -> Result<()> {
        let ended = self.guard.logout().context("failed to end admin session")?;
        self.emit(&json!({ "logged_out": ended }), || {
            if ended {
                "Logged out".to_string()
            } else {
                "No active session".to_string()
            }
        })
    }

    fn whoami(&self) -> Result<()> {
        let session = self.guard.current().context("failed to read admin session")?;
        self.emit(&session, || match &session {
            Some(s) => format!("{} (logged in since {})", s.username, s.logged_in_at),
            None => "Not logged in".to_string(),
        })
    }

    async fn dashboard(&self) -> Result<()> {
        let snapshot = load_dashboard(&self.client)
            .await
            .map_err(|err| anyhow!("Error loading dashboard: {err}"))?;
        self.emit(&snapshot, || render::dashboard(&snapshot))
    }

    async fn users(&self, action: UserCommand) -> Result<()> {
        const R: Resource = Resource::Users;
        match action {
            UserCommand::List { search } => {
                let users = self
                    .client
                    .list_users(&search)
                    .await
                    .map_err(fail(R, ScreenAction::Fetch))?;
                self.emit(&users, || render::users(&users))
            }
            UserCommand::Create { id, name, email } => {
                let body = screens::new_user(id, &name, &email)?;
                let created = self
                    .client
                    .create_user(&body)
                    .await
                    .map_err(fail(R, ScreenAction::Create))?;
                self.emit(&created, || format!("Created user #{}", created.id))
            }
            UserCommand::Update {
                id,
                new_id,
                name,
                email,
            } => {
                let current = self
                    .client
                    .list_users("")
                    .await
                    .map_err(fail(R, ScreenAction::Fetch))?
                    .into_iter()
                    .find(|user| user.id == UserId(id))
                    .ok_or_else(|| anyhow!("user #{id} not found"))?;
                let body = screens::user_edit(
                    new_id.unwrap_or(id),
                    name.as_deref().unwrap_or(&current.name),
                    email.as_deref().unwrap_or(&current.email),
                )?;
                let reply = self
                    .client
                    .update_user(UserId(id), &body)
                    .await
                    .map_err(fail(R, ScreenAction::Update))?;
                self.emit(&reply, || format!("Updated user #{}", reply.new_id.unwrap_or(id)))
            }
            UserCommand::Delete { id, yes } => {
                if !yes && !confirm("Are you sure you want to delete this user?")? {
                    eprintln!("Cancelled");
                    return Ok(());
                }
                let reply = self
                    .client
                    .delete_user(UserId(id))
                    .await
                    .map_err(fail(R, ScreenAction::Delete))?;
                self.emit(&reply, || format!("Deleted user #{id}"))
            }
        }
    }

    async fn products(&self, action: ProductCommand) -> Result<()> {
        const R: Resource = Resource::Products;
        match action {
            ProductCommand::List { search } => {
                let products = self
                    .client
                    .list_products(&search)
                    .await
                    .map_err(fail(R, ScreenAction::Fetch))?;
                self.emit(&products, || render::products(&products))
            }
            ProductCommand::Create { id, name, price } => {
                let body = screens::new_product(id, &name, Some(price))?;
                let created = self
                    .client
                    .create_product(&body)
                    .await
                    .map_err(fail(R, ScreenAction::Create))?;
                self.emit(&created, || format!("Created product #{}", created.id))
            }
            ProductCommand::Update {
                id,
                new_id,
                name,
                price,
            } => {
                let current = self
                    .client
                    .list_products("")
                    .await
                    .map_err(fail(R, ScreenAction::Fetch))?
                    .into_iter()
                    .find(|product| product.id == ProductId(id))
                    .ok_or_else(|| anyhow!("product #{id} not found"))?;
                let body = screens::product_edit(
                    new_id.unwrap_or(id),
                    name.as_deref().unwrap_or(&current.name),
                    price.or(Some(current.price)),
                )?;
                let reply = self
                    .client
                    .update_product(ProductId(id), &body)
                    .await
                    .map_err(fail(R, ScreenAction::Update))?;
                self.emit(&reply, || {
                    format!("Updated product #{}", reply.new_id.unwrap_or(id))
                })
            }
            ProductCommand::Delete { id, yes } => {
                if !yes && !confirm("Are you sure you want to delete this product?")? {
                    eprintln!("Cancelled");
                    return Ok(());
                }
                let reply = self
                    .client
                    .delete_product(ProductId(id))
                    .await
                    .map_err(fail(R, ScreenAction::Delete))?;
                self.emit(&reply, || format!("Deleted product #{id}"))
            }
        }
    }

    async fn orders(&self, action: OrderCommand) -> Result<()> {
        const R: Resource = Resource::Orders;
        match action {
            OrderCommand::List { search } => {
                let (mut orders, products) = tokio::try_join!(
                    async {
                        self.client
                            .list_orders(&search)
                            .await
                            .map_err(fail(R, ScreenAction::Fetch))
                    },
                    async {
                        self.client
                            .list_products("")
                            .await
                            .map_err(fail(Resource::Products, ScreenAction::Fetch))
                    },
                )?;
                screens::sort_orders_for_display(&mut orders);
                self.emit(&orders, || render::orders(&orders, &products))
            }
            OrderCommand::Create { id, user, products } => {
                let body = screens::new_order(id, user, &products)?;
                let catalog = self
                    .client
                    .list_products("")
                    .await
                    .map_err(fail(Resource::Products, ScreenAction::Fetch))?;
                let prospective = screens::prospective_total(&body.product_ids, &catalog);
                info!(total = prospective, "submitting order");

                let created = self
                    .client
                    .create_order(&body)
                    .await
                    .map_err(fail(R, ScreenAction::Create))?;
                self.emit(&created, || {
                    format!(
                        "Created order #{} (total {})",
                        created.id,
                        render::money(created.total.unwrap_or(prospective))
                    )
                })
            }
            OrderCommand::Update {
                id,
                new_id,
                user,
                products,
                status,
            } => {
                let current = self
                    .client
                    .find_order(OrderId(id))
                    .await
                    .map_err(fail(R, ScreenAction::Fetch))?
                    .ok_or_else(|| anyhow!("order #{id} not found"))?;
                let products = if products.is_empty() {
                    current.product_id_list().iter().map(|p| p.0).collect()
                } else {
                    products
                };
                let body = screens::order_edit(
                    new_id.unwrap_or(id),
                    user.or(Some(current.user_id.0)),
                    &products,
                    status,
                )?;
                let reply = self
                    .client
                    .update_order(OrderId(id), &body)
                    .await
                    .map_err(fail(R, ScreenAction::Update))?;
                self.emit(&reply, || format!("Updated order #{}", reply.new_id.unwrap_or(id)))
            }
            OrderCommand::Delete { id, yes } => {
                if !yes && !confirm("Are you sure you want to delete this order?")? {
                    eprintln!("Cancelled");
                    return Ok(());
                }
                let reply = self
                    .client
                    .delete_order(OrderId(id))
                    .await
                    .map_err(fail(R, ScreenAction::Delete))?;
                self.emit(&reply, || format!("Deleted order #{id}"))
            }
            OrderCommand::Dispatch { id, delay_secs } => self.dispatch(id, delay_secs).await,
        }
    }

    async fn dispatch(&self, id: i64, delay_secs: Option<u64>) -> Result<()> {
        let order_id = OrderId(id);
        let order = self
            .client
            .find_order(order_id)
            .await
            .map_err(fail(Resource::Orders, ScreenAction::Fetch))?
            .ok_or_else(|| anyhow!("order #{id} not found"))?;
        let delay = delay_secs
            .map(Duration::from_secs)
            .unwrap_or(self.settings.dispatch_delay);

        let gateway: Arc<dyn OrderGateway> = Arc::new(self.client.clone());
        let dispatcher = Dispatcher::new(gateway, delay).with_refresh_search(order_id.to_string());
        let printer = tokio::spawn(print_dispatch_events(
            dispatcher.subscribe(),
            order_id,
            self.json,
        ));

        let Some(mut handle) = dispatcher.dispatch(&order).await? else {
            drop(dispatcher);
            printer.await.context("dispatch event printer failed")?;
            bail!("order #{id} could not be dispatched and is still Pending");
        };
        if !self.json {
            println!(
                "Drone dispatched for order #{id}; delivery completes in {}s (Ctrl-C to recall)",
                delay.as_secs()
            );
        }

        // Ctrl-C stays armed until the completion task itself finishes.
        let outcome = tokio::select! {
            outcome = handle.finished() => outcome,
            Ok(()) = tokio::signal::ctrl_c() => {
                handle.cancel();
                handle.wait().await
            }
        };
        drop(dispatcher);
        printer.await.context("dispatch event printer failed")?;

        let summary = match outcome {
            DispatchOutcome::Completed => "completed",
            DispatchOutcome::Cancelled => "cancelled",
            DispatchOutcome::CompletionFailed => "completion_failed",
        };
        self.emit(&json!({ "order_id": order_id, "outcome": summary }), || {
            match outcome {
                DispatchOutcome::Completed => format!("Order #{id} delivered"),
                DispatchOutcome::Cancelled => {
                    format!("Dispatch of order #{id} recalled; order left Delivering")
                }
                DispatchOutcome::CompletionFailed => {
                    format!("Order #{id} left Delivering; the completion update failed")
                }
            }
        })
    }

    async fn payments(&self, action: PaymentCommand) -> Result<()> {
        const R: Resource = Resource::Payments;
        match action {
            PaymentCommand::List { search } => {
                let payments = self
                    .client
                    .list_payments(&search)
                    .await
                    .map_err(fail(R, ScreenAction::Fetch))?;
                self.emit(&payments, || render::payments(&payments))
            }
            PaymentCommand::Create {
                id,
                order,
                method,
                status,
            } => {
                let body = screens::new_payment(id, order, &method, status)?;
                let orders = self
                    .client
                    .list_orders("")
                    .await
                    .map_err(fail(Resource::Orders, ScreenAction::Fetch))?;
                let label = screens::describe_order(body.order_id, &orders);
                let prospective = screens::prospective_amount(body.order_id, &orders);

                let created = self
                    .client
                    .create_payment(&body)
                    .await
                    .map_err(fail(R, ScreenAction::Create))?;
                self.emit(&created, || match created.amount.or(prospective) {
                    Some(amount) => format!(
                        "Created payment #{} for {label} ({})",
                        created.id,
                        render::money(amount)
                    ),
                    None => format!("Created payment #{} for {label}", created.id),
                })
            }
            PaymentCommand::Update {
                id,
                new_id,
                order,
                amount,
                method,
                status,
            } => {
                let current = self
                    .client
                    .list_payments("")
                    .await
                    .map_err(fail(R, ScreenAction::Fetch))?
                    .into_iter()
                    .find(|payment| payment.id == PaymentId(id))
                    .ok_or_else(|| anyhow!("payment #{id} not found"))?;
                let body = screens::payment_edit(
                    new_id.unwrap_or(id),
                    order.or(Some(current.order_id.0)),
                    amount.or(Some(current.amount)),
                    method.as_deref().unwrap_or(&current.method),
                    status.unwrap_or(current.status),
                )?;
                let reply = self
                    .client
                    .update_payment(PaymentId(id), &body)
                    .await
                    .map_err(fail(R, ScreenAction::Update))?;
                self.emit(&reply, || {
                    format!("Updated payment #{}", reply.new_id.unwrap_or(id))
                })
            }
            PaymentCommand::Delete { id, yes } => {
                if !yes && !confirm("Are you sure you want to delete this payment?")? {
                    eprintln!("Cancelled");
                    return Ok(());
                }
                let reply = self
                    .client
                    .delete_payment(PaymentId(id))
                    .await
                    .map_err(fail(R, ScreenAction::Delete))?;
                self.emit(&reply, || format!("Deleted payment #{id}"))
            }
        }
    }
}

async fn print_dispatch_events(
    mut events: tokio::sync::broadcast::Receiver<DispatchEvent>,
    order_id: OrderId,
    quiet: bool,
) {
    loop {
        let event = match events.recv().await {
            Ok(event) => event,
            Err(RecvError::Lagged(_)) => continue,
            Err(RecvError::Closed) => break,
        };
        if quiet {
            continue;
        }
        match event {
            DispatchEvent::Delivering { order_id } => {
                println!("Order #{order_id}: Delivering");
            }
            DispatchEvent::OrdersRefreshed { orders } => {
                if let Some(order) = orders.iter().find(|order| order.id == order_id) {
                    println!(
                        "Order #{order_id} now shows {} ({})",
                        order.status,
                        render::drone_label(order.status)
                    );
                }
            }
            DispatchEvent::Completed { order_id } => {
                println!("Order #{order_id}: Completed");
            }
            DispatchEvent::Cancelled { order_id } => {
                println!("Order #{order_id}: completion cancelled");
            }
            // Already logged by the dispatcher.
            DispatchEvent::Failed { .. } => {}
        }
    }
}
