//! Drone dispatch: marks an order Delivering, then Completed after a delay.
//!
//! The completion step runs on a spawned task and is never persisted. A
//! failed status update is logged and dropped; nothing is retried.

use std::{sync::Arc, time::Duration};

use shared::{
    domain::{DeliveryStatus, OrderId},
    protocol::Order,
};
use thiserror::Error;
use tokio::{
    sync::{broadcast, oneshot},
    task::JoinHandle,
};
use tracing::{info, warn};

use crate::OrderGateway;

pub const DEFAULT_DISPATCH_DELAY: Duration = Duration::from_secs(10);

const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchStage {
    Start,
    Complete,
}

#[derive(Debug, Clone)]
pub enum DispatchEvent {
    Delivering {
        order_id: OrderId,
    },
    OrdersRefreshed {
        orders: Vec<Order>,
    },
    Completed {
        order_id: OrderId,
    },
    Failed {
        order_id: OrderId,
        stage: DispatchStage,
        message: String,
    },
    Cancelled {
        order_id: OrderId,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    Completed,
    Cancelled,
    /// The Completed update failed; the order is left Delivering.
    CompletionFailed,
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("order {order_id} is {status}; only Pending orders can be dispatched")]
    NotPending {
        order_id: OrderId,
        status: DeliveryStatus,
    },
}

pub struct Dispatcher {
    gateway: Arc<dyn OrderGateway>,
    delay: Duration,
    refresh_search: String,
    events: broadcast::Sender<DispatchEvent>,
}

impl Dispatcher {
    pub fn new(gateway: Arc<dyn OrderGateway>, delay: Duration) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            gateway,
            delay,
            refresh_search: String::new(),
            events,
        }
    }

    /// Search term used when refreshing the order list after each step.
    pub fn with_refresh_search(mut self, search: impl Into<String>) -> Self {
        self.refresh_search = search.into();
        self
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DispatchEvent> {
        self.events.subscribe()
    }

    /// Starts delivery of a Pending order.
    ///
    /// Returns `Ok(None)` when the Delivering update fails: the failure is
    /// logged and no completion is scheduled.
    pub async fn dispatch(&self, order: &Order) -> Result<Option<DispatchHandle>, DispatchError> {
        if order.status != DeliveryStatus::Pending {
            return Err(DispatchError::NotPending {
                order_id: order.id,
                status: order.status,
            });
        }

        let order_id = order.id;
        if let Err(err) = self
            .gateway
            .set_order_status(order_id, DeliveryStatus::Delivering)
            .await
        {
            warn!(order_id = order_id.0, error = %err, "drone dispatch failed to start");
            let _ = self.events.send(DispatchEvent::Failed {
                order_id,
                stage: DispatchStage::Start,
                message: err.to_string(),
            });
            return Ok(None);
        }

        let _ = self.events.send(DispatchEvent::Delivering { order_id });
        info!(
            order_id = order_id.0,
            delay_ms = self.delay.as_millis() as u64,
            "drone en route"
        );

        // The delay runs from the Delivering update, not from the refresh.
        let (cancel_tx, cancel_rx) = oneshot::channel();
        let task = tokio::spawn(complete_after_delay(
            Arc::clone(&self.gateway),
            order_id,
            self.delay,
            self.refresh_search.clone(),
            self.events.clone(),
            cancel_rx,
        ));
        refresh_orders(self.gateway.as_ref(), &self.refresh_search, &self.events).await;

        Ok(Some(DispatchHandle {
            order_id,
            cancel_tx: Some(cancel_tx),
            task,
        }))
    }
}

/// Handle to a scheduled completion. Dropping it leaves the completion
/// running; call [`DispatchHandle::cancel`] to skip it.
pub struct DispatchHandle {
    order_id: OrderId,
    cancel_tx: Option<oneshot::Sender<()>>,
    task: JoinHandle<DispatchOutcome>,
}

impl DispatchHandle {
    pub fn order_id(&self) -> OrderId {
        self.order_id
    }

    /// Requests cancellation. Returns false if the completion already ran or
    /// cancel was already requested.
    pub fn cancel(&mut self) -> bool {
        self.cancel_tx
            .take()
            .map(|tx| tx.send(()).is_ok())
            .unwrap_or(false)
    }

    pub async fn wait(mut self) -> DispatchOutcome {
        self.finished().await
    }

    /// Waits for the completion task without consuming the handle, so
    /// [`DispatchHandle::cancel`] stays reachable while waiting. Must not be
    /// awaited again once it has returned.
    pub async fn finished(&mut self) -> DispatchOutcome {
        match (&mut self.task).await {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(order_id = self.order_id.0, error = %err, "dispatch task aborted");
                DispatchOutcome::Cancelled
            }
        }
    }
}

async fn complete_after_delay(
    gateway: Arc<dyn OrderGateway>,
    order_id: OrderId,
    delay: Duration,
    refresh_search: String,
    events: broadcast::Sender<DispatchEvent>,
    mut cancel_rx: oneshot::Receiver<()>,
) -> DispatchOutcome {
    let sleep = tokio::time::sleep(delay);
    tokio::pin!(sleep);

    let mut cancelled = false;
    tokio::select! {
        _ = &mut sleep => {}
        res = &mut cancel_rx => cancelled = res.is_ok(),
    }
    if !cancelled && !sleep.is_elapsed() {
        // Handle dropped without cancelling: finish the scheduled delay.
        sleep.as_mut().await;
    }

    if cancelled {
        info!(order_id = order_id.0, "drone dispatch cancelled; order left Delivering");
        let _ = events.send(DispatchEvent::Cancelled { order_id });
        return DispatchOutcome::Cancelled;
    }

    if let Err(err) = gateway
        .set_order_status(order_id, DeliveryStatus::Completed)
        .await
    {
        warn!(order_id = order_id.0, error = %err, "drone delivery completion was not recorded");
        let _ = events.send(DispatchEvent::Failed {
            order_id,
            stage: DispatchStage::Complete,
            message: err.to_string(),
        });
        return DispatchOutcome::CompletionFailed;
    }

    info!(order_id = order_id.0, "drone delivery completed");
    let _ = events.send(DispatchEvent::Completed { order_id });
    refresh_orders(gateway.as_ref(), &refresh_search, &events).await;
    DispatchOutcome::Completed
}

async fn refresh_orders(
    gateway: &dyn OrderGateway,
    search: &str,
    events: &broadcast::Sender<DispatchEvent>,
) {
    match gateway.list_orders(search).await {
        Ok(orders) => {
            let _ = events.send(DispatchEvent::OrdersRefreshed { orders });
        }
        Err(err) => warn!(error = %err, "failed to refresh orders"),
    }
}

#[cfg(test)]
#[path = "tests/dispatch_tests.rs"]
mod tests;
