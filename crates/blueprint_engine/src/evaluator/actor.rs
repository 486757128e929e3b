//! Actor Evaluator - One long-lived worker per node
//!
//! Each node gets a worker task with a bounded mailbox. The router sends
//! `Execute` to entry actors, routes produced values along data wires before
//! queuing any downstream execution, and tracks a pending-work counter; the
//! run completes when the counter drains or the wall-clock limit trips.
//!
//! Within one actor, messages are processed FIFO. Per (source, target) pair
//! all data messages from a firing are sent before the execution message
//! that would make the target re-execute. There is no global ordering
//! across concurrent firings.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};

use dashmap::DashMap;
use futures::FutureExt;
use futures::future::BoxFuture;
use parking_lot::Mutex;
use tokio::sync::{Notify, mpsc, oneshot};
use tokio::time::timeout;

use blueprint_types::{ConnectionKind, Value};

use super::{FiringMode, fire_node_once};
use crate::error::{BlueprintError, ErrorReport, codes};
use crate::run::RunHost;

// ─────────────────────────────────────────────────────────────────────────────
// Protocol
// ─────────────────────────────────────────────────────────────────────────────

/// Messages an actor accepts
pub(crate) enum ActorMessage {
    /// Fire the node and reply with the firing's results
    Execute {
        reply: oneshot::Sender<ExecuteResponse>,
    },
    /// A value delivered along a data wire
    Input { pin: String, value: Value },
    /// Shut the actor down; in-flight work finishes first
    Stop,
}

/// Reply to an `Execute` message
pub(crate) struct ExecuteResponse {
    pub outputs: Vec<(String, serde_json::Value)>,
    pub activated: Vec<String>,
    pub error: Option<ErrorReport>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Router
// ─────────────────────────────────────────────────────────────────────────────

/// Owns the actor mailboxes and dispatches work between them
pub(crate) struct ActorRouter {
    host: Arc<RunHost>,
    senders: DashMap<String, mpsc::Sender<ActorMessage>>,
    pending: AtomicI64,
    drained: Notify,
    stopped: AtomicBool,
    last_error: Mutex<Option<ErrorReport>>,
}

impl ActorRouter {
    fn new(host: Arc<RunHost>) -> Self {
        Self {
            host,
            senders: DashMap::new(),
            pending: AtomicI64::new(0),
            drained: Notify::new(),
            stopped: AtomicBool::new(false),
            last_error: Mutex::new(None),
        }
    }

    /// Create one worker per blueprint node
    fn spawn_actors(self: &Arc<Self>) {
        let capacity = self.host.config.mailbox_capacity.max(1);
        for node in &self.host.blueprint().nodes {
            let (tx, rx) = mpsc::channel(capacity);
            self.senders.insert(node.id.clone(), tx);
            tokio::spawn(actor_worker(self.clone(), node.id.clone(), rx));
        }
    }

    fn add_pending(&self) {
        self.pending.fetch_add(1, Ordering::SeqCst);
    }

    fn finish_pending(&self) {
        if self.pending.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.drained.notify_waiters();
        }
    }

    async fn wait_drained(&self) {
        loop {
            let notified = self.drained.notified();
            if self.pending.load(Ordering::SeqCst) == 0 {
                return;
            }
            notified.await;
        }
    }

    /// Synchronous send: enqueue within the enqueue timeout, then wait for
    /// the reply within the response timeout
    async fn send_execute(&self, node_id: &str) -> Result<ExecuteResponse, BlueprintError> {
        let sender = self
            .senders
            .get(node_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| {
                BlueprintError::execution(
                    codes::ACTOR_STOPPED,
                    format!("no actor for node '{node_id}'"),
                )
                .with_run(&self.host.run.run_id)
                .with_node(node_id)
            })?;

        let (tx, rx) = oneshot::channel();
        match timeout(
            self.host.config.enqueue_timeout(),
            sender.send(ActorMessage::Execute { reply: tx }),
        )
        .await
        {
            Ok(Ok(())) => {}
            Ok(Err(_)) => {
                return Err(BlueprintError::execution(
                    codes::ACTOR_STOPPED,
                    format!("mailbox for node '{node_id}' is closed"),
                )
                .with_run(&self.host.run.run_id)
                .with_node(node_id));
            }
            Err(_) => {
                return Err(BlueprintError::timeout(
                    codes::SEND_TIMEOUT,
                    format!("timed out enqueueing execute for node '{node_id}'"),
                )
                .with_run(&self.host.run.run_id)
                .with_node(node_id));
            }
        }

        match timeout(self.host.config.reply_timeout(), rx).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(_)) => Err(BlueprintError::execution(
                codes::ACTOR_STOPPED,
                format!("actor for node '{node_id}' dropped its reply"),
            )
            .with_run(&self.host.run.run_id)
            .with_node(node_id)),
            Err(_) => Err(BlueprintError::timeout(
                codes::RESPONSE_TIMEOUT,
                format!("timed out waiting for node '{node_id}' to respond"),
            )
            .with_run(&self.host.run.run_id)
            .with_node(node_id)),
        }
    }

    /// Fire-and-forget value delivery along every outgoing data wire
    ///
    /// Dropped with a warning when a target mailbox is full or gone.
    fn route_data(&self, node_id: &str, outputs: &[(String, serde_json::Value)]) {
        let blueprint = self.host.blueprint().clone();
        for (pin, raw) in outputs {
            for wire in blueprint.wires_from(node_id, pin, ConnectionKind::Data) {
                let Some(sender) = self
                    .senders
                    .get(&wire.target_node_id)
                    .map(|entry| entry.value().clone())
                else {
                    continue;
                };
                let message = ActorMessage::Input {
                    pin: wire.target_pin_id.clone(),
                    value: Value::any(raw.clone()),
                };
                if sender.try_send(message).is_err() {
                    tracing::warn!(
                        source = node_id,
                        target = %wire.target_node_id,
                        pin = %wire.target_pin_id,
                        "dropping data message: target mailbox unavailable"
                    );
                }
            }
        }
    }

    /// Asynchronous dispatch: execute a node, route its values, queue its
    /// activated successors
    fn dispatch(self: Arc<Self>, node_id: String) -> BoxFuture<'static, ()> {
        async move {
            if !self.stopped.load(Ordering::SeqCst) {
                match self.send_execute(&node_id).await {
                    Ok(response) => {
                        if let Some(report) = response.error {
                            // The worker already recorded the node error;
                            // stop queuing downstream work on this branch.
                            *self.last_error.lock() = Some(report);
                        } else {
                            self.route_data(&node_id, &response.outputs);
                            for pin in &response.activated {
                                let targets: Vec<String> = self
                                    .host
                                    .blueprint()
                                    .wires_from(&node_id, pin, ConnectionKind::Execution)
                                    .iter()
                                    .map(|wire| wire.target_node_id.clone())
                                    .collect();
                                for target in targets {
                                    self.add_pending();
                                    tokio::spawn(self.clone().dispatch(target));
                                }
                            }
                        }
                    }
                    Err(err) => {
                        self.host.run.record_error(err.report());
                        *self.last_error.lock() = Some(err.report());
                    }
                }
            }
            self.finish_pending();
        }
        .boxed()
    }

    /// Synchronously drive the successors along one pin (loop bodies)
    pub(crate) async fn drive_successors(
        &self,
        node_id: &str,
        pin_id: &str,
    ) -> Result<(), BlueprintError> {
        let targets: Vec<String> = self
            .host
            .blueprint()
            .wires_from(node_id, pin_id, ConnectionKind::Execution)
            .iter()
            .map(|wire| wire.target_node_id.clone())
            .collect();

        for target in targets {
            self.drive_node(&target).await?;
        }
        Ok(())
    }

    fn drive_node<'a>(&'a self, node_id: &'a str) -> BoxFuture<'a, Result<(), BlueprintError>> {
        async move {
            let response = self.send_execute(node_id).await?;
            if let Some(report) = response.error {
                return Err(report.to_error());
            }
            self.route_data(node_id, &response.outputs);

            for pin in response.activated {
                let targets: Vec<String> = self
                    .host
                    .blueprint()
                    .wires_from(node_id, &pin, ConnectionKind::Execution)
                    .iter()
                    .map(|wire| wire.target_node_id.clone())
                    .collect();
                for target in targets {
                    self.drive_node(&target).await?;
                }
            }
            Ok(())
        }
        .boxed()
    }

    /// Broadcast stop and drop the mailboxes; late replies are discarded
    fn stop_all(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        for entry in self.senders.iter() {
            let _ = entry.value().try_send(ActorMessage::Stop);
        }
        self.senders.clear();
    }

    fn take_error(&self) -> Option<ErrorReport> {
        self.last_error.lock().take()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Worker
// ─────────────────────────────────────────────────────────────────────────────

async fn actor_worker(
    router: Arc<ActorRouter>,
    node_id: String,
    mut rx: mpsc::Receiver<ActorMessage>,
) {
    let mut received: HashMap<String, Value> = HashMap::new();

    while let Some(message) = rx.recv().await {
        match message {
            ActorMessage::Input { pin, value } => {
                received.insert(pin, value);
            }
            ActorMessage::Execute { reply } => {
                let outcome = fire_node_once(
                    &router.host,
                    &node_id,
                    received.clone(),
                    FiringMode::Actor(router.clone()),
                )
                .await;

                let response = match outcome {
                    Ok(outcome) => ExecuteResponse {
                        outputs: outcome.outputs,
                        activated: outcome.activated,
                        error: None,
                    },
                    Err(err) => ExecuteResponse {
                        outputs: Vec::new(),
                        activated: Vec::new(),
                        error: Some(err.report()),
                    },
                };
                // The receiver may be gone after a stop broadcast; the
                // response is discarded in that case.
                let _ = reply.send(response);
            }
            ActorMessage::Stop => break,
        }
    }

    tracing::trace!(node_id = %node_id, "actor worker exited");
}

// ─────────────────────────────────────────────────────────────────────────────
// Run Driver
// ─────────────────────────────────────────────────────────────────────────────

/// Execute a run under the actor evaluator
pub(crate) async fn run_entries(
    host: &Arc<RunHost>,
    entries: Vec<String>,
) -> Result<(), BlueprintError> {
    let router = Arc::new(ActorRouter::new(host.clone()));
    router.spawn_actors();

    for entry in entries {
        router.add_pending();
        tokio::spawn(router.clone().dispatch(entry));
    }

    let result = match timeout(host.config.run_timeout(), router.wait_drained()).await {
        Ok(()) => match router.take_error() {
            Some(report) => Err(report.to_error()),
            None => Ok(()),
        },
        Err(_) => {
            let err = BlueprintError::timeout(
                codes::RUN_TIMEOUT,
                format!(
                    "run exceeded its wall-clock limit of {}ms",
                    host.config.run_timeout_ms
                ),
            )
            .with_run(&host.run.run_id)
            .unrecoverable();
            host.run.record_error(err.report());
            Err(err)
        }
    };

    router.stop_all();
    result
}
