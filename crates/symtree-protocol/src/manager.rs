//! # Payload Manager
//!
//! Single-consumer work queue between a payload source and subscribers.
//!
//! Every public operation only enqueues a [`Command`]; the worker thread
//! applies them one at a time. Subscriber identity is pointer identity of
//! the shared `Arc`, so registering the same subscriber twice keeps one
//! entry.

use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, mpsc};
use std::thread::{self, JoinHandle};

use once_cell::sync::Lazy;
use symtree_core::DiagnosticPayload;
use tracing::{debug, error, trace, warn};

use crate::PayloadSubscriber;
use crate::error::{ProtocolError, Result};

/// A registered subscriber.
pub type SharedSubscriber = Arc<dyn PayloadSubscriber>;

enum Command
{
    Add(SharedSubscriber),
    Remove(SharedSubscriber),
    Deliver(Vec<DiagnosticPayload>),
    Flush(mpsc::Sender<()>),
}

static SHARED: Lazy<PayloadManager> = Lazy::new(PayloadManager::new);

/// Owns the delivery worker and its command channel.
///
/// Dropping the manager closes the channel and joins the worker after it
/// has drained every queued command.
#[derive(Debug)]
pub struct PayloadManager
{
    sender: Option<mpsc::Sender<Command>>,
    worker: Option<JoinHandle<()>>,
}

impl PayloadManager
{
    /// Start a manager with its own worker thread.
    pub fn new() -> Self
    {
        let (sender, receiver) = mpsc::channel();
        let worker = thread::spawn(move || run_delivery_loop(&receiver));

        Self {
            sender: Some(sender),
            worker: Some(worker),
        }
    }

    /// Process-wide manager, started on first use.
    pub fn shared() -> &'static Self
    {
        &SHARED
    }

    /// Register `subscriber`. A subscriber already registered is moved to
    /// the end of the delivery order instead of being added twice.
    ///
    /// ## Errors
    ///
    /// Returns [`ProtocolError::QueueClosed`] if the worker has stopped.
    pub fn add(&self, subscriber: SharedSubscriber) -> Result<()>
    {
        self.send(Command::Add(subscriber))
    }

    /// Unregister `subscriber`. Removing an unknown subscriber is a no-op.
    ///
    /// ## Errors
    ///
    /// Returns [`ProtocolError::QueueClosed`] if the worker has stopped.
    pub fn remove(&self, subscriber: &SharedSubscriber) -> Result<()>
    {
        self.send(Command::Remove(Arc::clone(subscriber)))
    }

    /// Queue `payloads` for every subscriber registered when the batch is
    /// reached. An empty batch is dropped here.
    ///
    /// ## Errors
    ///
    /// Returns [`ProtocolError::QueueClosed`] if the worker has stopped.
    pub fn deliver(&self, payloads: Vec<DiagnosticPayload>) -> Result<()>
    {
        if payloads.is_empty() {
            warn!("Ignoring delivery of an empty payload list");
            return Ok(());
        }
        self.send(Command::Deliver(payloads))
    }

    /// Block until every command queued before this call has been applied.
    ///
    /// ## Errors
    ///
    /// Returns [`ProtocolError::QueueClosed`] if the worker has stopped.
    pub fn flush(&self) -> Result<()>
    {
        let (ack, done) = mpsc::channel();
        self.send(Command::Flush(ack))?;
        done.recv().map_err(|_| ProtocolError::QueueClosed)
    }

    fn send(&self, command: Command) -> Result<()>
    {
        self.sender
            .as_ref()
            .ok_or(ProtocolError::QueueClosed)?
            .send(command)
            .map_err(|_| ProtocolError::QueueClosed)
    }
}

impl Default for PayloadManager
{
    fn default() -> Self
    {
        Self::new()
    }
}

impl Drop for PayloadManager
{
    fn drop(&mut self)
    {
        self.sender.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                error!("Payload delivery worker panicked");
            }
        }
    }
}

fn run_delivery_loop(receiver: &mpsc::Receiver<Command>)
{
    let mut subscribers: Vec<SharedSubscriber> = Vec::new();

    for command in receiver {
        match command {
            Command::Add(subscriber) => {
                subscribers.retain(|existing| !Arc::ptr_eq(existing, &subscriber));
                subscribers.push(subscriber);
                debug!(subscribers = subscribers.len(), "Subscriber added");
            }
            Command::Remove(subscriber) => {
                let before = subscribers.len();
                subscribers.retain(|existing| !Arc::ptr_eq(existing, &subscriber));
                if subscribers.len() == before {
                    warn!("Ignoring removal of a subscriber that is not registered");
                } else {
                    debug!(subscribers = subscribers.len(), "Subscriber removed");
                }
            }
            Command::Deliver(payloads) => deliver(&subscribers, &payloads),
            Command::Flush(ack) => {
                // The caller may have given up waiting.
                let _ = ack.send(());
            }
        }
    }

    debug!("Payload queue closed");
}

fn deliver(subscribers: &[SharedSubscriber], payloads: &[DiagnosticPayload])
{
    if subscribers.is_empty() {
        warn!(payloads = payloads.len(), "No subscribers registered, dropping payloads");
        return;
    }

    trace!(payloads = payloads.len(), subscribers = subscribers.len(), "Delivering payloads");
    for subscriber in subscribers {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| subscriber.did_receive(payloads)));
        if outcome.is_err() {
            error!("Subscriber panicked while receiving payloads");
        }
    }
}
