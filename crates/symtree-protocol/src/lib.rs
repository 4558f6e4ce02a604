//! # symtree Protocol
//!
//! Delivery of decoded diagnostic payloads to application subscribers.
//!
//! A payload source (the OS integration, a file watcher, the CLI) hands
//! batches of [`DiagnosticPayload`]s to a [`PayloadManager`]. The manager
//! owns a single worker thread that drains a command channel, so
//! registration, removal and delivery are applied strictly in the order they
//! were queued and subscribers are always called from the same thread.
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use symtree_core::DiagnosticPayload;
//! use symtree_protocol::{PayloadManager, PayloadSubscriber};
//!
//! struct Printer;
//!
//! impl PayloadSubscriber for Printer
//! {
//!     fn did_receive(&self, payloads: &[DiagnosticPayload])
//!     {
//!         println!("received {} payloads", payloads.len());
//!     }
//! }
//!
//! let manager = PayloadManager::new();
//! manager.add(Arc::new(Printer)).unwrap();
//! manager.flush().unwrap();
//! ```

pub mod error;
pub mod manager;

use symtree_core::DiagnosticPayload;

pub use error::{ProtocolError, Result};
pub use manager::{PayloadManager, SharedSubscriber};

/// Receives every batch of payloads delivered after registration.
///
/// Called on the manager's worker thread.
pub trait PayloadSubscriber: Send + Sync
{
    fn did_receive(&self, payloads: &[DiagnosticPayload]);
}
