//! Payload subscriber that symbolicates what it receives.

use std::mem;
use std::sync::{Mutex, PoisonError};

use symtree_core::prelude::*;
use symtree_protocol::PayloadSubscriber;
use symtree_utils::debug;

pub struct Symbolicator
{
    engine: SymbolicationEngine<DwarfResolver>,
    results: Mutex<Vec<DiagnosticPayload>>,
}

impl Symbolicator
{
    pub fn new(engine: SymbolicationEngine<DwarfResolver>) -> Self
    {
        Self {
            engine,
            results: Mutex::new(Vec::new()),
        }
    }

    /// Symbolicated payloads received so far, in delivery order.
    pub fn take_results(&self) -> Vec<DiagnosticPayload>
    {
        mem::take(&mut *self.results.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl PayloadSubscriber for Symbolicator
{
    fn did_receive(&self, payloads: &[DiagnosticPayload])
    {
        let symbolicated: Vec<_> = payloads
            .iter()
            .map(|payload| self.engine.symbolicate_payload(payload))
            .collect();
        debug!(payloads = symbolicated.len(), "Symbolicated batch");

        self.results
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(symbolicated);
    }
}
