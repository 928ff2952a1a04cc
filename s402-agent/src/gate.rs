//! One-shot readiness gate between startup and the HTTP surface.
//!
//! The listener accepts connections while the ledger is still being opened.
//! Requests wait on the gate until startup finishes, then either see the
//! agent or the startup failure.

use std::sync::Arc;

use tokio::sync::watch;

use crate::agent::PaymentAgent;
use crate::error::AgentError;

#[derive(Debug, Clone)]
enum Readiness {
    Starting,
    Ready(Arc<PaymentAgent>),
    Failed(String),
}

/// Resolves the gate. Dropping it without resolving fails every waiter.
#[derive(Debug)]
pub struct GateOpener {
    tx: watch::Sender<Readiness>,
}

impl GateOpener {
    /// Publishes the startup result.
    pub fn resolve(self, result: Result<PaymentAgent, AgentError>) {
        let state = match result {
            Ok(agent) => Readiness::Ready(Arc::new(agent)),
            Err(e) => {
                tracing::error!(error = %e, "Agent startup failed");
                Readiness::Failed(e.to_string())
            }
        };
        self.tx.send_replace(state);
    }
}

/// Cloneable handle that waits for the agent.
#[derive(Debug, Clone)]
pub struct AgentGate {
    rx: watch::Receiver<Readiness>,
}

impl AgentGate {
    /// Creates a closed gate and the opener that resolves it.
    #[must_use]
    pub fn new() -> (GateOpener, Self) {
        let (tx, rx) = watch::channel(Readiness::Starting);
        (GateOpener { tx }, Self { rx })
    }

    /// Creates a gate that is already open.
    #[must_use]
    pub fn ready(agent: PaymentAgent) -> Self {
        let (opener, gate) = Self::new();
        opener.resolve(Ok(agent));
        gate
    }

    /// Waits for startup and returns the agent.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::NotReady`] if startup failed or was abandoned.
    pub async fn agent(&self) -> Result<Arc<PaymentAgent>, AgentError> {
        let mut rx = self.rx.clone();
        let state = rx
            .wait_for(|state| !matches!(state, Readiness::Starting))
            .await
            .map_err(|_| AgentError::NotReady("startup was abandoned".to_owned()))?;
        match &*state {
            Readiness::Ready(agent) => Ok(Arc::clone(agent)),
            Readiness::Failed(reason) => Err(AgentError::NotReady(reason.clone())),
            Readiness::Starting => Err(AgentError::NotReady("starting".to_owned())),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::ledger::{Ledger, LedgerError};

    fn agent() -> PaymentAgent {
        PaymentAgent::new(
            s402::network::NetworkId::new("sui", "testnet"),
            None,
            Ledger::open_in_memory().unwrap(),
            1_000,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_waiters_see_late_agent() {
        let (opener, gate) = AgentGate::new();
        let waiter = tokio::spawn({
            let gate = gate.clone();
            async move { gate.agent().await }
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        opener.resolve(Ok(agent()));
        assert!(waiter.await.unwrap().is_ok());
        assert!(gate.agent().await.is_ok());
    }

    #[tokio::test]
    async fn test_failed_startup_is_not_ready() {
        let (opener, gate) = AgentGate::new();
        opener.resolve(Err(AgentError::Storage(LedgerError::Poisoned)));
        assert!(matches!(gate.agent().await, Err(AgentError::NotReady(_))));
    }

    #[tokio::test]
    async fn test_dropped_opener_is_not_ready() {
        let (opener, gate) = AgentGate::new();
        drop(opener);
        assert!(matches!(gate.agent().await, Err(AgentError::NotReady(_))));
    }
}
