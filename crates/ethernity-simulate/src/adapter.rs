//! Fronteira entre o pipeline de reordenação e o motor de execução.
//!
//! O adaptador nunca propaga erros de envio: cada chamada produz um
//! `ExecutionOutcome` etiquetado. Apenas snapshot/restore retornam `Result`,
//! pois uma falha neles compromete o isolamento entre ordenações.

use std::future::Future;
use std::time::Duration;

use ethernity_core::types::BlockTransaction;
use tracing::warn;

use crate::errors::{Result, SimulationError};
use crate::traits::{SimulatedReceipt, SimulationSession, SnapshotId};

/// Resultado etiquetado de uma execução
#[derive(Debug)]
pub enum ExecutionOutcome {
    /// Recibo presente, inclusive quando a transação reverteu
    Receipt(SimulatedReceipt),
    /// Falha do motor (conexão, chamada malformada, timeout)
    Fault(SimulationError),
}

/// Adaptador que envolve uma sessão exclusiva com limite de tempo por chamada
pub struct ExecutionAdapter<S> {
    session: S,
    call_timeout: Duration,
}

impl<S: SimulationSession> ExecutionAdapter<S> {
    pub fn new(session: S, call_timeout: Duration) -> Self {
        Self { session, call_timeout }
    }

    async fn bounded<T, F>(&self, call: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        match tokio::time::timeout(self.call_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(SimulationError::Timeout(self.call_timeout)),
        }
    }

    /// Executa uma transação sobre o estado corrente da sessão
    pub async fn execute(&self, tx: &BlockTransaction) -> ExecutionOutcome {
        match self.bounded(self.session.send_transaction(tx)).await {
            Ok(receipt) => ExecutionOutcome::Receipt(receipt),
            Err(e) => {
                warn!(tx = ?tx.hash, error = %e, "falha do motor durante execucao");
                ExecutionOutcome::Fault(e)
            }
        }
    }

    /// Registra um ponto de restauração
    pub async fn checkpoint(&self) -> Result<SnapshotId> {
        self.bounded(self.session.snapshot()).await
    }

    /// Volta ao ponto de restauração informado
    pub async fn rollback(&self, id: SnapshotId) -> Result<()> {
        self.bounded(self.session.revert(id)).await
    }

    pub async fn close(&self) {
        self.session.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::ReceiptStatus;
    use async_trait::async_trait;
    use ethers::types::{Address, H256, U256};
    use std::sync::atomic::{AtomicUsize, Ordering};

    enum Behaviour {
        Succeed,
        Revert,
        Fail,
        Hang,
    }

    struct ScriptedSession {
        behaviour: Behaviour,
        snapshots: AtomicUsize,
    }

    impl ScriptedSession {
        fn new(behaviour: Behaviour) -> Self {
            Self { behaviour, snapshots: AtomicUsize::new(0) }
        }
    }

    #[async_trait]
    impl SimulationSession for ScriptedSession {
        async fn send_transaction(&self, tx: &BlockTransaction) -> Result<SimulatedReceipt> {
            match self.behaviour {
                Behaviour::Succeed => Ok(SimulatedReceipt { tx_hash: tx.hash, status: ReceiptStatus::Success, logs: vec![] }),
                Behaviour::Revert => Ok(SimulatedReceipt { tx_hash: tx.hash, status: ReceiptStatus::Reverted, logs: vec![] }),
                Behaviour::Fail => Err(SimulationError::SendTransaction("conexao perdida".into())),
                Behaviour::Hang => {
                    tokio::time::sleep(Duration::from_secs(60)).await;
                    Err(SimulationError::SendTransaction("inalcançável".into()))
                }
            }
        }

        async fn snapshot(&self) -> Result<SnapshotId> {
            let next = self.snapshots.fetch_add(1, Ordering::SeqCst);
            Ok(SnapshotId(U256::from(next)))
        }

        async fn revert(&self, _id: SnapshotId) -> Result<()> {
            Ok(())
        }

        async fn close(&self) {}
    }

    fn tx() -> BlockTransaction {
        BlockTransaction {
            hash: H256::repeat_byte(0x42),
            from: Address::repeat_byte(0x01),
            to: Some(Address::repeat_byte(0x02)),
            input: vec![0x12, 0x34, 0x56, 0x78],
            value: U256::zero(),
            gas: U256::from(100_000u64),
            gas_price: None,
            nonce: U256::zero(),
        }
    }

    #[tokio::test]
    async fn revert_is_a_receipt_not_a_fault() {
        let adapter = ExecutionAdapter::new(ScriptedSession::new(Behaviour::Revert), Duration::from_secs(1));
        match adapter.execute(&tx()).await {
            ExecutionOutcome::Receipt(r) => assert!(r.reverted()),
            ExecutionOutcome::Fault(e) => panic!("unexpected fault: {e}"),
        }
    }

    #[tokio::test]
    async fn engine_error_becomes_fault() {
        let adapter = ExecutionAdapter::new(ScriptedSession::new(Behaviour::Fail), Duration::from_secs(1));
        let outcome = adapter.execute(&tx()).await;
        assert!(matches!(outcome, ExecutionOutcome::Fault(SimulationError::SendTransaction(_))));
    }

    #[tokio::test]
    async fn success_keeps_tx_hash() {
        let adapter = ExecutionAdapter::new(ScriptedSession::new(Behaviour::Succeed), Duration::from_secs(1));
        match adapter.execute(&tx()).await {
            ExecutionOutcome::Receipt(r) => assert_eq!(r.tx_hash, H256::repeat_byte(0x42)),
            ExecutionOutcome::Fault(e) => panic!("unexpected fault: {e}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn stuck_call_times_out() {
        let adapter = ExecutionAdapter::new(ScriptedSession::new(Behaviour::Hang), Duration::from_millis(50));
        let outcome = adapter.execute(&tx()).await;
        assert!(matches!(outcome, ExecutionOutcome::Fault(SimulationError::Timeout(_))));
    }

    #[tokio::test]
    async fn checkpoints_are_forwarded() {
        let adapter = ExecutionAdapter::new(ScriptedSession::new(Behaviour::Succeed), Duration::from_secs(1));
        let first = adapter.checkpoint().await.unwrap();
        let second = adapter.checkpoint().await.unwrap();
        assert_ne!(first, second);
        adapter.rollback(first).await.unwrap();
    }
}
