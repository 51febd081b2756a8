use async_trait::async_trait;
use ethernity_core::types::{BlockTransaction, StateRef, TransactionHash};
use ethers::types::{Log, U256};
use std::time::Duration;

use crate::errors::Result;

/// Identificador de um snapshot de estado dentro de uma sessão
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SnapshotId(pub U256);

/// Situação de execução reportada pelo recibo
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReceiptStatus {
    Success,
    /// Revert é um resultado normal de execução, não uma falha do motor
    Reverted,
}

/// Recibo normalizado de uma transação simulada
#[derive(Debug, Clone)]
pub struct SimulatedReceipt {
    pub tx_hash: TransactionHash,
    pub status: ReceiptStatus,
    pub logs: Vec<Log>,
}

impl SimulatedReceipt {
    pub fn reverted(&self) -> bool {
        self.status == ReceiptStatus::Reverted
    }
}

#[async_trait]
pub trait SimulationSession: Send + Sync {
    /// Envia uma transação para a sessão simulada, alterando seu estado
    async fn send_transaction(&self, tx: &BlockTransaction) -> Result<SimulatedReceipt>;

    /// Registra o estado atual e retorna o identificador do snapshot
    async fn snapshot(&self) -> Result<SnapshotId>;

    /// Restaura o estado registrado em `id`, desfazendo toda mutação posterior
    async fn revert(&self, id: SnapshotId) -> Result<()>;

    /// Encerra a sessão
    async fn close(&self);
}

#[async_trait]
pub trait SimulationProvider: Send + Sync {
    type Session: SimulationSession;

    /// Cria uma nova sessão a partir do estado anterior ao bloco
    async fn create_session(&self, pre_state: &StateRef, timeout: Duration) -> Result<Self::Session>;
}
