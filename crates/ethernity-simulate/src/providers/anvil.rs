use std::time::{Duration, Instant};

use async_trait::async_trait;
use ethernity_core::types::{BlockTransaction, StateRef};
use ethers::providers::{Http, Middleware, Provider};
use ethers::types::{TransactionRequest, U256};
use ethers::utils::{Anvil, AnvilInstance};
use tokio::sync::Mutex;
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::{
    errors::{Result, SimulationError},
    traits::{ReceiptStatus, SimulatedReceipt, SimulationProvider, SimulationSession, SnapshotId},
};

/// Sessão de simulação utilizando o Anvil
pub struct AnvilSession {
    pub id: Uuid,
    provider: Provider<Http>,
    anvil: Option<AnvilInstance>,
    created: Instant,
    timeout: Duration,
    closed: bool,
}

impl AnvilSession {
    fn expired(&self) -> bool {
        self.created.elapsed() > self.timeout
    }
}

/// Monta a requisição enviada ao fork a partir da transação original.
/// O nonce fica a cargo do Anvil, já que a ordem das transações muda.
fn to_request(tx: &BlockTransaction) -> TransactionRequest {
    let mut request = TransactionRequest::new()
        .from(tx.from)
        .data(tx.input.clone())
        .value(tx.value)
        .gas(tx.gas);
    if let Some(to) = tx.to {
        request = request.to(to);
    }
    if let Some(price) = tx.gas_price {
        request = request.gas_price(price);
    }
    request
}

/// Retorna o provider da sessão se ela ainda puder ser usada
async fn live_provider(session: &Mutex<AnvilSession>) -> Result<Provider<Http>> {
    let guard = session.lock().await;
    if guard.closed {
        warn!(session = %guard.id, "tentativa de uso de sessao encerrada");
        return Err(SimulationError::SessionClosed);
    }
    if guard.expired() {
        warn!(session = %guard.id, "sessao expirada");
        return Err(SimulationError::SessionExpired);
    }
    Ok(guard.provider.clone())
}

#[async_trait]
impl SimulationSession for Mutex<AnvilSession> {
    async fn send_transaction(&self, tx: &BlockTransaction) -> Result<SimulatedReceipt> {
        let provider = live_provider(self).await?;

        let pending = match provider.send_transaction(to_request(tx), None).await {
            Ok(p) => p,
            Err(e) => {
                error!(tx = ?tx.hash, "falha ao enviar transacao: {}", e);
                return Err(SimulationError::SendTransaction(e.to_string()));
            }
        };

        let receipt = match pending.await {
            Ok(opt) => match opt {
                Some(r) => r,
                None => {
                    error!(tx = ?tx.hash, "falha ao aguardar transacao: sem recibo");
                    return Err(SimulationError::AwaitTransaction("sem recibo".into()));
                }
            },
            Err(e) => {
                error!(tx = ?tx.hash, "falha ao aguardar transacao: {}", e);
                return Err(SimulationError::AwaitTransaction(e.to_string()));
            }
        };

        let status = match receipt.status.map(|s| s.as_u64()) {
            Some(0) => ReceiptStatus::Reverted,
            _ => ReceiptStatus::Success,
        };
        Ok(SimulatedReceipt {
            tx_hash: tx.hash,
            status,
            logs: receipt.logs,
        })
    }

    async fn snapshot(&self) -> Result<SnapshotId> {
        let provider = live_provider(self).await?;
        let id = provider
            .request::<_, U256>("evm_snapshot", ())
            .await
            .map_err(|e| SimulationError::Snapshot(e.to_string()))?;
        debug!(snapshot = %id, "snapshot registrado");
        Ok(SnapshotId(id))
    }

    async fn revert(&self, id: SnapshotId) -> Result<()> {
        let provider = live_provider(self).await?;
        let reverted = provider
            .request::<_, bool>("evm_revert", [id.0])
            .await
            .map_err(|e| SimulationError::Revert(e.to_string()))?;
        if !reverted {
            return Err(SimulationError::Revert(format!("snapshot {} desconhecido", id.0)));
        }
        Ok(())
    }

    async fn close(&self) {
        let mut guard = self.lock().await;
        if guard.closed {
            warn!(session = %guard.id, "tentativa de encerrar sessao ja fechada");
            return;
        }
        guard.closed = true;
        if let Some(anvil) = guard.anvil.take() {
            drop(anvil);
        }
    }
}

/// Provider que cria forks Anvil a partir de um node remoto
pub struct AnvilProvider {
    rpc_url: String,
}

impl AnvilProvider {
    pub fn new(rpc_url: impl Into<String>) -> Self {
        Self { rpc_url: rpc_url.into() }
    }
}

#[async_trait]
impl SimulationProvider for AnvilProvider {
    type Session = Mutex<AnvilSession>;

    async fn create_session(&self, pre_state: &StateRef, timeout: Duration) -> Result<Self::Session> {
        let builder = Anvil::new()
            .fork(self.rpc_url.clone())
            .fork_block_number(pre_state.block_number)
            .args(["--auto-impersonate".to_string()]);

        // `spawn` bloqueia até o processo responder e entra em pânico se falhar
        let anvil = match tokio::task::spawn_blocking(move || builder.spawn()).await {
            Ok(anvil) => anvil,
            Err(e) => {
                error!("falha ao iniciar anvil: {}", e);
                return Err(SimulationError::AnvilSpawn(e.to_string()));
            }
        };

        let provider = match Provider::<Http>::try_from(anvil.endpoint()) {
            Ok(p) => p.interval(Duration::from_millis(1)),
            Err(e) => {
                error!("falha ao criar provider do anvil: {}", e);
                return Err(SimulationError::ProviderCreation(e.to_string()));
            }
        };

        let id = Uuid::new_v4();
        debug!(session = %id, fork_block = pre_state.block_number, "sessao anvil criada");
        Ok(Mutex::new(AnvilSession {
            id,
            provider,
            anvil: Some(anvil),
            created: Instant::now(),
            timeout,
            closed: false,
        }))
    }
}
