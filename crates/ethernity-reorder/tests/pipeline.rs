use async_trait::async_trait;
use ethernity_core::error::{Error, Result as CoreResult};
use ethernity_core::traits::BlockProvider;
use ethernity_core::types::{BlockDescriptor, BlockStatus, BlockTransaction, Finding, StateRef};
use ethernity_reorder::{
    BalanceAggregator, FindingsStore, MemoryFindingsStore, OrderingPolicy, ReplayConfig, ReplayError,
    ReplayOrchestrator, TRANSFER_EVENT_SIGNATURE,
};
use ethernity_simulate::{
    ReceiptStatus, SimulatedReceipt, SimulationError, SimulationProvider, SimulationSession, SnapshotId,
};
use ethers::types::{Address, Bytes, Log, H256, U256};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const BLOCK: u64 = 15_000_000;

fn token() -> Address {
    Address::repeat_byte(0xee)
}

fn pool() -> Address {
    Address::repeat_byte(0x01)
}

fn recipient() -> Address {
    Address::repeat_byte(0x77)
}

fn contract_call(id: u64) -> BlockTransaction {
    BlockTransaction {
        hash: H256::from_low_u64_be(id),
        from: Address::from_low_u64_be(0x1000 + id),
        to: Some(Address::repeat_byte(0x22)),
        input: vec![0x38, 0xed, 0x17, 0x39, 0x00],
        value: U256::zero(),
        gas: U256::from(200_000u64),
        gas_price: None,
        nonce: U256::zero(),
    }
}

fn value_transfer(id: u64) -> BlockTransaction {
    BlockTransaction { input: vec![], value: U256::from(1u64), ..contract_call(id) }
}

fn token_transfer(id: u64) -> BlockTransaction {
    BlockTransaction { input: vec![0xa9, 0x05, 0x9c, 0xbb, 0x00], ..contract_call(id) }
}

#[derive(Default)]
struct MockChain {
    blocks: HashMap<u64, BlockDescriptor>,
    states: HashMap<u64, StateRef>,
    unavailable: AtomicBool,
}

impl MockChain {
    fn with_block(number: u64, transactions: Vec<BlockTransaction>) -> Self {
        let mut chain = Self::default();
        chain.add_block(number, transactions);
        chain
    }

    fn add_block(&mut self, number: u64, transactions: Vec<BlockTransaction>) {
        let parent = H256::from_low_u64_be(number - 1);
        self.states.insert(
            number - 1,
            StateRef { block_number: number - 1, block_hash: parent, state_root: H256::repeat_byte(0x5a) },
        );
        self.blocks.insert(
            number,
            BlockDescriptor { number, hash: H256::from_low_u64_be(number), parent_hash: parent, transactions },
        );
    }
}

#[async_trait]
impl BlockProvider for MockChain {
    async fn get_block(&self, block_number: u64) -> CoreResult<BlockDescriptor> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(Error::RpcError("node indisponivel".into()));
        }
        self.blocks
            .get(&block_number)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("bloco {}", block_number)))
    }

    async fn get_state_ref(&self, block_number: u64) -> CoreResult<StateRef> {
        self.states
            .get(&block_number)
            .copied()
            .ok_or_else(|| Error::NotFound(format!("estado {}", block_number)))
    }
}

/// Contadores compartilhados por todas as sessões do motor simulado
#[derive(Default)]
struct EngineLog {
    sessions: AtomicUsize,
    sends: AtomicUsize,
    closes: AtomicUsize,
    revert_failures: AtomicUsize,
    /// Estado observado no momento de cada snapshot
    snapshot_states: Mutex<Vec<Vec<H256>>>,
    /// Envio que completaria este prefixo falha no motor
    fault_prefix: Mutex<Option<Vec<H256>>>,
    /// Quantidade de sessões, a partir da primeira, que já nascem expiradas
    expired_sessions: AtomicUsize,
    /// Transações que revertem: consomem o nonce mas não emitem logs
    reverting: Mutex<HashSet<H256>>,
}

/// Motor de brinquedo: o estado é a lista de transações aplicadas e cada
/// transação paga ao destinatário `peso × posição` unidades do token
struct MockSession {
    log: Arc<EngineLog>,
    ledger: Mutex<Vec<H256>>,
    snapshots: Mutex<Vec<Vec<H256>>>,
    expired: bool,
}

fn transfer_log(value: u64) -> Log {
    let mut data = vec![0u8; 32];
    U256::from(value).to_big_endian(&mut data);
    Log {
        address: token(),
        topics: vec![TRANSFER_EVENT_SIGNATURE, H256::from(pool()), H256::from(recipient())],
        data: Bytes::from(data),
        ..Default::default()
    }
}

#[async_trait]
impl SimulationSession for MockSession {
    async fn send_transaction(&self, tx: &BlockTransaction) -> Result<SimulatedReceipt, SimulationError> {
        self.log.sends.fetch_add(1, Ordering::SeqCst);
        let mut ledger = self.ledger.lock().unwrap();
        let mut candidate = ledger.clone();
        candidate.push(tx.hash);
        if self.log.fault_prefix.lock().unwrap().as_ref() == Some(&candidate) {
            return Err(SimulationError::SendTransaction("conexao perdida".into()));
        }
        *ledger = candidate;
        if self.log.reverting.lock().unwrap().contains(&tx.hash) {
            return Ok(SimulatedReceipt { tx_hash: tx.hash, status: ReceiptStatus::Reverted, logs: vec![] });
        }
        let value = tx.hash.to_low_u64_be() * ledger.len() as u64;
        Ok(SimulatedReceipt { tx_hash: tx.hash, status: ReceiptStatus::Success, logs: vec![transfer_log(value)] })
    }

    async fn snapshot(&self) -> Result<SnapshotId, SimulationError> {
        if self.expired {
            return Err(SimulationError::SessionExpired);
        }
        let current = self.ledger.lock().unwrap().clone();
        self.log.snapshot_states.lock().unwrap().push(current.clone());
        let mut stack = self.snapshots.lock().unwrap();
        stack.push(current);
        Ok(SnapshotId(U256::from(stack.len() - 1)))
    }

    async fn revert(&self, id: SnapshotId) -> Result<(), SimulationError> {
        let failing = self
            .log
            .revert_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(SimulationError::Revert("snapshot perdido".into()));
        }
        let mut stack = self.snapshots.lock().unwrap();
        let index = id.0.as_usize();
        *self.ledger.lock().unwrap() = stack[index].clone();
        stack.truncate(index);
        Ok(())
    }

    async fn close(&self) {
        self.log.closes.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
struct MockEngines {
    log: Arc<EngineLog>,
}

#[async_trait]
impl SimulationProvider for MockEngines {
    type Session = MockSession;

    async fn create_session(&self, _pre_state: &StateRef, _timeout: Duration) -> Result<MockSession, SimulationError> {
        self.log.sessions.fetch_add(1, Ordering::SeqCst);
        let expired = self
            .log
            .expired_sessions
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        Ok(MockSession {
            log: self.log.clone(),
            ledger: Mutex::new(vec![]),
            snapshots: Mutex::new(vec![]),
            expired,
        })
    }
}

/// Armazenamento cujas escritas de findings sempre falham
#[derive(Default)]
struct FailingStore {
    inner: MemoryFindingsStore,
}

#[async_trait]
impl FindingsStore for FailingStore {
    async fn has_completed_block(&self, block_number: u64) -> CoreResult<bool> {
        self.inner.has_completed_block(block_number).await
    }

    async fn write_findings(&self, _findings: &[Finding]) -> CoreResult<()> {
        Err(Error::StorageError("disco cheio".into()))
    }

    async fn mark_block_complete(&self, status: &BlockStatus) -> CoreResult<()> {
        self.inner.mark_block_complete(status).await
    }

    async fn findings_for_block(&self, block_number: u64) -> CoreResult<Vec<Finding>> {
        self.inner.findings_for_block(block_number).await
    }

    async fn block_status(&self, block_number: u64) -> CoreResult<Option<BlockStatus>> {
        self.inner.block_status(block_number).await
    }
}

fn config(policy: OrderingPolicy, workers: usize) -> ReplayConfig {
    ReplayConfig { policy, workers, ..Default::default() }
}

fn three_calls() -> Vec<BlockTransaction> {
    vec![contract_call(1), contract_call(2), contract_call(3)]
}

fn orchestrator<S: FindingsStore + 'static>(
    chain: MockChain,
    engines: &Arc<MockEngines>,
    store: Arc<S>,
    config: ReplayConfig,
) -> ReplayOrchestrator<MockChain, MockEngines, S> {
    ReplayOrchestrator::new(Arc::new(chain), engines.clone(), store, config).unwrap()
}

#[tokio::test]
async fn full_policy_persists_every_ordering_then_status() {
    let engines = Arc::new(MockEngines::default());
    let store = Arc::new(MemoryFindingsStore::new());
    let orch = orchestrator(MockChain::with_block(BLOCK, three_calls()), &engines, store.clone(), config(OrderingPolicy::Full, 2));

    let report = orch.process_block(BLOCK).await.unwrap();
    assert!(!report.skipped);
    assert_eq!(report.orderings, 6);
    assert_eq!(report.failed, 0);

    let findings = store.findings_for_block(BLOCK).await.unwrap();
    assert_eq!(findings.len(), 6);
    let sequences: HashSet<Vec<H256>> = findings.iter().map(|f| f.transaction_hash_sequence.clone()).collect();
    assert_eq!(sequences.len(), 6);
    assert!(findings.iter().all(|f| f.transaction_hash_sequence.len() == 3 && f.is_ok()));

    let status = store.block_status(BLOCK).await.unwrap().unwrap();
    assert_eq!(status.orderings, 6);

    let series = BalanceAggregator::default().aggregate_block(store.as_ref(), BLOCK).await.unwrap();
    assert_eq!(series.len(), 1);
    assert_eq!(series[0].address, recipient());
    assert_eq!(series[0].token, token());
    assert_eq!(series[0].balances.len(), 6);
    // 1·1 + 2·2 + 3·3 na ordem original, 3·1 + 2·2 + 1·3 na inversa
    assert_eq!(series[0].balances[0], U256::from(14u64));
    assert_eq!(series[0].balances[5], U256::from(10u64));
    assert!(series[0].is_order_sensitive());
}

#[tokio::test]
async fn pairwise_policy_yields_ordered_pairs() {
    let engines = Arc::new(MockEngines::default());
    let store = Arc::new(MemoryFindingsStore::new());
    let orch = orchestrator(MockChain::with_block(BLOCK, three_calls()), &engines, store.clone(), config(OrderingPolicy::Pairwise, 3));

    orch.process_block(BLOCK).await.unwrap();
    let findings = store.findings_for_block(BLOCK).await.unwrap();
    assert_eq!(findings.len(), 6);
    assert!(findings.iter().all(|f| f.transaction_hash_sequence.len() == 2));
    assert_eq!(engines.log.sends.load(Ordering::SeqCst), 12);
}

#[tokio::test]
async fn engine_fault_marks_single_finding_failed() {
    let engines = Arc::new(MockEngines::default());
    // Quarta ordenação lexicográfica: [T2, T3, T1]
    *engines.log.fault_prefix.lock().unwrap() = Some(vec![H256::from_low_u64_be(2), H256::from_low_u64_be(3)]);
    let store = Arc::new(MemoryFindingsStore::new());
    let orch = orchestrator(MockChain::with_block(BLOCK, three_calls()), &engines, store.clone(), config(OrderingPolicy::Full, 1));

    let report = orch.process_block(BLOCK).await.unwrap();
    assert_eq!(report.failed, 1);

    let findings = store.findings_for_block(BLOCK).await.unwrap();
    assert_eq!(findings.len(), 6);
    let failed: Vec<&Finding> = findings.iter().filter(|f| !f.is_ok()).collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].ordering_index, 3);
    assert!(failed[0].error.is_some());
    assert!(failed[0].transfer_records.is_empty());
    assert!(store.has_completed_block(BLOCK).await.unwrap());
    // Um único lote, uma única escrita, mais o marcador de conclusão
    assert_eq!(store.write_count(), 2);
}

#[tokio::test]
async fn completed_block_is_skipped_without_side_effects() {
    let engines = Arc::new(MockEngines::default());
    let store = Arc::new(MemoryFindingsStore::new());
    let orch = orchestrator(MockChain::with_block(BLOCK, three_calls()), &engines, store.clone(), config(OrderingPolicy::Full, 2));

    orch.process_block(BLOCK).await.unwrap();
    let status_before = store.block_status(BLOCK).await.unwrap();
    let sends = engines.log.sends.load(Ordering::SeqCst);
    let sessions = engines.log.sessions.load(Ordering::SeqCst);
    let writes = store.write_count();

    let report = orch.process_block(BLOCK).await.unwrap();
    assert!(report.skipped);
    assert_eq!(engines.log.sends.load(Ordering::SeqCst), sends);
    assert_eq!(engines.log.sessions.load(Ordering::SeqCst), sessions);
    assert_eq!(store.write_count(), writes);
    assert_eq!(store.block_status(BLOCK).await.unwrap(), status_before);
    assert_eq!(store.findings_for_block(BLOCK).await.unwrap().len(), 6);
}

#[tokio::test]
async fn single_reorderable_tx_completes_without_engine() {
    let engines = Arc::new(MockEngines::default());
    let store = Arc::new(MemoryFindingsStore::new());
    let txs = vec![value_transfer(7), contract_call(1), token_transfer(8)];
    let orch = orchestrator(MockChain::with_block(BLOCK, txs), &engines, store.clone(), config(OrderingPolicy::Full, 4));

    let report = orch.process_block(BLOCK).await.unwrap();
    assert_eq!(report.transactions, 3);
    assert_eq!(report.reorderable, 1);
    assert_eq!(report.orderings, 0);
    assert_eq!(engines.log.sessions.load(Ordering::SeqCst), 0);
    assert!(store.findings_for_block(BLOCK).await.unwrap().is_empty());
    assert_eq!(store.block_status(BLOCK).await.unwrap().unwrap().orderings, 0);
}

#[tokio::test]
async fn simple_transfers_never_enter_orderings() {
    let engines = Arc::new(MockEngines::default());
    let store = Arc::new(MemoryFindingsStore::new());
    let txs = vec![contract_call(1), value_transfer(7), contract_call(2), token_transfer(8), contract_call(3)];
    let orch = orchestrator(MockChain::with_block(BLOCK, txs), &engines, store.clone(), config(OrderingPolicy::Full, 2));

    orch.process_block(BLOCK).await.unwrap();
    let excluded = [H256::from_low_u64_be(7), H256::from_low_u64_be(8)];
    let findings = store.findings_for_block(BLOCK).await.unwrap();
    assert_eq!(findings.len(), 6);
    assert!(findings
        .iter()
        .all(|f| f.transaction_hash_sequence.iter().all(|h| !excluded.contains(h))));
}

#[tokio::test]
async fn every_ordering_starts_from_the_same_state() {
    let engines = Arc::new(MockEngines::default());
    let store = Arc::new(MemoryFindingsStore::new());
    let orch = orchestrator(MockChain::with_block(BLOCK, three_calls()), &engines, store, config(OrderingPolicy::Full, 1));

    orch.process_block(BLOCK).await.unwrap();
    let states = engines.log.snapshot_states.lock().unwrap();
    assert_eq!(states.len(), 6);
    assert!(states.iter().all(|s| s.is_empty()));
}

#[tokio::test]
async fn workers_get_their_own_sessions() {
    let engines = Arc::new(MockEngines::default());
    let store = Arc::new(MemoryFindingsStore::new());
    let orch = orchestrator(MockChain::with_block(BLOCK, three_calls()), &engines, store.clone(), config(OrderingPolicy::Full, 4));

    orch.process_block(BLOCK).await.unwrap();
    // 6 ordenações em lotes de 2
    assert_eq!(engines.log.sessions.load(Ordering::SeqCst), 3);
    assert_eq!(engines.log.closes.load(Ordering::SeqCst), 3);
    assert_eq!(store.write_count(), 4);
}

#[tokio::test]
async fn failed_restore_recreates_session() {
    let engines = Arc::new(MockEngines::default());
    engines.log.revert_failures.store(1, Ordering::SeqCst);
    let store = Arc::new(MemoryFindingsStore::new());
    let orch = orchestrator(MockChain::with_block(BLOCK, three_calls()), &engines, store.clone(), config(OrderingPolicy::Full, 1));

    let report = orch.process_block(BLOCK).await.unwrap();
    assert_eq!(report.failed, 0);
    assert_eq!(engines.log.sessions.load(Ordering::SeqCst), 2);
    assert!(engines.log.snapshot_states.lock().unwrap().iter().all(|s| s.is_empty()));
    assert_eq!(store.findings_for_block(BLOCK).await.unwrap().len(), 6);
}

#[tokio::test]
async fn expired_session_retries_ordering_in_fresh_session() {
    let engines = Arc::new(MockEngines::default());
    engines.log.expired_sessions.store(1, Ordering::SeqCst);
    let store = Arc::new(MemoryFindingsStore::new());
    let txs = vec![contract_call(1), contract_call(2)];
    let orch = orchestrator(MockChain::with_block(BLOCK, txs), &engines, store.clone(), config(OrderingPolicy::Full, 1));

    let report = orch.process_block(BLOCK).await.unwrap();
    assert_eq!(report.orderings, 2);
    assert_eq!(report.failed, 0);

    let findings = store.findings_for_block(BLOCK).await.unwrap();
    assert_eq!(findings.len(), 2);
    assert!(findings.iter().all(|f| f.is_ok() && f.transfer_records.len() == 2));
    assert_eq!(engines.log.sessions.load(Ordering::SeqCst), 2);
    assert_eq!(engines.log.sends.load(Ordering::SeqCst), 4);
    assert_eq!(engines.log.closes.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn ordering_fails_only_when_retry_snapshot_also_fails() {
    let engines = Arc::new(MockEngines::default());
    engines.log.expired_sessions.store(2, Ordering::SeqCst);
    let store = Arc::new(MemoryFindingsStore::new());
    let txs = vec![contract_call(1), contract_call(2)];
    let orch = orchestrator(MockChain::with_block(BLOCK, txs), &engines, store.clone(), config(OrderingPolicy::Full, 1));

    let report = orch.process_block(BLOCK).await.unwrap();
    assert_eq!(report.failed, 1);

    let mut findings = store.findings_for_block(BLOCK).await.unwrap();
    findings.sort_by_key(|f| f.ordering_index);
    assert!(!findings[0].is_ok());
    assert_eq!(findings[0].error.as_deref(), Some("sessao expirada"));
    assert_eq!(findings[0].transaction_hash_sequence.len(), 2);
    assert!(findings[1].is_ok());
    // Sessão original, a da nova tentativa e a recriada após a falha
    assert_eq!(engines.log.sessions.load(Ordering::SeqCst), 3);
    assert_eq!(engines.log.sends.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn reverted_tx_is_recorded_without_transfers() {
    let engines = Arc::new(MockEngines::default());
    let reverted = H256::from_low_u64_be(2);
    engines.log.reverting.lock().unwrap().insert(reverted);
    let store = Arc::new(MemoryFindingsStore::new());
    let orch = orchestrator(MockChain::with_block(BLOCK, three_calls()), &engines, store.clone(), config(OrderingPolicy::Full, 2));

    let report = orch.process_block(BLOCK).await.unwrap();
    assert_eq!(report.failed, 0);

    let findings = store.findings_for_block(BLOCK).await.unwrap();
    assert_eq!(findings.len(), 6);
    for finding in &findings {
        assert!(finding.is_ok());
        assert_eq!(finding.reverted, vec![reverted]);
        assert_eq!(finding.transfer_records.len(), 2);
        assert!(finding.transfer_records.iter().all(|r| r.tx_hash != reverted));
    }
}

#[tokio::test]
async fn engine_fault_discards_partial_reverts() {
    let engines = Arc::new(MockEngines::default());
    engines.log.reverting.lock().unwrap().insert(H256::from_low_u64_be(2));
    // [T2, T3, T1]: T2 reverte e o motor cai ao enviar T3
    *engines.log.fault_prefix.lock().unwrap() = Some(vec![H256::from_low_u64_be(2), H256::from_low_u64_be(3)]);
    let store = Arc::new(MemoryFindingsStore::new());
    let orch = orchestrator(MockChain::with_block(BLOCK, three_calls()), &engines, store.clone(), config(OrderingPolicy::Full, 1));

    orch.process_block(BLOCK).await.unwrap();
    let findings = store.findings_for_block(BLOCK).await.unwrap();
    let failed: Vec<&Finding> = findings.iter().filter(|f| !f.is_ok()).collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].ordering_index, 3);
    assert!(failed[0].reverted.is_empty());
    assert!(failed[0].transfer_records.is_empty());
    // [T2, T1, T3] também contém T2 mas termina normalmente
    let kept = findings.iter().find(|f| f.ordering_index == 2).unwrap();
    assert!(kept.is_ok());
    assert_eq!(kept.reverted, vec![H256::from_low_u64_be(2)]);
}

#[tokio::test]
async fn store_failure_leaves_block_incomplete() {
    let engines = Arc::new(MockEngines::default());
    let store = Arc::new(FailingStore::default());
    let orch = orchestrator(MockChain::with_block(BLOCK, three_calls()), &engines, store.clone(), config(OrderingPolicy::Full, 2));

    let err = orch.process_block(BLOCK).await.unwrap_err();
    assert!(matches!(err, ReplayError::Core(Error::StorageError(_))));
    assert!(store.block_status(BLOCK).await.unwrap().is_none());
}

#[tokio::test]
async fn unavailable_node_is_surfaced() {
    let engines = Arc::new(MockEngines::default());
    let store = Arc::new(MemoryFindingsStore::new());
    let chain = MockChain::with_block(BLOCK, three_calls());
    chain.unavailable.store(true, Ordering::SeqCst);
    let orch = orchestrator(chain, &engines, store.clone(), config(OrderingPolicy::Full, 2));

    let err = orch.process_block(BLOCK).await.unwrap_err();
    assert!(matches!(err, ReplayError::Core(Error::RpcError(_))));
    assert_eq!(engines.log.sessions.load(Ordering::SeqCst), 0);
    assert_eq!(store.write_count(), 0);
}

#[tokio::test]
async fn mismatched_parent_state_is_rejected() {
    let engines = Arc::new(MockEngines::default());
    let store = Arc::new(MemoryFindingsStore::new());
    let mut chain = MockChain::with_block(BLOCK, three_calls());
    if let Some(state) = chain.states.get_mut(&(BLOCK - 1)) {
        state.block_hash = H256::repeat_byte(0xff);
    }
    let orch = orchestrator(chain, &engines, store.clone(), config(OrderingPolicy::Full, 2));

    let err = orch.process_block(BLOCK).await.unwrap_err();
    assert!(matches!(err, ReplayError::MissingPreState(BLOCK)));
    assert!(store.block_status(BLOCK).await.unwrap().is_none());
}

#[tokio::test]
async fn ordering_cap_aborts_before_replay() {
    let engines = Arc::new(MockEngines::default());
    let store = Arc::new(MemoryFindingsStore::new());
    let capped = ReplayConfig { max_orderings: Some(5), ..config(OrderingPolicy::Full, 2) };
    let orch = orchestrator(MockChain::with_block(BLOCK, three_calls()), &engines, store.clone(), capped);

    let err = orch.process_block(BLOCK).await.unwrap_err();
    assert!(matches!(err, ReplayError::OrderingSpaceTooLarge { transactions: 3, .. }));
    assert_eq!(engines.log.sessions.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn range_run_skips_completed_blocks() {
    let engines = Arc::new(MockEngines::default());
    let store = Arc::new(MemoryFindingsStore::new());
    let mut chain = MockChain::with_block(BLOCK, three_calls());
    chain.add_block(BLOCK + 1, vec![contract_call(4), contract_call(5)]);
    let orch = orchestrator(chain, &engines, store.clone(), config(OrderingPolicy::Full, 2));

    orch.process_block(BLOCK).await.unwrap();
    let reports = orch.process_range(BLOCK..=BLOCK + 1).await.unwrap();
    assert_eq!(reports.len(), 2);
    assert!(reports[0].skipped);
    assert_eq!(reports[1].orderings, 2);
    assert!(store.has_completed_block(BLOCK + 1).await.unwrap());
}

#[tokio::test]
async fn invalid_config_is_rejected_up_front() {
    let engines = Arc::new(MockEngines::default());
    let store = Arc::new(MemoryFindingsStore::new());
    let result = ReplayOrchestrator::new(
        Arc::new(MockChain::default()),
        engines,
        store,
        config(OrderingPolicy::Full, 0),
    );
    assert!(matches!(result, Err(ReplayError::Config(_))));
}
