//! Orquestração da reexecução de um bloco sob ordenações alternativas.
//!
//! Por bloco: `pending → filtering → generating → batching → replaying →
//! finalizing → done`, com atalho `pending → done` quando o registro de
//! conclusão já existe. Cada worker possui sua própria sessão do motor e
//! isola cada ordenação com snapshot/restore. O registro de conclusão só é
//! escrito depois que todos os workers terminaram e persistiram seus lotes.

use std::ops::RangeInclusive;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use ethernity_core::traits::BlockProvider;
use ethernity_core::types::{BlockStatus, BlockTransaction, Finding, FindingStatus, StateRef};
use ethernity_simulate::{ExecutionAdapter, ExecutionOutcome, SimulationError, SimulationProvider, SimulationSession};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::config::ReplayConfig;
use crate::error::{ReplayError, Result};
use crate::extractor::extract_transfers;
use crate::filter::FilterPipeline;
use crate::ordering::{partition, OrderingBatch, OrderingGenerator, TxOrdering};
use crate::traits::FindingsStore;

/// Estágios do processamento de um bloco
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockStage {
    Pending,
    Filtering,
    Generating,
    Batching,
    Replaying,
    Finalizing,
    Done,
}

impl BlockStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockStage::Pending => "pending",
            BlockStage::Filtering => "filtering",
            BlockStage::Generating => "generating",
            BlockStage::Batching => "batching",
            BlockStage::Replaying => "replaying",
            BlockStage::Finalizing => "finalizing",
            BlockStage::Done => "done",
        }
    }
}

fn enter(block_number: u64, stage: BlockStage) {
    debug!(block = block_number, stage = stage.as_str(), "transicao de estagio");
}

/// Resumo do processamento de um bloco
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockReport {
    pub block_number: u64,
    /// Bloco já concluído em execução anterior
    pub skipped: bool,
    pub transactions: usize,
    pub reorderable: usize,
    pub orderings: u64,
    pub failed: u64,
    pub duration: Duration,
}

impl BlockReport {
    fn skipped(block_number: u64) -> Self {
        Self {
            block_number,
            skipped: true,
            transactions: 0,
            reorderable: 0,
            orderings: 0,
            failed: 0,
            duration: Duration::ZERO,
        }
    }
}

/// Dados somente leitura compartilhados pelos workers de um bloco
struct BlockJob {
    block_number: u64,
    pre_state: StateRef,
    transactions: Vec<BlockTransaction>,
    generator: OrderingGenerator,
    call_timeout: Duration,
    session_timeout: Duration,
}

#[derive(Debug, Default)]
struct WorkerSummary {
    findings: u64,
    failed: u64,
}

pub struct ReplayOrchestrator<B, P, S> {
    blocks: Arc<B>,
    engines: Arc<P>,
    store: Arc<S>,
    filter: Arc<FilterPipeline>,
    config: ReplayConfig,
}

impl<B, P, S> ReplayOrchestrator<B, P, S>
where
    B: BlockProvider + 'static,
    P: SimulationProvider + 'static,
    P::Session: 'static,
    S: FindingsStore + 'static,
{
    pub fn new(blocks: Arc<B>, engines: Arc<P>, store: Arc<S>, config: ReplayConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            blocks,
            engines,
            store,
            filter: Arc::new(FilterPipeline::default()),
            config,
        })
    }

    /// Substitui o pipeline de filtros padrão
    pub fn with_filter(mut self, filter: FilterPipeline) -> Self {
        self.filter = Arc::new(filter);
        self
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn config(&self) -> &ReplayConfig {
        &self.config
    }

    /// Processa os blocos do intervalo em ordem crescente, parando no primeiro erro
    pub async fn process_range(&self, range: RangeInclusive<u64>) -> Result<Vec<BlockReport>> {
        let mut reports = Vec::new();
        for block_number in range {
            reports.push(self.process_block(block_number).await?);
        }
        Ok(reports)
    }

    /// Reexecuta um bloco sob todas as ordenações da política configurada
    pub async fn process_block(&self, block_number: u64) -> Result<BlockReport> {
        let started = Instant::now();
        enter(block_number, BlockStage::Pending);

        if self.store.has_completed_block(block_number).await? {
            info!(block = block_number, "bloco ja concluido, ignorando");
            enter(block_number, BlockStage::Done);
            return Ok(BlockReport::skipped(block_number));
        }

        info!(block = block_number, policy = %self.config.policy, "processando bloco");
        enter(block_number, BlockStage::Filtering);
        if block_number == 0 {
            return Err(ReplayError::MissingPreState(block_number));
        }
        let block = self.blocks.get_block(block_number).await?;
        let pre_state = self.blocks.get_state_ref(block_number - 1).await?;
        if pre_state.block_hash != block.parent_hash {
            warn!(
                block = block_number,
                parent = ?block.parent_hash,
                state = ?pre_state.block_hash,
                "estado anterior nao corresponde ao pai do bloco"
            );
            return Err(ReplayError::MissingPreState(block_number));
        }
        let transactions = self.filter.apply(&block.transactions);
        info!(
            block = block_number,
            total = block.transactions.len(),
            reorderable = transactions.len(),
            "transacoes filtradas"
        );

        enter(block_number, BlockStage::Generating);
        let generator = self.config.policy.generator(transactions.len());
        let too_large = || ReplayError::OrderingSpaceTooLarge {
            transactions: transactions.len(),
            policy: self.config.policy,
        };
        let total = generator.count().ok_or_else(too_large)?;
        if matches!(self.config.max_orderings, Some(max) if total > max) {
            return Err(too_large());
        }

        enter(block_number, BlockStage::Batching);
        let batches = partition(total, self.config.workers);
        debug!(block = block_number, orderings = total, batches = batches.len(), "lotes definidos");

        enter(block_number, BlockStage::Replaying);
        let reorderable = transactions.len();
        let job = Arc::new(BlockJob {
            block_number,
            pre_state,
            transactions,
            generator,
            call_timeout: self.config.call_timeout,
            session_timeout: self.config.session_timeout,
        });
        let summary = self.replay_batches(job, batches).await?;

        enter(block_number, BlockStage::Finalizing);
        let duration = started.elapsed();
        self.store
            .mark_block_complete(&BlockStatus {
                block_number,
                execution_duration_ms: duration.as_millis() as u64,
                completed_at: Utc::now(),
                orderings: total,
            })
            .await?;

        enter(block_number, BlockStage::Done);
        info!(
            block = block_number,
            orderings = summary.findings,
            failed = summary.failed,
            elapsed_ms = duration.as_millis() as u64,
            "bloco concluido"
        );
        Ok(BlockReport {
            block_number,
            skipped: false,
            transactions: block.transactions.len(),
            reorderable,
            orderings: total,
            failed: summary.failed,
            duration,
        })
    }

    /// Dispara um worker por lote e aguarda todos antes de retornar
    async fn replay_batches(&self, job: Arc<BlockJob>, batches: Vec<OrderingBatch>) -> Result<WorkerSummary> {
        let mut set = JoinSet::new();
        for (worker, batch) in batches.into_iter().enumerate() {
            let engines = self.engines.clone();
            let store = self.store.clone();
            let job = job.clone();
            set.spawn(async move { run_worker(worker, engines, store, job, batch).await });
        }

        // Barreira: nenhum erro interrompe a espera pelos demais workers
        let mut summary = WorkerSummary::default();
        let mut first_error = None;
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(Ok(done)) => {
                    summary.findings += done.findings;
                    summary.failed += done.failed;
                }
                Ok(Err(e)) => {
                    warn!(block = job.block_number, error = %e, "worker falhou");
                    first_error.get_or_insert(e);
                }
                Err(e) => {
                    warn!(block = job.block_number, error = %e, "worker abortado");
                    first_error.get_or_insert(ReplayError::Worker(e.to_string()));
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(summary),
        }
    }
}

async fn open_adapter<P: SimulationProvider>(engines: &P, job: &BlockJob) -> Result<ExecutionAdapter<P::Session>> {
    let session = engines.create_session(&job.pre_state, job.session_timeout).await?;
    Ok(ExecutionAdapter::new(session, job.call_timeout))
}

/// Sessão do motor mantida por um worker, renovada antes de expirar
struct WorkerSession<T> {
    adapter: ExecutionAdapter<T>,
    opened: Instant,
}

impl<T: SimulationSession> WorkerSession<T> {
    async fn open<P>(engines: &P, job: &BlockJob) -> Result<Self>
    where
        P: SimulationProvider<Session = T>,
    {
        Ok(Self {
            adapter: open_adapter(engines, job).await?,
            opened: Instant::now(),
        })
    }

    /// Encerra a sessão atual e abre outra sobre o mesmo estado anterior
    async fn reopen<P>(&mut self, engines: &P, job: &BlockJob) -> Result<()>
    where
        P: SimulationProvider<Session = T>,
    {
        self.adapter.close().await;
        self.adapter = open_adapter(engines, job).await?;
        self.opened = Instant::now();
        Ok(())
    }

    /// Sessão dentro do último décimo da validade
    fn near_expiry(&self, timeout: Duration) -> bool {
        self.opened.elapsed() >= timeout.saturating_sub(timeout / 10)
    }
}

async fn run_worker<P, S>(
    worker: usize,
    engines: Arc<P>,
    store: Arc<S>,
    job: Arc<BlockJob>,
    batch: OrderingBatch,
) -> Result<WorkerSummary>
where
    P: SimulationProvider,
    S: FindingsStore,
{
    debug!(block = job.block_number, worker, start = batch.start, len = batch.len, "worker iniciado");
    let mut session = WorkerSession::open(engines.as_ref(), &job).await?;
    let mut findings = Vec::with_capacity(batch.len as usize);

    for ordering in job.generator.batch(batch) {
        if session.near_expiry(job.session_timeout) {
            debug!(block = job.block_number, worker, "renovando sessao do motor");
            session.reopen(engines.as_ref(), &job).await?;
        }

        let mut replay = replay_isolated(&session.adapter, &job, &ordering).await;
        if let Replay::NotStarted(e) = &replay {
            warn!(
                block = job.block_number,
                worker,
                ordering = ordering.index,
                error = %e,
                "snapshot indisponivel, repetindo ordenacao em nova sessao"
            );
            session.reopen(engines.as_ref(), &job).await?;
            replay = replay_isolated(&session.adapter, &job, &ordering).await;
        }

        let restored = match replay {
            Replay::Completed { finding, restored } => {
                findings.push(finding);
                restored
            }
            Replay::NotStarted(e) => {
                let mut finding = empty_finding(&job, &ordering);
                finding.status = FindingStatus::Failed;
                finding.error = Some(e.to_string());
                findings.push(finding);
                false
            }
        };
        if !restored {
            warn!(block = job.block_number, worker, ordering = ordering.index, "recriando sessao do motor");
            session.reopen(engines.as_ref(), &job).await?;
        }
    }
    session.adapter.close().await;

    let failed = findings.iter().filter(|f| !f.is_ok()).count() as u64;
    store.write_findings(&findings).await?;
    debug!(block = job.block_number, worker, findings = findings.len(), failed, "lote persistido");

    Ok(WorkerSummary {
        findings: findings.len() as u64,
        failed,
    })
}

/// Resultado de uma tentativa de reexecução isolada
enum Replay {
    /// O snapshot não pôde ser criado e nada foi executado
    NotStarted(SimulationError),
    /// `restored` indica se o motor voltou ao snapshot inicial
    Completed { finding: Finding, restored: bool },
}

fn empty_finding(job: &BlockJob, ordering: &TxOrdering) -> Finding {
    Finding {
        block_number: job.block_number,
        ordering_index: ordering.index,
        transaction_hash_sequence: ordering.positions.iter().map(|p| job.transactions[*p].hash).collect(),
        transfer_records: Vec::new(),
        reverted: Vec::new(),
        execution_duration_ms: 0,
        status: FindingStatus::Ok,
        error: None,
    }
}

/// Reexecuta uma ordenação entre snapshot e restore
async fn replay_isolated<T: SimulationSession>(
    adapter: &ExecutionAdapter<T>,
    job: &BlockJob,
    ordering: &TxOrdering,
) -> Replay {
    let started = Instant::now();
    let snapshot = match adapter.checkpoint().await {
        Ok(id) => id,
        Err(e) => {
            warn!(block = job.block_number, ordering = ordering.index, error = %e, "falha ao criar snapshot");
            return Replay::NotStarted(e);
        }
    };

    let mut finding = empty_finding(job, ordering);
    for tx in ordering.positions.iter().map(|p| &job.transactions[*p]) {
        match adapter.execute(tx).await {
            ExecutionOutcome::Receipt(receipt) => {
                if receipt.reverted() {
                    finding.reverted.push(tx.hash);
                }
                finding
                    .transfer_records
                    .extend(extract_transfers(&receipt, ordering.index));
            }
            ExecutionOutcome::Fault(e) => {
                finding.status = FindingStatus::Failed;
                finding.error = Some(e.to_string());
                finding.transfer_records.clear();
                finding.reverted.clear();
                break;
            }
        }
    }

    let restored = match adapter.rollback(snapshot).await {
        Ok(()) => true,
        Err(e) => {
            warn!(block = job.block_number, ordering = ordering.index, error = %e, "falha ao restaurar snapshot");
            false
        }
    };

    finding.execution_duration_ms = started.elapsed().as_millis() as u64;
    Replay::Completed { finding, restored }
}
