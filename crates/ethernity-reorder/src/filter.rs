//! Filtros que removem do conjunto reordenável as transações sem interesse
//! para MEV. Os filtros são encadeados em um pipeline; cada um decide se a
//! transação segue adiante ou é descartada. O resultado preserva a ordem
//! original do bloco.

use ethernity_core::types::BlockTransaction;
use std::collections::HashSet;

/// Seletor de `transfer(address,uint256)` do ERC-20
pub const ERC20_TRANSFER_SELECTOR: [u8; 4] = [0xa9, 0x05, 0x9c, 0xbb];

/// Classe atribuída a cada transação do bloco
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TxClass {
    /// Transferência nativa, calldata vazio
    ValueTransfer,
    /// Chamada simples de transferência de token
    TokenTransfer,
    /// Qualquer outra interação com contrato
    ContractCall,
}

/// Classifica uma transação pelo calldata
pub fn classify(tx: &BlockTransaction) -> TxClass {
    if tx.input.is_empty() {
        return TxClass::ValueTransfer;
    }
    match tx.selector() {
        Some(sel) if sel == ERC20_TRANSFER_SELECTOR => TxClass::TokenTransfer,
        _ => TxClass::ContractCall,
    }
}

/// Trait para filtros de transações do bloco
pub trait TxFilter: Send + Sync {
    /// `true` quando a transação deve permanecer no conjunto reordenável
    fn keep(&self, tx: &BlockTransaction) -> bool;
}

/// Descarta transferências nativas de valor
pub struct ValueTransferFilter;

impl TxFilter for ValueTransferFilter {
    fn keep(&self, tx: &BlockTransaction) -> bool {
        classify(tx) != TxClass::ValueTransfer
    }
}

/// Descarta transações cujo seletor esteja no conjunto informado
pub struct SelectorFilter {
    excluded: HashSet<[u8; 4]>,
}

impl SelectorFilter {
    pub fn new<I: IntoIterator<Item = [u8; 4]>>(selectors: I) -> Self {
        Self {
            excluded: selectors.into_iter().collect(),
        }
    }

    /// Filtro padrão para transferências simples de token
    pub fn erc20_transfers() -> Self {
        Self::new([ERC20_TRANSFER_SELECTOR])
    }
}

impl TxFilter for SelectorFilter {
    fn keep(&self, tx: &BlockTransaction) -> bool {
        match tx.selector() {
            Some(sel) => !self.excluded.contains(&sel),
            None => true,
        }
    }
}

/// Pipeline de filtros executados em sequência
pub struct FilterPipeline {
    filters: Vec<Box<dyn TxFilter>>,
}

impl Default for FilterPipeline {
    fn default() -> Self {
        Self::new()
            .push(ValueTransferFilter)
            .push(SelectorFilter::erc20_transfers())
    }
}

impl FilterPipeline {
    /// Cria pipeline vazio
    pub fn new() -> Self {
        Self { filters: Vec::new() }
    }

    /// Adiciona um filtro ao pipeline
    pub fn push<F: TxFilter + 'static>(mut self, filter: F) -> Self {
        self.filters.push(Box::new(filter));
        self
    }

    pub fn keep(&self, tx: &BlockTransaction) -> bool {
        self.filters.iter().all(|f| f.keep(tx))
    }

    /// Aplica os filtros ao bloco, mantendo a ordem original
    pub fn apply(&self, transactions: &[BlockTransaction]) -> Vec<BlockTransaction> {
        transactions.iter().filter(|tx| self.keep(tx)).cloned().collect()
    }
}
