//! Agregação dos findings de um bloco em séries de saldo por
//! (destinatário, token), uma posição por ordenação.

use std::collections::{BTreeMap, HashMap, HashSet};

use ethernity_core::error::Result;
use ethernity_core::traits::TokenMetadataProvider;
use ethernity_core::types::{Finding, TokenInfo, TransactionHash};
use ethernity_core::utils::format_token_amount;
use ethereum_types::{Address, U256};
use serde::Serialize;
use tracing::{debug, warn};

use crate::traits::FindingsStore;

/// Saldos acumulados de um destinatário em um token, por ordenação
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BalanceSeries {
    pub block_number: u64,
    pub address: Address,
    pub token: Address,
    /// Índice da ordenação correspondente a cada posição de `balances`
    pub ordering_indices: Vec<u64>,
    /// Unidades base do token
    pub balances: Vec<U256>,
}

impl BalanceSeries {
    pub fn min(&self) -> U256 {
        self.balances.iter().copied().min().unwrap_or_default()
    }

    pub fn max(&self) -> U256 {
        self.balances.iter().copied().max().unwrap_or_default()
    }

    pub fn spread(&self) -> U256 {
        self.max() - self.min()
    }

    /// O valor capturado muda conforme a ordem das transações
    pub fn is_order_sensitive(&self) -> bool {
        !self.spread().is_zero()
    }
}

/// Série pronta para exibição, com valores convertidos por `decimals`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedSeries {
    pub block_number: u64,
    pub address: Address,
    pub token: TokenInfo,
    pub label: String,
    pub balances: Vec<String>,
    pub order_sensitive: bool,
}

#[derive(Debug, Clone, Default)]
pub struct BalanceAggregator {
    /// Findings com menos transferências que isso são ignorados
    pub min_transfers: usize,
}

impl BalanceAggregator {
    pub fn new(min_transfers: usize) -> Self {
        Self { min_transfers }
    }

    /// Findings válidos, sem duplicatas de ordenação, na ordem dos índices
    fn usable<'a>(&self, block_number: u64, findings: &'a [Finding]) -> Vec<&'a Finding> {
        let mut seen: HashSet<&[TransactionHash]> = HashSet::new();
        let mut kept: Vec<&Finding> = findings
            .iter()
            .filter(|f| f.block_number == block_number && f.is_ok())
            .filter(|f| f.transfer_records.len() >= self.min_transfers)
            .filter(|f| seen.insert(f.transaction_hash_sequence.as_slice()))
            .collect();
        kept.sort_by_key(|f| f.ordering_index);
        kept
    }

    /// Constrói uma série por (destinatário, token) presente nos findings
    pub fn aggregate(&self, block_number: u64, findings: &[Finding]) -> Vec<BalanceSeries> {
        let kept = self.usable(block_number, findings);
        let ordering_indices: Vec<u64> = kept.iter().map(|f| f.ordering_index).collect();

        let mut sums: BTreeMap<(Address, Address), Vec<U256>> = BTreeMap::new();
        for (slot, finding) in kept.iter().enumerate() {
            for record in &finding.transfer_records {
                let balances = sums
                    .entry((record.to, record.token_address))
                    .or_insert_with(|| vec![U256::zero(); kept.len()]);
                balances[slot] = balances[slot].saturating_add(record.value);
            }
        }

        debug!(
            block = block_number,
            findings = findings.len(),
            used = kept.len(),
            series = sums.len(),
            "findings agregados"
        );

        sums.into_iter()
            .map(|((address, token), balances)| BalanceSeries {
                block_number,
                address,
                token,
                ordering_indices: ordering_indices.clone(),
                balances,
            })
            .collect()
    }

    /// Lê os findings do bloco no armazenamento e agrega
    pub async fn aggregate_block<S: FindingsStore + ?Sized>(
        &self,
        store: &S,
        block_number: u64,
    ) -> Result<Vec<BalanceSeries>> {
        let findings = store.findings_for_block(block_number).await?;
        Ok(self.aggregate(block_number, &findings))
    }

    /// Resolve metadados uma vez por token e formata os saldos
    pub async fn render<M: TokenMetadataProvider + ?Sized>(
        &self,
        series: &[BalanceSeries],
        metadata: &M,
    ) -> Vec<RenderedSeries> {
        let mut tokens: HashMap<Address, TokenInfo> = HashMap::new();
        let mut rendered = Vec::with_capacity(series.len());

        for s in series {
            let info = match tokens.get(&s.token) {
                Some(info) => info.clone(),
                None => {
                    let info = match metadata.token_info(s.token).await {
                        Ok(info) => info,
                        Err(e) => {
                            warn!(token = ?s.token, error = %e, "metadados do token indisponiveis");
                            TokenInfo {
                                address: s.token,
                                name: None,
                                symbol: None,
                                decimals: None,
                            }
                        }
                    };
                    tokens.insert(s.token, info.clone());
                    info
                }
            };
            let decimals = info.decimals.unwrap_or(0);
            rendered.push(RenderedSeries {
                block_number: s.block_number,
                address: s.address,
                label: info.label(),
                balances: s.balances.iter().map(|b| format_token_amount(b, decimals)).collect(),
                order_sensitive: s.is_order_sensitive(),
                token: info,
            });
        }
        rendered
    }
}
