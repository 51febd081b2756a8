use async_trait::async_trait;
use ethernity_core::error::Result;
use ethernity_core::types::{BlockStatus, Finding};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::traits::FindingsStore;

/// Armazenamento volátil, útil para execuções pontuais e testes
#[derive(Default)]
pub struct MemoryFindingsStore {
    findings: RwLock<BTreeMap<u64, Vec<Finding>>>,
    status: RwLock<BTreeMap<u64, BlockStatus>>,
    writes: AtomicUsize,
}

impl MemoryFindingsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Quantidade de escritas recebidas (lotes e marcadores)
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FindingsStore for MemoryFindingsStore {
    async fn has_completed_block(&self, block_number: u64) -> Result<bool> {
        Ok(self.status.read().contains_key(&block_number))
    }

    async fn write_findings(&self, findings: &[Finding]) -> Result<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        let mut guard = self.findings.write();
        for finding in findings {
            guard.entry(finding.block_number).or_default().push(finding.clone());
        }
        Ok(())
    }

    async fn mark_block_complete(&self, status: &BlockStatus) -> Result<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.status
            .write()
            .entry(status.block_number)
            .or_insert_with(|| status.clone());
        Ok(())
    }

    async fn findings_for_block(&self, block_number: u64) -> Result<Vec<Finding>> {
        Ok(self.findings.read().get(&block_number).cloned().unwrap_or_default())
    }

    async fn block_status(&self, block_number: u64) -> Result<Option<BlockStatus>> {
        Ok(self.status.read().get(&block_number).cloned())
    }
}
