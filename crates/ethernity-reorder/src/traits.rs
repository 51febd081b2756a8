use async_trait::async_trait;
use ethernity_core::error::Result;
use ethernity_core::types::{BlockStatus, Finding};

/// Trait para o armazenamento de findings e marcadores de conclusão
#[async_trait]
pub trait FindingsStore: Send + Sync {
    /// Verifica se o bloco já possui registro de conclusão
    async fn has_completed_block(&self, block_number: u64) -> Result<bool>;

    /// Persiste um lote de findings em uma única escrita
    async fn write_findings(&self, findings: &[Finding]) -> Result<()>;

    /// Registra a conclusão de um bloco. Um registro existente nunca é sobrescrito.
    async fn mark_block_complete(&self, status: &BlockStatus) -> Result<()>;

    /// Todos os findings persistidos de um bloco, possivelmente com duplicatas
    async fn findings_for_block(&self, block_number: u64) -> Result<Vec<Finding>>;

    async fn block_status(&self, block_number: u64) -> Result<Option<BlockStatus>>;
}
