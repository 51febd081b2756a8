//! Armazenamento persistente em arquivo `redb`.
//!
//! Cada finding é um documento JSON com chave própria
//! `{bloco:020}/{ordenação:020}/{uuid}`, então escritas concorrentes de
//! workers diferentes nunca disputam a mesma chave. Os marcadores de
//! conclusão ficam em uma tabela separada indexada pelo número do bloco.

use async_trait::async_trait;
use ethernity_core::error::{Error, Result};
use ethernity_core::types::{BlockStatus, Finding};
use redb::{Database, ReadableTable, TableDefinition, TableError};
use std::fmt::Display;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::traits::FindingsStore;

const FINDINGS: TableDefinition<&str, &[u8]> = TableDefinition::new("findings");
const STATUS: TableDefinition<u64, &[u8]> = TableDefinition::new("block_status");

/// Nome do arquivo criado dentro do diretório informado
pub const DB_FILE: &str = "findings.redb";

fn storage<E: Display>(e: E) -> Error {
    Error::StorageError(e.to_string())
}

fn encode(e: serde_json::Error) -> Error {
    Error::EncodeError(e.to_string())
}

fn decode(e: serde_json::Error) -> Error {
    Error::DecodeError(e.to_string())
}

fn block_prefix(block_number: u64) -> (String, String) {
    // '0' sucede '/' na tabela ASCII, delimitando o intervalo do bloco
    (format!("{:020}/", block_number), format!("{:020}0", block_number))
}

#[derive(Clone)]
pub struct RedbFindingsStore {
    db: Arc<Database>,
}

impl RedbFindingsStore {
    /// Abre (ou cria) o banco em `dir`
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let path = dir.as_ref().join(DB_FILE);
        let db = Database::create(&path).map_err(storage)?;

        // Garante a existência das tabelas para leituras posteriores
        let tx = db.begin_write().map_err(storage)?;
        {
            tx.open_table(FINDINGS).map_err(storage)?;
            tx.open_table(STATUS).map_err(storage)?;
        }
        tx.commit().map_err(storage)?;

        debug!(path = %path.display(), "banco de findings aberto");
        Ok(Self { db: Arc::new(db) })
    }

    async fn blocking<T, F>(&self, job: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Database) -> Result<T> + Send + 'static,
    {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || job(&db))
            .await
            .map_err(storage)?
    }
}

#[async_trait]
impl FindingsStore for RedbFindingsStore {
    async fn has_completed_block(&self, block_number: u64) -> Result<bool> {
        Ok(self.block_status(block_number).await?.is_some())
    }

    async fn write_findings(&self, findings: &[Finding]) -> Result<()> {
        if findings.is_empty() {
            return Ok(());
        }
        let mut documents = Vec::with_capacity(findings.len());
        for finding in findings {
            let key = format!(
                "{:020}/{:020}/{}",
                finding.block_number,
                finding.ordering_index,
                Uuid::new_v4()
            );
            documents.push((key, serde_json::to_vec(finding).map_err(encode)?));
        }

        self.blocking(move |db| {
            let tx = db.begin_write().map_err(storage)?;
            {
                let mut table = tx.open_table(FINDINGS).map_err(storage)?;
                for (key, value) in &documents {
                    table.insert(key.as_str(), value.as_slice()).map_err(storage)?;
                }
            }
            tx.commit().map_err(storage)
        })
        .await
    }

    async fn mark_block_complete(&self, status: &BlockStatus) -> Result<()> {
        let block_number = status.block_number;
        let value = serde_json::to_vec(status).map_err(encode)?;

        self.blocking(move |db| {
            let tx = db.begin_write().map_err(storage)?;
            {
                let mut table = tx.open_table(STATUS).map_err(storage)?;
                let exists = table.get(block_number).map_err(storage)?.is_some();
                if !exists {
                    table.insert(block_number, value.as_slice()).map_err(storage)?;
                }
            }
            tx.commit().map_err(storage)
        })
        .await
    }

    async fn findings_for_block(&self, block_number: u64) -> Result<Vec<Finding>> {
        self.blocking(move |db| {
            let tx = db.begin_read().map_err(storage)?;
            let table = match tx.open_table(FINDINGS) {
                Ok(t) => t,
                Err(TableError::TableDoesNotExist(_)) => return Ok(Vec::new()),
                Err(e) => return Err(storage(e)),
            };
            let (start, end) = block_prefix(block_number);
            let mut findings = Vec::new();
            for entry in table.range(start.as_str()..end.as_str()).map_err(storage)? {
                let (_, value) = entry.map_err(storage)?;
                findings.push(serde_json::from_slice(value.value()).map_err(decode)?);
            }
            Ok(findings)
        })
        .await
    }

    async fn block_status(&self, block_number: u64) -> Result<Option<BlockStatus>> {
        self.blocking(move |db| {
            let tx = db.begin_read().map_err(storage)?;
            let table = match tx.open_table(STATUS) {
                Ok(t) => t,
                Err(TableError::TableDoesNotExist(_)) => return Ok(None),
                Err(e) => return Err(storage(e)),
            };
            let status = match table.get(block_number).map_err(storage)? {
                Some(value) => Some(serde_json::from_slice(value.value()).map_err(decode)?),
                None => None,
            };
            Ok(status)
        })
        .await
    }
}
