/*!
 * Ethernity Traits
 *
 * Traits comuns usados em toda a workspace Ethernity
 */

use async_trait::async_trait;
use crate::error::Result;
use crate::types::{BlockDescriptor, StateRef, TokenInfo};
use ethereum_types::Address;

/// Trait para provedores de blocos
#[async_trait]
pub trait BlockProvider: Send + Sync {
    /// Obtém um bloco com a lista ordenada de transações
    async fn get_block(&self, block_number: u64) -> Result<BlockDescriptor>;

    /// Obtém a referência de estado de um bloco, sem transações
    async fn get_state_ref(&self, block_number: u64) -> Result<StateRef>;
}

/// Trait para resolução de metadados de tokens ERC-20
#[async_trait]
pub trait TokenMetadataProvider: Send + Sync {
    /// Resolve nome, símbolo e decimais de um token
    async fn token_info(&self, token: Address) -> Result<TokenInfo>;
}
