/*!
 * Ethernity Types
 *
 * Tipos comuns usados em toda a workspace Ethernity
 */

use chrono::{DateTime, Utc};
use ethereum_types::{Address, H256, U256};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Alias para hash de transação
pub type TransactionHash = H256;

/// Transação de um bloco, repassada sem alterações ao motor de execução.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockTransaction {
    pub hash: TransactionHash,
    pub from: Address,
    /// `None` para criação de contrato
    pub to: Option<Address>,
    #[serde(with = "crate::utils::hex_bytes")]
    pub input: Vec<u8>,
    pub value: U256,
    pub gas: U256,
    pub gas_price: Option<U256>,
    pub nonce: U256,
}

impl BlockTransaction {
    /// Seletor de método (4 primeiros bytes do calldata), se houver
    pub fn selector(&self) -> Option<[u8; 4]> {
        crate::utils::selector(&self.input)
    }
}

/// Referência ao estado global imediatamente anterior a um bloco.
///
/// É somente leitura e compartilhada entre todos os workers de um bloco.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StateRef {
    pub block_number: u64,
    pub block_hash: H256,
    pub state_root: H256,
}

/// Bloco obtido do node, imutável após a busca.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockDescriptor {
    pub number: u64,
    pub hash: H256,
    pub parent_hash: H256,
    pub transactions: Vec<BlockTransaction>,
}

/// Transferência de token decodificada de um log `Transfer`.
///
/// O valor está sempre em unidades base do token; a conversão por `decimals`
/// acontece apenas na exibição.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransferRecord {
    pub token_address: Address,
    pub from: Address,
    pub to: Address,
    pub value: U256,
    /// Índice da ordenação que produziu a transferência
    pub source_ordering: u64,
    /// Transação cujo recibo emitiu o log
    pub tx_hash: TransactionHash,
}

/// Situação de um finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FindingStatus {
    Ok,
    Failed,
}

impl fmt::Display for FindingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FindingStatus::Ok => write!(f, "ok"),
            FindingStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Resultado persistido da reexecução de uma ordenação.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub block_number: u64,
    pub ordering_index: u64,
    pub transaction_hash_sequence: Vec<TransactionHash>,
    pub transfer_records: Vec<TransferRecord>,
    /// Transações cujo recibo indicou revert
    pub reverted: Vec<TransactionHash>,
    pub execution_duration_ms: u64,
    pub status: FindingStatus,
    pub error: Option<String>,
}

impl Finding {
    pub fn is_ok(&self) -> bool {
        self.status == FindingStatus::Ok
    }
}

/// Marcador de conclusão de um bloco.
///
/// Sua existência indica que todas as ordenações do bloco possuem finding persistido.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockStatus {
    pub block_number: u64,
    pub execution_duration_ms: u64,
    pub completed_at: DateTime<Utc>,
    pub orderings: u64,
}

/// Informações sobre um token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenInfo {
    pub address: Address,
    pub name: Option<String>,
    pub symbol: Option<String>,
    pub decimals: Option<u8>,
}

impl TokenInfo {
    /// Rótulo para exibição: símbolo, nome ou o próprio endereço
    pub fn label(&self) -> String {
        self.symbol
            .clone()
            .or_else(|| self.name.clone())
            .unwrap_or_else(|| crate::utils::format_address(&self.address))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_finding() -> Finding {
        Finding {
            block_number: 10,
            ordering_index: 3,
            transaction_hash_sequence: vec![H256::repeat_byte(1), H256::repeat_byte(2)],
            transfer_records: vec![TransferRecord {
                token_address: Address::repeat_byte(0xee),
                from: Address::repeat_byte(0xaa),
                to: Address::repeat_byte(0xbb),
                value: U256::from(100u64),
                source_ordering: 3,
                tx_hash: H256::repeat_byte(1),
            }],
            reverted: vec![],
            execution_duration_ms: 12,
            status: FindingStatus::Ok,
            error: None,
        }
    }

    #[test]
    fn finding_document_shape() {
        let json = serde_json::to_value(sample_finding()).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["block_number"], 10);
        assert_eq!(json["transaction_hash_sequence"].as_array().unwrap().len(), 2);
        let back: Finding = serde_json::from_value(json).unwrap();
        assert_eq!(back, sample_finding());
    }

    #[test]
    fn transaction_input_is_hex_encoded() {
        let tx = BlockTransaction {
            hash: H256::zero(),
            from: Address::zero(),
            to: None,
            input: vec![0xa9, 0x05, 0x9c, 0xbb],
            value: U256::zero(),
            gas: U256::from(21_000u64),
            gas_price: None,
            nonce: U256::zero(),
        };
        let json = serde_json::to_value(&tx).unwrap();
        assert_eq!(json["input"], "0xa9059cbb");
        assert_eq!(tx.selector(), Some([0xa9, 0x05, 0x9c, 0xbb]));
    }

    #[test]
    fn token_label_falls_back_to_address() {
        let info = TokenInfo {
            address: Address::repeat_byte(0x11),
            name: None,
            symbol: None,
            decimals: None,
        };
        assert_eq!(info.label(), format!("0x{}", "11".repeat(20)));
    }
}
