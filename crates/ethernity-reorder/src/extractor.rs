//! Decodificação de logs `Transfer(address,address,uint256)` em registros
//! estruturados. Logs de outros eventos são ignorados.

use ethernity_core::types::{TransactionHash, TransferRecord};
use ethernity_core::utils::topic_to_address;
use ethernity_simulate::SimulatedReceipt;
use ethers::types::{Log, H256, U256};

/// keccak256("Transfer(address,address,uint256)")
pub const TRANSFER_EVENT_SIGNATURE: H256 = H256([
    0xdd, 0xf2, 0x52, 0xad, 0x1b, 0xe2, 0xc8, 0x9b, 0x69, 0xc2, 0xb0, 0x68, 0xfc, 0x37, 0x8d, 0xaa,
    0x95, 0x2b, 0xa7, 0xf1, 0x63, 0xc4, 0xa1, 0x16, 0x28, 0xf5, 0x5a, 0x4d, 0xf5, 0x23, 0xb3, 0xef,
]);

/// Log classificado após decodificação
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodedLog {
    Transfer(TransferRecord),
    /// Qualquer log que não seja uma transferência ERC-20 bem formada
    Other,
}

fn is_address_topic(topic: &H256) -> bool {
    topic.as_bytes()[..12].iter().all(|b| *b == 0)
}

/// Decodifica um log isolado.
///
/// Exige exatamente três tópicos e 32 bytes de payload; variantes com `value`
/// indexado (ERC-721) ou payload truncado caem em `Other`.
pub fn decode_log(log: &Log, tx_hash: TransactionHash, ordering: u64) -> DecodedLog {
    if log.topics.len() != 3 || log.topics[0] != TRANSFER_EVENT_SIGNATURE {
        return DecodedLog::Other;
    }
    if log.data.len() != 32 {
        return DecodedLog::Other;
    }
    let (from, to) = (&log.topics[1], &log.topics[2]);
    if !is_address_topic(from) || !is_address_topic(to) {
        return DecodedLog::Other;
    }

    DecodedLog::Transfer(TransferRecord {
        token_address: log.address,
        from: topic_to_address(from),
        to: topic_to_address(to),
        value: U256::from_big_endian(&log.data),
        source_ordering: ordering,
        tx_hash,
    })
}

/// Extrai todas as transferências de um recibo, na ordem dos logs
pub fn extract_transfers(receipt: &SimulatedReceipt, ordering: u64) -> Vec<TransferRecord> {
    receipt
        .logs
        .iter()
        .filter_map(|log| match decode_log(log, receipt.tx_hash, ordering) {
            DecodedLog::Transfer(record) => Some(record),
            DecodedLog::Other => None,
        })
        .collect()
}
