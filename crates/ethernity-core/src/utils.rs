/*!
 * Ethernity Utils
 *
 * Utilitários comuns usados em toda a workspace Ethernity
 */

use ethereum_types::{Address, H256, U256};
use tiny_keccak::{Hasher, Keccak};

/// Formata um Address para exibição
pub fn format_address(address: &Address) -> String {
    format!("0x{:x}", address)
}

/// Calcula o hash Keccak-256 de dados
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak::v256();
    let mut result = [0u8; 32];
    hasher.update(data);
    hasher.finalize(&mut result);
    result
}

/// Retorna os 4 primeiros bytes do calldata
pub fn selector(input: &[u8]) -> Option<[u8; 4]> {
    if input.len() >= 4 {
        Some([input[0], input[1], input[2], input[3]])
    } else {
        None
    }
}

/// Extrai o endereço dos 20 bytes inferiores de um tópico indexado
pub fn topic_to_address(topic: &H256) -> Address {
    Address::from_slice(&topic.as_bytes()[12..32])
}

/// Formata um valor com decimais para exibição
pub fn format_token_amount(amount: &U256, decimals: u8) -> String {
    if decimals == 0 {
        return amount.to_string();
    }

    let divisor = U256::from(10).pow(U256::from(decimals));
    let integer_part = amount / divisor;
    let fractional_part = amount % divisor;

    // Parte fracionária com zeros à esquerda até `decimals` dígitos
    let mut padded_fractional = format!("{:0>width$}", fractional_part.to_string(), width = decimals as usize);

    // Remove zeros à direita
    while padded_fractional.ends_with('0') {
        padded_fractional.pop();
    }

    if padded_fractional.is_empty() {
        integer_part.to_string()
    } else {
        format!("{}.{}", integer_part, padded_fractional)
    }
}

/// Serialização de bytes como string hexadecimal `0x...`
pub mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("0x{}", hex::encode(bytes)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        let stripped = raw.strip_prefix("0x").unwrap_or(&raw);
        hex::decode(stripped).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_amount_with_decimals() {
        assert_eq!(format_token_amount(&U256::from(1_500_000u64), 6), "1.5");
        assert_eq!(format_token_amount(&U256::from(1_000_000u64), 6), "1");
        assert_eq!(format_token_amount(&U256::from(5u64), 3), "0.005");
        assert_eq!(format_token_amount(&U256::from(42u64), 0), "42");
    }

    #[test]
    fn topic_address_uses_low_bytes() {
        let mut raw = [0u8; 32];
        raw[12..].copy_from_slice(&[0xaa; 20]);
        assert_eq!(topic_to_address(&H256::from(raw)), Address::repeat_byte(0xaa));
    }

    #[test]
    fn transfer_topic_hash() {
        let hash = keccak256(b"Transfer(address,address,uint256)");
        assert_eq!(
            hex::encode(hash),
            "ddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef"
        );
    }

    #[test]
    fn selector_requires_four_bytes() {
        assert_eq!(selector(&[0xa9, 0x05, 0x9c]), None);
        assert_eq!(selector(&[0xa9, 0x05, 0x9c, 0xbb, 0x00]), Some([0xa9, 0x05, 0x9c, 0xbb]));
    }
}
