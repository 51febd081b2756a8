/*!
 * Ethernity RPC
 *
 * Cliente RPC para interação com nodes Ethereum
 */

use async_trait::async_trait;
use ethernity_core::{
    error::Result,
    traits::{BlockProvider, TokenMetadataProvider},
    types::*,
    Error,
};
use ethereum_types::{Address, H256, U256};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use web3::{
    ethabi::{self, ParamType, Token},
    transports::{Http, WebSocket},
    types::{Block, BlockId, BlockNumber, Bytes, CallRequest, Transaction, H160, U64},
    Web3,
};

/// Seletor de `name()`
const NAME_SELECTOR: [u8; 4] = [0x06, 0xfd, 0xde, 0x03];
/// Seletor de `symbol()`
const SYMBOL_SELECTOR: [u8; 4] = [0x95, 0xd8, 0x9b, 0x41];
/// Seletor de `decimals()`
const DECIMALS_SELECTOR: [u8; 4] = [0x31, 0x3c, 0xe5, 0x67];

/// Configuração do cliente RPC
#[derive(Debug, Clone)]
pub struct RpcConfig {
    pub endpoint: String,
    pub timeout: Duration,
    pub use_cache: bool,
    pub cache_ttl: Duration,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8545".to_string(),
            timeout: Duration::from_secs(30),
            use_cache: true,
            cache_ttl: Duration::from_secs(60),
        }
    }
}

/// Enum para diferentes tipos de transporte
pub enum TransportType {
    Http(Web3<Http>),
    WebSocket(Web3<WebSocket>),
}

/// Executa a mesma expressão sobre qualquer transporte
macro_rules! on_transport {
    ($transport:expr, $web3:ident => $body:expr) => {
        match $transport {
            TransportType::Http($web3) => $body,
            TransportType::WebSocket($web3) => $body,
        }
    };
}

fn to_u256(value: web3::types::U256) -> U256 {
    let mut buf = [0u8; 32];
    value.to_big_endian(&mut buf);
    U256::from_big_endian(&buf)
}

fn to_h256(value: &web3::types::H256) -> H256 {
    H256::from_slice(value.as_bytes())
}

fn to_address(value: &H160) -> Address {
    Address::from_slice(value.as_bytes())
}

/// Converte uma transação do node, rejeitando payloads sem remetente
pub fn convert_transaction(tx: &Transaction) -> Result<BlockTransaction> {
    let from = tx
        .from
        .as_ref()
        .ok_or_else(|| Error::DecodeError(format!("transação 0x{:x} sem remetente", tx.hash)))?;
    Ok(BlockTransaction {
        hash: to_h256(&tx.hash),
        from: to_address(from),
        to: tx.to.as_ref().map(to_address),
        input: tx.input.0.clone(),
        value: to_u256(tx.value),
        gas: to_u256(tx.gas),
        gas_price: tx.gas_price.map(to_u256),
        nonce: to_u256(tx.nonce),
    })
}

/// Converte um bloco completo; transações malformadas são descartadas individualmente
pub fn convert_block(block: &Block<Transaction>) -> Result<BlockDescriptor> {
    let number = block
        .number
        .ok_or_else(|| Error::DecodeError("bloco pendente sem número".to_string()))?
        .as_u64();
    let mut transactions = Vec::with_capacity(block.transactions.len());
    for tx in &block.transactions {
        match convert_transaction(tx) {
            Ok(converted) => transactions.push(converted),
            Err(e) => warn!(block = number, error = %e, "transação malformada ignorada"),
        }
    }
    Ok(BlockDescriptor {
        number,
        hash: block.hash.as_ref().map(to_h256).unwrap_or_default(),
        parent_hash: to_h256(&block.parent_hash),
        transactions,
    })
}

/// Decodifica o retorno de `name()`/`symbol()`, aceitando `string` ou `bytes32`
pub fn decode_string_result(data: &[u8]) -> Option<String> {
    if let Ok(tokens) = ethabi::decode(&[ParamType::String], data) {
        if let Some(Token::String(s)) = tokens.into_iter().next() {
            return Some(s);
        }
    }
    if data.len() == 32 {
        let trimmed: Vec<u8> = data.iter().copied().take_while(|b| *b != 0).collect();
        return String::from_utf8(trimmed).ok().filter(|s| !s.is_empty());
    }
    None
}

/// Decodifica o retorno de `decimals()`
pub fn decode_decimals_result(data: &[u8]) -> Option<u8> {
    if data.len() < 32 {
        return None;
    }
    let value = U256::from_big_endian(&data[0..32]);
    if value > U256::from(u8::MAX) {
        None
    } else {
        Some(value.low_u32() as u8)
    }
}

/// Remove do cache de blocos as entradas com validade vencida
fn prune_expired(cache: &mut HashMap<u64, (BlockDescriptor, Instant)>, ttl: Duration) {
    cache.retain(|_, (_, at)| at.elapsed() < ttl);
}

/// Cliente RPC para Ethereum
pub struct EthernityRpcClient {
    transport: TransportType,
    config: RpcConfig,
    blocks: RwLock<HashMap<u64, (BlockDescriptor, Instant)>>,
    tokens: RwLock<HashMap<Address, TokenInfo>>,
}

impl EthernityRpcClient {
    /// Cria um novo cliente RPC HTTP
    pub async fn new_http(config: RpcConfig) -> Result<Self> {
        let transport = Http::new(&config.endpoint)
            .map_err(|e| Error::RpcError(format!("Falha ao conectar via HTTP: {}", e)))?;
        Self::connected(TransportType::Http(Web3::new(transport)), config).await
    }

    /// Cria um novo cliente RPC WebSocket
    pub async fn new_websocket(config: RpcConfig) -> Result<Self> {
        let transport = WebSocket::new(&config.endpoint)
            .await
            .map_err(|e| Error::RpcError(format!("Falha ao conectar via WebSocket: {}", e)))?;
        Self::connected(TransportType::WebSocket(Web3::new(transport)), config).await
    }

    /// Cria um novo cliente baseado na URL
    pub async fn new(config: RpcConfig) -> Result<Self> {
        if config.endpoint.starts_with("ws") {
            Self::new_websocket(config).await
        } else {
            Self::new_http(config).await
        }
    }

    async fn connected(transport: TransportType, config: RpcConfig) -> Result<Self> {
        let client = Self {
            transport,
            config,
            blocks: RwLock::new(HashMap::new()),
            tokens: RwLock::new(HashMap::new()),
        };
        // Verifica a conexão
        client.get_block_number().await?;
        Ok(client)
    }

    async fn bounded<T, F>(&self, what: &str, call: F) -> Result<T>
    where
        F: Future<Output = web3::Result<T>>,
    {
        match tokio::time::timeout(self.config.timeout, call).await {
            Ok(result) => result.map_err(|e| Error::RpcError(format!("Falha ao obter {}: {}", what, e))),
            Err(_) => Err(Error::TimeoutError(format!("{} após {:?}", what, self.config.timeout))),
        }
    }

    /// Obtém o número do bloco atual
    pub async fn get_block_number(&self) -> Result<u64> {
        let number = on_transport!(&self.transport, web3 => {
            self.bounded("número do bloco", web3.eth().block_number()).await?
        });
        Ok(number.as_u64())
    }

    fn cached_block(&self, block_number: u64) -> Option<BlockDescriptor> {
        if !self.config.use_cache {
            return None;
        }
        let cache = self.blocks.read();
        cache
            .get(&block_number)
            .filter(|(_, at)| at.elapsed() < self.config.cache_ttl)
            .map(|(block, _)| block.clone())
    }

    /// Obtém um bloco com todas as transações
    pub async fn get_block_with_transactions(&self, block_number: u64) -> Result<BlockDescriptor> {
        if let Some(block) = self.cached_block(block_number) {
            return Ok(block);
        }

        let id = BlockId::Number(BlockNumber::Number(U64::from(block_number)));
        let block = on_transport!(&self.transport, web3 => {
            self.bounded("bloco", web3.eth().block_with_txs(id)).await?
        });
        let block = block.ok_or_else(|| Error::NotFound(format!("Bloco {} não encontrado", block_number)))?;
        let descriptor = convert_block(&block)?;
        debug!(block = block_number, txs = descriptor.transactions.len(), "bloco obtido");

        if self.config.use_cache {
            let mut cache = self.blocks.write();
            prune_expired(&mut cache, self.config.cache_ttl);
            cache.insert(block_number, (descriptor.clone(), Instant::now()));
        }
        Ok(descriptor)
    }

    /// Limpa os caches de blocos e tokens
    pub fn clear_cache(&self) {
        self.blocks.write().clear();
        self.tokens.write().clear();
    }

    /// Obtém apenas o cabeçalho necessário para referenciar o estado do bloco
    pub async fn get_block_state(&self, block_number: u64) -> Result<StateRef> {
        let id = BlockId::Number(BlockNumber::Number(U64::from(block_number)));
        let block = on_transport!(&self.transport, web3 => {
            self.bounded("cabeçalho do bloco", web3.eth().block(id)).await?
        });
        let block = block.ok_or_else(|| Error::NotFound(format!("Bloco {} não encontrado", block_number)))?;
        Ok(StateRef {
            block_number,
            block_hash: block.hash.as_ref().map(to_h256).unwrap_or_default(),
            state_root: to_h256(&block.state_root),
        })
    }

    /// Executa `eth_call` sem estado de bloco específico
    pub async fn call(&self, to: Address, data: Vec<u8>) -> Result<Vec<u8>> {
        let call_request = CallRequest {
            from: None,
            to: Some(H160::from_slice(to.as_bytes())),
            gas: None,
            gas_price: None,
            value: None,
            data: Some(Bytes(data)),
            transaction_type: None,
            access_list: None,
            max_fee_per_gas: None,
            max_priority_fee_per_gas: None,
        };
        let result = on_transport!(&self.transport, web3 => {
            self.bounded("resultado da chamada", web3.eth().call(call_request.clone(), None)).await?
        });
        Ok(result.0)
    }
}

#[async_trait]
impl BlockProvider for EthernityRpcClient {
    async fn get_block(&self, block_number: u64) -> Result<BlockDescriptor> {
        self.get_block_with_transactions(block_number).await
    }

    async fn get_state_ref(&self, block_number: u64) -> Result<StateRef> {
        self.get_block_state(block_number).await
    }
}

#[async_trait]
impl TokenMetadataProvider for EthernityRpcClient {
    async fn token_info(&self, token: Address) -> Result<TokenInfo> {
        let cached = self.tokens.read().get(&token).cloned();
        if let Some(info) = cached {
            return Ok(info);
        }

        // Tokens fora do padrão simplesmente ficam sem o campo correspondente
        let name = self.call(token, NAME_SELECTOR.to_vec()).await.ok();
        let symbol = self.call(token, SYMBOL_SELECTOR.to_vec()).await.ok();
        let decimals = self.call(token, DECIMALS_SELECTOR.to_vec()).await.ok();

        let info = TokenInfo {
            address: token,
            name: name.as_deref().and_then(decode_string_result),
            symbol: symbol.as_deref().and_then(decode_string_result),
            decimals: decimals.as_deref().and_then(decode_decimals_result),
        };
        self.tokens.write().insert(token, info.clone());
        Ok(info)
    }
}
