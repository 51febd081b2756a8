use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

use crate::error::{ReplayError, Result};
use crate::ordering::OrderingPolicy;

pub const ENV_POLICY: &str = "ETHERNITY_REORDER_POLICY";
pub const ENV_WORKERS: &str = "ETHERNITY_REORDER_WORKERS";
pub const ENV_CALL_TIMEOUT_MS: &str = "ETHERNITY_REORDER_CALL_TIMEOUT_MS";
pub const ENV_SESSION_TIMEOUT_MS: &str = "ETHERNITY_REORDER_SESSION_TIMEOUT_MS";
pub const ENV_MAX_ORDERINGS: &str = "ETHERNITY_REORDER_MAX_ORDERINGS";

/// Configuração da reexecução de blocos
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplayConfig {
    /// Política de geração de ordenações
    pub policy: OrderingPolicy,
    /// Tamanho do pool de workers
    pub workers: usize,
    /// Limite de tempo de cada chamada ao motor
    #[serde(with = "millis")]
    pub call_timeout: Duration,
    /// Tempo de vida de uma sessão do motor
    #[serde(with = "millis")]
    pub session_timeout: Duration,
    /// Teto opcional de ordenações por bloco
    pub max_orderings: Option<u64>,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            policy: OrderingPolicy::Pairwise,
            workers: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            call_timeout: Duration::from_secs(30),
            session_timeout: Duration::from_secs(600),
            max_orderings: None,
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Result<Option<T>> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ReplayError::Config(format!("valor inválido para {}: '{}'", key, raw))),
        Err(_) => Ok(None),
    }
}

impl ReplayConfig {
    /// Carrega a configuração padrão sobrescrita pelas variáveis de ambiente
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        if let Some(raw) = env_parse::<String>(ENV_POLICY)? {
            config.policy = raw.parse().map_err(ReplayError::Config)?;
        }
        if let Some(workers) = env_parse(ENV_WORKERS)? {
            config.workers = workers;
        }
        if let Some(ms) = env_parse(ENV_CALL_TIMEOUT_MS)? {
            config.call_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = env_parse(ENV_SESSION_TIMEOUT_MS)? {
            config.session_timeout = Duration::from_millis(ms);
        }
        if let Some(max) = env_parse(ENV_MAX_ORDERINGS)? {
            config.max_orderings = Some(max);
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(ReplayError::Config("workers deve ser maior que zero".into()));
        }
        if self.call_timeout.is_zero() || self.session_timeout.is_zero() {
            return Err(ReplayError::Config("timeouts devem ser maiores que zero".into()));
        }
        if let OrderingPolicy::Bounded(k) = self.policy {
            if k < 2 {
                return Err(ReplayError::Config(format!("bounded:{} não reordena nada", k)));
            }
        }
        Ok(())
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
