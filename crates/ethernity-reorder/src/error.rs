use ethernity_simulate::SimulationError;
use thiserror::Error;

use crate::ordering::OrderingPolicy;

/// Erros que abortam o processamento de um bloco
#[derive(Debug, Error)]
pub enum ReplayError {
    /// Falha de RPC ou de armazenamento
    #[error("erro de colaborador: {0}")]
    Core(#[from] ethernity_core::Error),

    /// Falha ao criar ou recuperar a sessão de execução
    #[error("erro de simulação: {0}")]
    Simulation(#[from] SimulationError),

    /// Estado anterior ao bloco ausente ou inconsistente
    #[error("estado anterior ao bloco {0} indisponível")]
    MissingPreState(u64),

    /// Quantidade de ordenações excede o limite representável ou configurado
    #[error("espaço de ordenações grande demais: {transactions} transações com política {policy}")]
    OrderingSpaceTooLarge {
        transactions: usize,
        policy: OrderingPolicy,
    },

    /// Worker encerrado de forma irrecuperável
    #[error("worker abortado: {0}")]
    Worker(String),

    /// Configuração inválida
    #[error("configuração inválida: {0}")]
    Config(String),
}

/// Resultado padrão da crate
pub type Result<T> = std::result::Result<T, ReplayError>;
