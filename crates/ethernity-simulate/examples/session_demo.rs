use std::env;
use std::time::Duration;

use anyhow::Context;
use ethernity_core::types::{BlockTransaction, StateRef};
use ethernity_simulate::{AnvilProvider, ExecutionAdapter, ExecutionOutcome, SimulationProvider};
use ethers::prelude::*;
use ethers::utils::parse_ether;
use tracing::info;

/// Endereço da primeira conta padrão do Anvil
const ACCOUNT_A: &str = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266";
/// Endereço da segunda conta padrão do Anvil
const ACCOUNT_B: &str = "0x70997970c51812dc3a010c7d01b50e0d17dc79c8";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Uso: {} <RPC_HTTP_ENDPOINT>", args[0]);
        std::process::exit(1);
    }
    let rpc = &args[1];

    // Conecta no endpoint informado apenas para obter o bloco atual
    let remote = Provider::<Http>::try_from(rpc.as_str()).context("endpoint invalido")?;
    let block = remote
        .get_block(BlockNumber::Latest)
        .await
        .context("falha ao obter bloco atual")?
        .context("bloco inexistente")?;
    let pre_state = StateRef {
        block_number: block.number.context("bloco pendente")?.as_u64(),
        block_hash: block.hash.unwrap_or_default(),
        state_root: block.state_root,
    };
    info!("Forkando no bloco {}", pre_state.block_number);

    let sim_provider = AnvilProvider::new(rpc.clone());
    let session = sim_provider
        .create_session(&pre_state, Duration::from_secs(60))
        .await
        .context("falha ao criar sessão")?;
    let adapter = ExecutionAdapter::new(session, Duration::from_secs(10));

    let receiver: Address = ACCOUNT_B.parse()?;
    let tx = BlockTransaction {
        hash: H256::repeat_byte(0xde),
        from: ACCOUNT_A.parse()?,
        to: Some(receiver),
        input: Vec::new(),
        value: parse_ether(1u64)?,
        gas: U256::from(21_000u64),
        gas_price: None,
        nonce: U256::zero(),
    };

    // Envia a transação entre snapshot e restauração
    let snapshot = adapter.checkpoint().await.context("falha ao criar snapshot")?;
    match adapter.execute(&tx).await {
        ExecutionOutcome::Receipt(receipt) => info!("Transação executada: {:?}", receipt.status),
        ExecutionOutcome::Fault(e) => info!("Falha do motor: {e}"),
    }
    adapter.rollback(snapshot).await.context("falha ao restaurar snapshot")?;
    info!("Estado restaurado para o snapshot {:?}", snapshot);

    adapter.close().await;
    info!("Sessão encerrada");

    Ok(())
}
