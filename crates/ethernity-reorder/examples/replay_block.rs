use std::env;
use std::sync::Arc;

use anyhow::Context;
use ethernity_reorder::{BalanceAggregator, RedbFindingsStore, ReplayConfig, ReplayOrchestrator};
use ethernity_rpc::{EthernityRpcClient, RpcConfig};
use ethernity_simulate::AnvilProvider;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 4 {
        eprintln!("Uso: {} <RPC_HTTP_ENDPOINT> <BLOCO_INICIAL> <BLOCO_FINAL> [DIRETORIO_DB]", args[0]);
        std::process::exit(1);
    }
    let rpc = args[1].clone();
    let start: u64 = args[2].parse().context("bloco inicial invalido")?;
    let end: u64 = args[3].parse().context("bloco final invalido")?;
    let db_dir = args.get(4).cloned().unwrap_or_else(|| "./findings".to_string());

    std::fs::create_dir_all(&db_dir).context("falha ao criar diretorio do banco")?;
    let config = ReplayConfig::from_env()?;
    info!(policy = %config.policy, workers = config.workers, "configuracao carregada");

    let client = Arc::new(
        EthernityRpcClient::new(RpcConfig { endpoint: rpc.clone(), ..Default::default() })
            .await
            .context("falha ao conectar no node")?,
    );
    let store = Arc::new(RedbFindingsStore::open(&db_dir)?);
    let orchestrator = ReplayOrchestrator::new(client.clone(), Arc::new(AnvilProvider::new(rpc)), store.clone(), config)?;

    let reports = orchestrator.process_range(start..=end).await?;
    let aggregator = BalanceAggregator::new(3);
    for report in reports {
        info!(
            block = report.block_number,
            skipped = report.skipped,
            orderings = report.orderings,
            failed = report.failed,
            "bloco processado"
        );
        let series = aggregator.aggregate_block(store.as_ref(), report.block_number).await?;
        let sensitive: Vec<_> = series.into_iter().filter(|s| s.is_order_sensitive()).collect();
        for rendered in aggregator.render(&sensitive, client.as_ref()).await {
            println!("{}", serde_json::to_string(&rendered)?);
        }
    }

    Ok(())
}
