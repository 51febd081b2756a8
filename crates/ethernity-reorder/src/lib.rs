/*!
 * Ethernity Reorder
 *
 * Reexecução de blocos sob ordenações alternativas de transações para
 * detectar valor extraível pela ordem (MEV). Filtra as transações
 * reordenáveis, gera as ordenações de forma preguiçosa, distribui os lotes
 * entre workers isolados por snapshot/restore, persiste um finding por
 * ordenação e agrega os saldos resultantes por destinatário.
 */

pub mod balance_aggregator;
pub mod config;
pub mod error;
pub mod extractor;
pub mod filter;
pub mod orchestrator;
pub mod ordering;
pub mod store;
pub mod traits;

pub use balance_aggregator::*;
pub use config::*;
pub use error::*;
pub use extractor::*;
pub use filter::*;
pub use orchestrator::*;
pub use ordering::*;
pub use store::*;
pub use traits::*;
