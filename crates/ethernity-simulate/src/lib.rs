/*! ethernity-simulate
 *
 * Crate para simulação de transações em forks Ethereum.
 * Utiliza o Anvil como backend para criação de forks locais e expõe o
 * `ExecutionAdapter`, que normaliza cada envio em um resultado etiquetado.
 */

pub mod adapter;
pub mod errors;
pub mod providers;
pub mod traits;

pub use adapter::*;
pub use errors::*;
pub use providers::*;
pub use traits::*;
