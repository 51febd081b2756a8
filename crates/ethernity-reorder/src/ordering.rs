//! Geração preguiçosa do espaço de ordenações de um bloco.
//!
//! Todas as políticas são k-permutações em ordem lexicográfica sobre as
//! posições das transações filtradas: `full` usa k = n, `pairwise` usa k = 2.
//! A sequência é finita, reiniciável e nunca materializada por inteiro.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Política de controle combinatório
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum OrderingPolicy {
    /// Todas as n! permutações
    Full,
    /// Todos os pares ordenados, n·(n−1)
    Pairwise,
    /// Todas as k-permutações, n!/(n−k)!
    Bounded(usize),
    /// `Full` até `max_full` transações, `Pairwise` acima disso
    Adaptive { max_full: usize },
}

impl OrderingPolicy {
    /// Tamanho de cada ordenação para `n` transações
    pub fn arity(&self, n: usize) -> usize {
        match self {
            OrderingPolicy::Full => n,
            OrderingPolicy::Pairwise => n.min(2),
            OrderingPolicy::Bounded(k) => n.min(*k),
            OrderingPolicy::Adaptive { max_full } => {
                if n <= *max_full {
                    n
                } else {
                    n.min(2)
                }
            }
        }
    }

    pub fn generator(&self, n: usize) -> OrderingGenerator {
        OrderingGenerator::new(n, self.arity(n))
    }
}

impl fmt::Display for OrderingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderingPolicy::Full => write!(f, "full"),
            OrderingPolicy::Pairwise => write!(f, "pairwise"),
            OrderingPolicy::Bounded(k) => write!(f, "bounded:{}", k),
            OrderingPolicy::Adaptive { max_full } => write!(f, "adaptive:{}", max_full),
        }
    }
}

impl FromStr for OrderingPolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim().to_ascii_lowercase();
        let parse_arg = |raw: &str| {
            raw.parse::<usize>()
                .map_err(|_| format!("argumento inválido em '{}'", value))
        };
        match value.split_once(':') {
            None if value == "full" => Ok(OrderingPolicy::Full),
            None if value == "pairwise" => Ok(OrderingPolicy::Pairwise),
            Some(("bounded", k)) => Ok(OrderingPolicy::Bounded(parse_arg(k)?)),
            Some(("adaptive", n)) => Ok(OrderingPolicy::Adaptive { max_full: parse_arg(n)? }),
            _ => Err(format!("política desconhecida '{}'", value)),
        }
    }
}

impl TryFrom<String> for OrderingPolicy {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<OrderingPolicy> for String {
    fn from(policy: OrderingPolicy) -> Self {
        policy.to_string()
    }
}

/// Uma ordenação candidata: posições dentro do conjunto filtrado
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxOrdering {
    pub index: u64,
    pub positions: Vec<usize>,
}

/// Faixa contígua da sequência de ordenações atribuída a um worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderingBatch {
    pub start: u64,
    pub len: u64,
}

/// Gerador reiniciável de k-permutações sobre `n` posições
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderingGenerator {
    n: usize,
    k: usize,
}

impl OrderingGenerator {
    pub fn new(n: usize, k: usize) -> Self {
        Self { n, k: k.min(n) }
    }

    /// Nada a reordenar com menos de duas transações ou ordenações unitárias
    pub fn is_empty(&self) -> bool {
        self.n <= 1 || self.k < 2
    }

    /// Quantidade exata de ordenações, `None` em caso de overflow
    pub fn count(&self) -> Option<u64> {
        if self.is_empty() {
            return Some(0);
        }
        ((self.n - self.k + 1)..=self.n).try_fold(1u64, |acc, f| acc.checked_mul(f as u64))
    }

    /// Nova passagem pela sequência completa
    pub fn iter(&self) -> KPermutations {
        KPermutations::new(self.n, self.k)
    }

    /// Ordenações de um lote, numeradas pela posição na sequência completa
    pub fn batch(&self, batch: OrderingBatch) -> impl Iterator<Item = TxOrdering> {
        let mut perms = self.iter();
        perms.skip_ahead(batch.start);
        perms
            .take(batch.len as usize)
            .enumerate()
            .map(move |(offset, positions)| TxOrdering {
                index: batch.start + offset as u64,
                positions,
            })
    }
}

/// Divide `total` ordenações em no máximo `workers` lotes contíguos
pub fn partition(total: u64, workers: usize) -> Vec<OrderingBatch> {
    if total == 0 {
        return Vec::new();
    }
    let workers = workers.max(1) as u64;
    let size = ((total + workers - 1) / workers).max(1);
    let mut batches = Vec::new();
    let mut start = 0;
    while start < total {
        let len = size.min(total - start);
        batches.push(OrderingBatch { start, len });
        start += len;
    }
    batches
}

/// Iterador lexicográfico de k-permutações de `0..n`.
///
/// `pool[..k]` é a ordenação corrente e `pool[k..]` permanece crescente
/// entre chamadas.
#[derive(Debug, Clone)]
pub struct KPermutations {
    pool: Vec<usize>,
    k: usize,
    started: bool,
    done: bool,
}

impl KPermutations {
    fn new(n: usize, k: usize) -> Self {
        let k = k.min(n);
        Self {
            pool: (0..n).collect(),
            k,
            started: false,
            done: n <= 1 || k < 2,
        }
    }

    fn advance(&mut self) -> bool {
        if self.done {
            return false;
        }
        if !self.started {
            self.started = true;
            return true;
        }
        self.pool[self.k..].reverse();
        if next_permutation(&mut self.pool) {
            true
        } else {
            self.done = true;
            false
        }
    }

    /// Avança `steps` posições sem alocar
    pub fn skip_ahead(&mut self, steps: u64) {
        for _ in 0..steps {
            if !self.advance() {
                break;
            }
        }
    }
}

impl Iterator for KPermutations {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.advance() {
            Some(self.pool[..self.k].to_vec())
        } else {
            None
        }
    }
}

fn next_permutation(values: &mut [usize]) -> bool {
    if values.len() < 2 {
        return false;
    }
    let mut i = values.len() - 1;
    while i > 0 && values[i - 1] >= values[i] {
        i -= 1;
    }
    if i == 0 {
        return false;
    }
    let pivot = i - 1;
    let mut j = values.len() - 1;
    while values[j] <= values[pivot] {
        j -= 1;
    }
    values.swap(pivot, j);
    values[i..].reverse();
    true
}
