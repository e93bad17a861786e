//! Pairwise correlation matrix and coarse factor decomposition.
//!
//! Every pair is aligned on its own date intersection. Pairs with too little
//! shared history are kept as [`Correlation::Undefined`] so callers can tell
//! "unknown" apart from "uncorrelated".

use serde::Serialize;
use std::collections::BTreeMap;

use crate::domain::returns::{pearson, ReturnSeries};

/// Default minimum number of shared observations for a defined correlation.
pub const MIN_OVERLAP: usize = 20;

const POWER_ITERATIONS: usize = 200;
const MAX_COMPONENTS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Correlation {
    Defined { value: f64 },
    Undefined { overlap: usize },
}

impl Correlation {
    pub fn value(self) -> Option<f64> {
        match self {
            Correlation::Defined { value } => Some(value),
            Correlation::Undefined { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationMatrix {
    symbols: Vec<String>,
    cells: Vec<Correlation>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelatedPair {
    pub a: String,
    pub b: String,
    pub correlation: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationSummary {
    pub average: Option<f64>,
    pub max: Option<f64>,
    pub min: Option<f64>,
    pub defined_pairs: usize,
    pub undefined_pairs: usize,
}

impl CorrelationMatrix {
    /// Build the matrix from return series; symbols keep the order given.
    pub fn compute(series: &[ReturnSeries], min_overlap: usize) -> Self {
        let n = series.len();
        let mut cells = vec![Correlation::Undefined { overlap: 0 }; n * n];

        for i in 0..n {
            cells[i * n + i] = Correlation::Defined { value: 1.0 };
            for j in (i + 1)..n {
                let (x, y) = series[i].aligned_with(&series[j]);
                let cell = if x.len() < min_overlap.max(2) {
                    Correlation::Undefined { overlap: x.len() }
                } else {
                    match pearson(&x, &y) {
                        Some(value) => Correlation::Defined { value },
                        None => Correlation::Undefined { overlap: x.len() },
                    }
                };
                cells[i * n + j] = cell;
                cells[j * n + i] = cell;
            }
        }

        CorrelationMatrix {
            symbols: series.iter().map(|s| s.symbol.clone()).collect(),
            cells,
        }
    }

    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    fn index_of(&self, symbol: &str) -> Option<usize> {
        self.symbols.iter().position(|s| s == symbol)
    }

    /// `None` when either symbol is not part of the matrix.
    pub fn get(&self, a: &str, b: &str) -> Option<Correlation> {
        let i = self.index_of(a)?;
        let j = self.index_of(b)?;
        Some(self.cells[i * self.symbols.len() + j])
    }

    fn at(&self, i: usize, j: usize) -> Correlation {
        self.cells[i * self.symbols.len() + j]
    }

    fn off_diagonal(&self) -> impl Iterator<Item = (usize, usize, Correlation)> + '_ {
        let n = self.symbols.len();
        (0..n).flat_map(move |i| ((i + 1)..n).map(move |j| (i, j, self.at(i, j))))
    }

    /// Pairs with |r| at or above `threshold`, strongest first.
    pub fn high_pairs(&self, threshold: f64) -> Vec<CorrelatedPair> {
        let mut pairs: Vec<CorrelatedPair> = self
            .off_diagonal()
            .filter_map(|(i, j, c)| {
                let r = c.value()?;
                (r.abs() >= threshold).then(|| CorrelatedPair {
                    a: self.symbols[i].clone(),
                    b: self.symbols[j].clone(),
                    correlation: r,
                })
            })
            .collect();
        pairs.sort_by(|p, q| {
            q.correlation
                .abs()
                .total_cmp(&p.correlation.abs())
                .then_with(|| p.a.cmp(&q.a))
                .then_with(|| p.b.cmp(&q.b))
        });
        pairs
    }

    pub fn summary(&self) -> CorrelationSummary {
        let mut defined = Vec::new();
        let mut undefined_pairs = 0;
        for (_, _, c) in self.off_diagonal() {
            match c.value() {
                Some(r) => defined.push(r),
                None => undefined_pairs += 1,
            }
        }
        CorrelationSummary {
            average: crate::domain::returns::mean(&defined),
            max: defined.iter().copied().reduce(f64::max),
            min: defined.iter().copied().reduce(f64::min),
            defined_pairs: defined.len(),
            undefined_pairs,
        }
    }

    /// Largest symbol subset whose pairwise correlations are all defined.
    ///
    /// Greedily drops the symbol with the most undefined pairs; ties go to the
    /// alphabetically later symbol so the result does not depend on input order.
    pub fn fully_defined_subset(&self) -> (Vec<usize>, Vec<String>) {
        let mut kept: Vec<usize> = (0..self.symbols.len()).collect();
        let mut excluded = Vec::new();

        loop {
            let worst = kept
                .iter()
                .map(|&i| {
                    let missing = kept
                        .iter()
                        .filter(|&&j| j != i && self.at(i, j).value().is_none())
                        .count();
                    (i, missing)
                })
                .filter(|&(_, missing)| missing > 0)
                .max_by(|a, b| {
                    a.1.cmp(&b.1)
                        .then_with(|| self.symbols[a.0].cmp(&self.symbols[b.0]))
                });

            match worst {
                Some((i, _)) => {
                    kept.retain(|&k| k != i);
                    excluded.push(self.symbols[i].clone());
                }
                None => break,
            }
        }

        excluded.sort();
        (kept, excluded)
    }

    pub fn factors(&self) -> FactorDecomposition {
        FactorDecomposition::compute(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FactorComponent {
    pub eigenvalue: f64,
    /// Share of total co-movement this component explains.
    pub explained: f64,
    pub loadings: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FactorDecomposition {
    pub components: Vec<FactorComponent>,
    pub excluded: Vec<String>,
}

impl FactorDecomposition {
    /// Power iteration with deflation over the fully-defined sub-matrix.
    pub fn compute(matrix: &CorrelationMatrix) -> Self {
        let (kept, excluded) = matrix.fully_defined_subset();
        let n = kept.len();
        if n == 0 {
            return FactorDecomposition {
                components: Vec::new(),
                excluded,
            };
        }

        let mut work: Vec<Vec<f64>> = kept
            .iter()
            .map(|&i| {
                kept.iter()
                    .map(|&j| matrix.at(i, j).value().unwrap_or(0.0))
                    .collect()
            })
            .collect();
        // trace of a correlation matrix = n
        let total = n as f64;
        let mut components = Vec::new();

        for _ in 0..n.min(MAX_COMPONENTS) {
            // asymmetric start so deflated components are not orthogonal to it
            let seed: Vec<f64> = (1..=n).map(|k| k as f64).collect();
            let seed_norm = seed.iter().map(|x| x * x).sum::<f64>().sqrt();
            let mut v: Vec<f64> = seed.into_iter().map(|x| x / seed_norm).collect();
            for _ in 0..POWER_ITERATIONS {
                let next = mat_vec(&work, &v);
                let norm = next.iter().map(|x| x * x).sum::<f64>().sqrt();
                if norm < 1e-12 {
                    break;
                }
                v = next.into_iter().map(|x| x / norm).collect();
            }

            let av = mat_vec(&work, &v);
            let eigenvalue: f64 = v.iter().zip(&av).map(|(a, b)| a * b).sum();
            if eigenvalue <= 1e-9 {
                break;
            }

            if v.iter().sum::<f64>() < 0.0 {
                v.iter_mut().for_each(|x| *x = -*x);
            }

            for r in 0..n {
                for c in 0..n {
                    work[r][c] -= eigenvalue * v[r] * v[c];
                }
            }

            components.push(FactorComponent {
                eigenvalue,
                explained: eigenvalue / total,
                loadings: kept
                    .iter()
                    .zip(&v)
                    .map(|(&i, &l)| (matrix.symbols[i].clone(), l))
                    .collect(),
            });
        }

        FactorDecomposition {
            components,
            excluded,
        }
    }

    /// Share of co-movement explained by the first component, if any.
    pub fn dominant_share(&self) -> Option<f64> {
        self.components.first().map(|c| c.explained)
    }
}

fn mat_vec(m: &[Vec<f64>], v: &[f64]) -> Vec<f64> {
    m.iter()
        .map(|row| row.iter().zip(v).map(|(a, b)| a * b).sum())
        .collect()
}
