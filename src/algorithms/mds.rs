//! Metric multidimensional scaling (SMACOF) in two dimensions
//!
//! Minimises raw stress `sum_{i<j} w_ij (d_ij(X) - delta_ij)^2` by Guttman
//! transform iterations. Starting configurations are the classical
//! (Torgerson) solution followed by `n_init` seeded random configurations;
//! the embedding with the lowest stress wins, ties going to the earlier
//! start, so identical input always yields identical output.

use nalgebra::{DMatrix, SymmetricEigen};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::core::DEFAULT_EMBEDDING_SEED;

const DIMENSIONS: usize = 2;

/// Relative tolerance for symmetry of the dissimilarity matrix
const SYMMETRY_TOLERANCE: f64 = 1e-9;

/// Singular values below this (relative) are treated as zero in V+
const PSEUDO_INVERSE_EPS: f64 = 1e-10;

/// Embedding failures
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MdsError {
    #[error("dissimilarity matrix is {rows}x{cols}, expected square")]
    NotSquare { rows: usize, cols: usize },
    #[error("dissimilarity matrix is not symmetric at ({row}, {col})")]
    NotSymmetric { row: usize, col: usize },
    #[error("dissimilarity ({row}, {col}) is negative or not finite")]
    InvalidDissimilarity { row: usize, col: usize },
    #[error("weight matrix shape does not match the dissimilarities")]
    WeightShape,
    #[error("weighted Guttman transform has no pseudo-inverse: {0}")]
    Singular(String),
}

/// SMACOF parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MdsConfig {
    /// Seed for the random starting configurations
    pub seed: u64,
    /// Number of random starts in addition to the classical start
    pub n_init: usize,
    /// Iteration cap per start
    pub max_iter: usize,
    /// Stop when the relative stress decrease falls below this
    pub eps: f64,
    /// Also start from the classical (Torgerson) solution
    pub classical_start: bool,
}

impl Default for MdsConfig {
    fn default() -> Self {
        Self {
            seed: DEFAULT_EMBEDDING_SEED,
            n_init: 4,
            max_iter: 300,
            eps: 1e-6,
            classical_start: true,
        }
    }
}

/// 2-D configuration, one row per input row
#[derive(Debug, Clone, PartialEq)]
pub struct Embedding {
    pub points: DMatrix<f64>,
    pub stress: f64,
    pub iterations: usize,
}

impl Embedding {
    pub fn point(&self, i: usize) -> (f64, f64) {
        (self.points[(i, 0)], self.points[(i, 1)])
    }
}

/// Embed a symmetric dissimilarity matrix in 2-D
///
/// `weights` of `None` means every off-diagonal pair counts with weight 1.
pub fn smacof(
    dissimilarities: &DMatrix<f64>,
    weights: Option<&DMatrix<f64>>,
    config: &MdsConfig,
) -> Result<Embedding, MdsError> {
    validate(dissimilarities)?;
    let n = dissimilarities.nrows();
    if n == 0 {
        return Ok(Embedding {
            points: DMatrix::zeros(0, DIMENSIONS),
            stress: 0.0,
            iterations: 0,
        });
    }

    let weights = match weights {
        Some(w) if w.shape() != dissimilarities.shape() => return Err(MdsError::WeightShape),
        Some(w) => DMatrix::from_fn(n, n, |i, j| if i == j { 0.0 } else { w[(i, j)].max(0.0) }),
        None => DMatrix::from_fn(n, n, |i, j| if i == j { 0.0 } else { 1.0 }),
    };

    let v_plus = guttman_pseudo_inverse(&weights)?;
    let scale = largest_magnitude(dissimilarities);

    let mut starts = Vec::with_capacity(config.n_init + 1);
    if config.classical_start {
        starts.push(classical(dissimilarities));
    }
    let mut rng = StdRng::seed_from_u64(config.seed);
    for _ in 0..config.n_init {
        starts.push(DMatrix::from_fn(n, DIMENSIONS, |_, _| rng.gen::<f64>() * scale));
    }

    let mut best: Option<Embedding> = None;
    for (run, start) in starts.into_iter().enumerate() {
        let embedding = iterate(dissimilarities, &weights, &v_plus, start, config);
        debug!(run, stress = embedding.stress, iterations = embedding.iterations, "smacof run finished");
        if best.as_ref().map_or(true, |b| embedding.stress < b.stress) {
            best = Some(embedding);
        }
    }

    Ok(best.unwrap_or(Embedding {
        points: DMatrix::zeros(n, DIMENSIONS),
        stress: raw_stress(dissimilarities, &weights, &DMatrix::zeros(n, DIMENSIONS)),
        iterations: 0,
    }))
}

/// Classical scaling: top two eigenpairs of the double-centred squared distances
pub fn classical(dissimilarities: &DMatrix<f64>) -> DMatrix<f64> {
    let n = dissimilarities.nrows();
    let squared = dissimilarities.map(|d| d * d);
    let centering = DMatrix::<f64>::identity(n, n) - DMatrix::from_element(n, n, 1.0 / n as f64);
    let gram = &centering * squared * &centering * -0.5;
    let gram = (&gram + gram.transpose()) * 0.5;

    let eigen = SymmetricEigen::new(gram);
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| eigen.eigenvalues[b].total_cmp(&eigen.eigenvalues[a]));

    let mut points = DMatrix::zeros(n, DIMENSIONS);
    for (dim, &k) in order.iter().take(DIMENSIONS).enumerate() {
        let magnitude = eigen.eigenvalues[k].max(0.0).sqrt();
        for i in 0..n {
            points[(i, dim)] = eigen.eigenvectors[(i, k)] * magnitude;
        }
    }
    points
}

/// Weighted raw stress of `points` against `dissimilarities`
pub fn raw_stress(dissimilarities: &DMatrix<f64>, weights: &DMatrix<f64>, points: &DMatrix<f64>) -> f64 {
    let n = dissimilarities.nrows();
    let mut stress = 0.0;
    for i in 0..n {
        for j in (i + 1)..n {
            let d = row_distance(points, i, j);
            stress += weights[(i, j)] * (d - dissimilarities[(i, j)]).powi(2);
        }
    }
    stress
}

fn validate(dissimilarities: &DMatrix<f64>) -> Result<(), MdsError> {
    let (rows, cols) = dissimilarities.shape();
    if rows != cols {
        return Err(MdsError::NotSquare { rows, cols });
    }
    let scale = largest_magnitude(dissimilarities);
    for i in 0..rows {
        for j in 0..cols {
            let d = dissimilarities[(i, j)];
            if !d.is_finite() || d < 0.0 {
                return Err(MdsError::InvalidDissimilarity { row: i, col: j });
            }
            if (d - dissimilarities[(j, i)]).abs() > SYMMETRY_TOLERANCE * scale {
                return Err(MdsError::NotSymmetric { row: i, col: j });
            }
        }
    }
    Ok(())
}

fn guttman_pseudo_inverse(weights: &DMatrix<f64>) -> Result<DMatrix<f64>, MdsError> {
    let n = weights.nrows();
    let v = DMatrix::from_fn(n, n, |i, j| {
        if i == j {
            weights.row(i).sum() - weights[(i, i)]
        } else {
            -weights[(i, j)]
        }
    });
    v.pseudo_inverse(PSEUDO_INVERSE_EPS)
        .map_err(|e| MdsError::Singular(e.to_string()))
}

fn iterate(
    dissimilarities: &DMatrix<f64>,
    weights: &DMatrix<f64>,
    v_plus: &DMatrix<f64>,
    start: DMatrix<f64>,
    config: &MdsConfig,
) -> Embedding {
    let n = dissimilarities.nrows();
    let mut points = start;
    let mut stress = raw_stress(dissimilarities, weights, &points);
    let mut iterations = 0;

    while iterations < config.max_iter && stress > 0.0 {
        let mut b = DMatrix::zeros(n, n);
        for i in 0..n {
            for j in 0..n {
                if i == j {
                    continue;
                }
                let d = row_distance(&points, i, j);
                if d > 0.0 {
                    b[(i, j)] = -weights[(i, j)] * dissimilarities[(i, j)] / d;
                }
            }
            b[(i, i)] = -b.row(i).sum();
        }

        let next = v_plus * (b * &points);
        let next_stress = raw_stress(dissimilarities, weights, &next);
        iterations += 1;

        let converged = stress - next_stress <= config.eps * stress;
        points = next;
        stress = next_stress;
        if converged {
            break;
        }
    }

    Embedding {
        points,
        stress,
        iterations,
    }
}

fn largest_magnitude(m: &DMatrix<f64>) -> f64 {
    m.iter().fold(1.0, |acc, d| acc.max(d.abs()))
}

fn row_distance(points: &DMatrix<f64>, i: usize, j: usize) -> f64 {
    let dx = points[(i, 0)] - points[(j, 0)];
    let dy = points[(i, 1)] - points[(j, 1)];
    (dx * dx + dy * dy).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from_points(points: &[(f64, f64)]) -> DMatrix<f64> {
        let n = points.len();
        DMatrix::from_fn(n, n, |i, j| {
            let (dx, dy) = (points[i].0 - points[j].0, points[i].1 - points[j].1);
            (dx * dx + dy * dy).sqrt()
        })
    }

    fn assert_distances_match(embedding: &Embedding, target: &DMatrix<f64>, tolerance: f64) {
        let n = target.nrows();
        for i in 0..n {
            for j in (i + 1)..n {
                let d = row_distance(&embedding.points, i, j);
                let expected = target[(i, j)];
                assert!(
                    (d - expected).abs() <= tolerance * expected,
                    "pair ({}, {}): {} vs {}",
                    i,
                    j,
                    d,
                    expected
                );
            }
        }
    }

    #[test]
    fn test_right_triangle() {
        let target = DMatrix::from_row_slice(3, 3, &[0.0, 3000.0, 4000.0, 3000.0, 0.0, 5000.0, 4000.0, 5000.0, 0.0]);
        let embedding = smacof(&target, None, &MdsConfig::default()).unwrap();

        assert_eq!(embedding.points.shape(), (3, 2));
        assert_distances_match(&embedding, &target, 0.01);
    }

    #[test]
    fn test_random_starts_only() {
        let target = from_points(&[(0.0, 0.0), (5000.0, 0.0), (5000.0, 3000.0), (0.0, 3000.0), (2500.0, 1200.0)]);
        let config = MdsConfig {
            classical_start: false,
            n_init: 8,
            max_iter: 1000,
            ..Default::default()
        };
        let embedding = smacof(&target, None, &config).unwrap();

        assert_distances_match(&embedding, &target, 0.05);
    }

    #[test]
    fn test_deterministic_for_same_seed() {
        let target = from_points(&[(0.0, 0.0), (4200.0, 300.0), (3900.0, 3100.0), (-200.0, 2800.0)]);
        let config = MdsConfig {
            classical_start: false,
            ..Default::default()
        };

        let first = smacof(&target, None, &config).unwrap();
        let second = smacof(&target, None, &config).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_zero_weight_ignores_unknown_pair() {
        let truth = from_points(&[(0.0, 0.0), (3000.0, 0.0), (3000.0, 4000.0), (0.0, 4000.0), (1000.0, 1500.0)]);
        let mut observed = truth.clone();
        observed[(0, 2)] = 0.0;
        observed[(2, 0)] = 0.0;
        let mut weights = DMatrix::from_element(5, 5, 1.0);
        weights[(0, 2)] = 0.0;
        weights[(2, 0)] = 0.0;

        let embedding = smacof(&observed, Some(&weights), &MdsConfig::default()).unwrap();

        // The excluded diagonal is not pulled to zero
        assert!(row_distance(&embedding.points, 0, 2) > 4000.0);
        assert!((row_distance(&embedding.points, 0, 1) - 3000.0).abs() < 60.0);
    }

    #[test]
    fn test_rejects_invalid_input() {
        let rect = DMatrix::<f64>::zeros(2, 3);
        assert!(matches!(smacof(&rect, None, &MdsConfig::default()), Err(MdsError::NotSquare { .. })));

        let asym = DMatrix::from_row_slice(2, 2, &[0.0, 10.0, 0.0, 0.0]);
        assert!(matches!(smacof(&asym, None, &MdsConfig::default()), Err(MdsError::NotSymmetric { .. })));

        let negative = DMatrix::from_row_slice(2, 2, &[0.0, -1.0, -1.0, 0.0]);
        assert!(matches!(
            smacof(&negative, None, &MdsConfig::default()),
            Err(MdsError::InvalidDissimilarity { .. })
        ));
    }

    #[test]
    fn test_classical_recovers_square() {
        let target = from_points(&[(0.0, 0.0), (1000.0, 0.0), (1000.0, 1000.0), (0.0, 1000.0)]);
        let points = classical(&target);
        let embedding = Embedding {
            stress: 0.0,
            iterations: 0,
            points,
        };
        assert_distances_match(&embedding, &target, 1e-6);
    }
}
