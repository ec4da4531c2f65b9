use std::cmp::Ordering;

use crate::error::{PipelineError, Result};

use super::threshold::{label_below, percentile};
use super::Contamination;

pub const DEFAULT_NEIGHBORS: usize = 20;

/// Guards the density against division by zero when neighbours coincide.
const DENSITY_EPSILON: f64 = 1e-10;

/// Local Outlier Factor over a single feature.
///
/// There is no fitted state to keep: the factor of a point only exists relative to the set it
/// was computed on, so fitting and labelling happen in one call.
#[derive(Debug, Clone)]
pub struct LocalOutlierFactor {
    n_neighbors: usize,
}

impl Default for LocalOutlierFactor {
    fn default() -> Self {
        Self {
            n_neighbors: DEFAULT_NEIGHBORS,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LofOutcome {
    /// 1 = outlier, 0 = inlier.
    pub labels: Vec<i32>,
    /// `-LOF` per row; lower is more anomalous.
    pub negative_outlier_factor: Vec<f64>,
    pub offset: f64,
    /// Neighbour count actually used, capped at `rows - 1`.
    pub n_neighbors: usize,
}

struct Neighborhood {
    indices: Vec<usize>,
    distances: Vec<f64>,
}

impl Neighborhood {
    fn k_distance(&self) -> f64 {
        self.distances.last().copied().unwrap_or(0.0)
    }
}

impl LocalOutlierFactor {
    pub fn new(n_neighbors: usize) -> Self {
        Self { n_neighbors }
    }

    pub fn n_neighbors(&self) -> usize {
        self.n_neighbors
    }

    pub fn fit_predict(&self, data: &[f64], contamination: Contamination) -> Result<LofOutcome> {
        if data.len() < 2 {
            return Err(PipelineError::InsufficientRows {
                detector: "local outlier factor",
                required: 2,
                found: data.len(),
            });
        }
        if self.n_neighbors == 0 {
            return Err(PipelineError::Config(
                "local outlier factor needs at least one neighbour".to_string(),
            ));
        }

        let k = self.n_neighbors.min(data.len() - 1);
        let neighborhoods = nearest_neighbors(data, k);
        let k_distances: Vec<f64> = neighborhoods.iter().map(Neighborhood::k_distance).collect();

        let densities: Vec<f64> = neighborhoods
            .iter()
            .map(|hood| {
                let reach_sum: f64 = hood
                    .indices
                    .iter()
                    .zip(hood.distances.iter())
                    .map(|(&neighbor, &distance)| k_distances[neighbor].max(distance))
                    .sum();
                1.0 / (reach_sum / k as f64 + DENSITY_EPSILON)
            })
            .collect();

        let negative_outlier_factor: Vec<f64> = neighborhoods
            .iter()
            .zip(densities.iter())
            .map(|(hood, &density)| {
                let neighbor_density: f64 =
                    hood.indices.iter().map(|&neighbor| densities[neighbor]).sum::<f64>()
                        / k as f64;
                -(neighbor_density / density)
            })
            .collect();

        let offset = percentile(&negative_outlier_factor, contamination.as_percent());
        let labels = label_below(&negative_outlier_factor, offset);

        Ok(LofOutcome {
            labels,
            negative_outlier_factor,
            offset,
            n_neighbors: k,
        })
    }
}

/// k nearest neighbours of every point, excluding the point itself, nearest first.
///
/// With one feature the neighbours of a point are contiguous in sorted order, so each
/// neighbourhood is found by walking outwards from the point's rank.
fn nearest_neighbors(data: &[f64], k: usize) -> Vec<Neighborhood> {
    let mut order: Vec<usize> = (0..data.len()).collect();
    order.sort_by(|&a, &b| data[a].partial_cmp(&data[b]).unwrap_or(Ordering::Equal));

    let mut hoods: Vec<Option<Neighborhood>> = (0..data.len()).map(|_| None).collect();

    for (rank, &point) in order.iter().enumerate() {
        let x = data[point];
        let mut indices = Vec::with_capacity(k);
        let mut distances = Vec::with_capacity(k);
        let mut below = rank;
        let mut above = rank + 1;

        while indices.len() < k {
            let left = below.checked_sub(1).map(|r| (r, x - data[order[r]]));
            let right = order.get(above).map(|&idx| (above, data[idx] - x));

            let take_left = match (left, right) {
                (Some((_, dl)), Some((_, dr))) => dl <= dr,
                (Some(_), None) => true,
                (None, Some(_)) => false,
                (None, None) => break,
            };

            if take_left {
                if let Some((r, distance)) = left {
                    indices.push(order[r]);
                    distances.push(distance);
                    below = r;
                }
            } else if let Some((r, distance)) = right {
                indices.push(order[r]);
                distances.push(distance);
                above = r + 1;
            }
        }

        hoods[point] = Some(Neighborhood { indices, distances });
    }

    hoods
        .into_iter()
        .map(|hood| {
            hood.unwrap_or(Neighborhood {
                indices: Vec::new(),
                distances: Vec::new(),
            })
        })
        .collect()
}
