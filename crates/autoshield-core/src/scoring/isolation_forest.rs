use rand::rngs::StdRng;
use rand::seq::index;
use rand::{Rng, SeedableRng};

use crate::error::{PipelineError, Result};

use super::threshold::{label_below, percentile};
use super::Contamination;

pub const DEFAULT_SEED: u64 = 42;
pub const DEFAULT_TREES: usize = 100;
pub const DEFAULT_MAX_SAMPLES: usize = 256;

const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

#[derive(Debug, Clone)]
pub struct IsolationForestConfig {
    pub n_trees: usize,
    pub max_samples: usize,
    pub seed: u64,
}

impl Default for IsolationForestConfig {
    fn default() -> Self {
        Self {
            n_trees: DEFAULT_TREES,
            max_samples: DEFAULT_MAX_SAMPLES,
            seed: DEFAULT_SEED,
        }
    }
}

#[derive(Debug, Clone)]
enum Node {
    Split {
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
    Leaf {
        size: usize,
    },
}

#[derive(Debug, Clone)]
struct IsolationTree {
    root: Node,
}

impl IsolationTree {
    fn grow(points: Vec<f64>, height_limit: usize, rng: &mut StdRng) -> Self {
        Self {
            root: grow_node(points, 0, height_limit, rng),
        }
    }

    /// Edges walked to reach `x`'s leaf plus the expected remaining depth of that leaf.
    fn path_length(&self, x: f64) -> f64 {
        let mut node = &self.root;
        let mut depth = 0usize;
        loop {
            match node {
                Node::Split {
                    threshold,
                    left,
                    right,
                } => {
                    node = if x <= *threshold { left } else { right };
                    depth += 1;
                }
                Node::Leaf { size } => return depth as f64 + average_path_length(*size),
            }
        }
    }
}

fn grow_node(points: Vec<f64>, depth: usize, height_limit: usize, rng: &mut StdRng) -> Node {
    if depth >= height_limit || points.len() <= 1 {
        return Node::Leaf { size: points.len() };
    }

    let (min, max) = points
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &p| {
            (lo.min(p), hi.max(p))
        });
    if min >= max {
        return Node::Leaf { size: points.len() };
    }

    // threshold in [min, max) keeps both children non-empty
    let threshold = rng.gen_range(min..max);
    let (left, right): (Vec<f64>, Vec<f64>) = points.into_iter().partition(|&p| p <= threshold);

    Node::Split {
        threshold,
        left: Box::new(grow_node(left, depth + 1, height_limit, rng)),
        right: Box::new(grow_node(right, depth + 1, height_limit, rng)),
    }
}

/// Average path length of an unsuccessful binary-search-tree lookup among `n` points.
pub(crate) fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        }
    }
}

/// An isolation ensemble fitted on one feature, reusable for scoring new points.
#[derive(Debug, Clone)]
pub struct FittedIsolationForest {
    trees: Vec<IsolationTree>,
    sample_size: usize,
    offset: f64,
    contamination: Contamination,
}

impl IsolationForestConfig {
    pub fn fit(&self, data: &[f64], contamination: Contamination) -> Result<FittedIsolationForest> {
        if data.len() < 2 {
            return Err(PipelineError::InsufficientRows {
                detector: "isolation forest",
                required: 2,
                found: data.len(),
            });
        }
        if self.n_trees == 0 || self.max_samples == 0 {
            return Err(PipelineError::Config(
                "isolation forest needs at least one tree and one sample per tree".to_string(),
            ));
        }

        let sample_size = self.max_samples.min(data.len());
        let height_limit = (sample_size.max(2) as f64).log2().ceil() as usize;
        let mut rng = StdRng::seed_from_u64(self.seed);

        let trees = (0..self.n_trees)
            .map(|_| {
                let points = index::sample(&mut rng, data.len(), sample_size)
                    .into_iter()
                    .map(|idx| data[idx])
                    .collect();
                IsolationTree::grow(points, height_limit, &mut rng)
            })
            .collect();

        let mut forest = FittedIsolationForest {
            trees,
            sample_size,
            offset: 0.0,
            contamination,
        };
        let training_scores = forest.score_samples(data);
        forest.offset = percentile(&training_scores, contamination.as_percent());
        Ok(forest)
    }
}

impl FittedIsolationForest {
    /// Normality scores: the negated anomaly score `2^(-E[h(x)] / c(sample_size))`.
    /// Lower means more anomalous.
    pub fn score_samples(&self, data: &[f64]) -> Vec<f64> {
        let normaliser = average_path_length(self.sample_size);
        let n_trees = self.trees.len() as f64;
        data.iter()
            .map(|&x| {
                let mean_depth =
                    self.trees.iter().map(|tree| tree.path_length(x)).sum::<f64>() / n_trees;
                let anomaly_score = if normaliser > 0.0 {
                    2f64.powf(-mean_depth / normaliser)
                } else {
                    1.0
                };
                -anomaly_score
            })
            .collect()
    }

    /// Score relative to the fitted threshold; negative values are outliers.
    pub fn decision_function(&self, data: &[f64]) -> Vec<f64> {
        self.score_samples(data)
            .into_iter()
            .map(|score| score - self.offset)
            .collect()
    }

    /// Binary labels for `data`: 1 = outlier, 0 = inlier.
    pub fn predict(&self, data: &[f64]) -> Vec<i32> {
        label_below(&self.score_samples(data), self.offset)
    }

    pub fn offset(&self) -> f64 {
        self.offset
    }

    pub fn contamination(&self) -> Contamination {
        self.contamination
    }

    pub fn sample_size(&self) -> usize {
        self.sample_size
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spiked_series() -> Vec<f64> {
        let mut data: Vec<f64> = (0..200).map(|i| (i as f64 * 0.37).sin()).collect();
        data[120] = 25.0;
        data
    }

    #[test]
    fn average_path_length_matches_reference_values() {
        assert_eq!(average_path_length(0), 0.0);
        assert_eq!(average_path_length(1), 0.0);
        assert_eq!(average_path_length(2), 1.0);
        // 2 * (ln(255) + gamma) - 2 * 255 / 256
        assert!((average_path_length(256) - 10.244_770_920_119_917).abs() < 1e-9);
    }

    #[test]
    fn isolates_the_spike() {
        let data = spiked_series();
        let contamination = Contamination::new(0.01).unwrap();
        let forest = IsolationForestConfig::default()
            .fit(&data, contamination)
            .expect("fit");

        let labels = forest.predict(&data);
        assert_eq!(labels[120], 1);
        let scores = forest.score_samples(&data);
        let min_idx = scores
            .iter()
            .enumerate()
            .min_by(|a, b| a.1.partial_cmp(b.1).unwrap())
            .map(|(idx, _)| idx)
            .unwrap();
        assert_eq!(min_idx, 120);
        assert!(forest.decision_function(&[25.0])[0] < 0.0);
    }

    #[test]
    fn same_seed_same_model() {
        let data = spiked_series();
        let contamination = Contamination::new(0.05).unwrap();
        let config = IsolationForestConfig::default();
        let first = config.fit(&data, contamination).unwrap();
        let second = config.fit(&data, contamination).unwrap();
        assert_eq!(first.score_samples(&data), second.score_samples(&data));
        assert_eq!(first.offset(), second.offset());
    }

    #[test]
    fn sample_size_is_capped_by_rows() {
        let data = spiked_series();
        let forest = IsolationForestConfig::default()
            .fit(&data, Contamination::default())
            .unwrap();
        assert_eq!(forest.sample_size(), 200);
        assert_eq!(forest.n_trees(), DEFAULT_TREES);
    }

    #[test]
    fn rejects_single_row() {
        let err = IsolationForestConfig::default()
            .fit(&[1.0], Contamination::default())
            .unwrap_err();
        assert!(matches!(err, PipelineError::InsufficientRows { .. }));
    }
}
