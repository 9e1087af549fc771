//! Random sample consensus over any [`Estimator`] from `sample-consensus`.
//!
//! The random source is supplied by the caller, so a seeded generator makes every run
//! reproducible. Enabling the `rayon` feature scores hypotheses in parallel without changing
//! the result.

use log::*;
use rand::{seq::index, Rng};
use sample_consensus::{Consensus, Estimator, Model};

#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// A model together with the indices of the data it explains.
struct Hypothesis<M> {
    model: M,
    inliers: Vec<usize>,
}

/// The best hypothesis seen so far along with the sample index it came from.
///
/// Merging keeps the most inliers and, on a tie, the lowest sample index, so partial tallies
/// can be combined in any order.
struct Tally<M> {
    best: Option<(usize, Hypothesis<M>)>,
    degenerate: usize,
}

impl<M> Default for Tally<M> {
    fn default() -> Self {
        Self {
            best: None,
            degenerate: 0,
        }
    }
}

impl<M> Tally<M> {
    fn push(self, ix: usize, hypothesis: Option<Hypothesis<M>>) -> Self {
        match hypothesis {
            Some(hypothesis) => self.merge(Self {
                best: Some((ix, hypothesis)),
                degenerate: 0,
            }),
            None => Self {
                degenerate: self.degenerate + 1,
                ..self
            },
        }
    }

    fn merge(self, other: Self) -> Self {
        let best = match (self.best, other.best) {
            (Some(a), Some(b)) => {
                let (a_len, b_len) = (a.1.inliers.len(), b.1.inliers.len());
                if b_len > a_len || (b_len == a_len && b.0 < a.0) {
                    Some(b)
                } else {
                    Some(a)
                }
            }
            (a, b) => a.or(b),
        };
        Self {
            best,
            degenerate: self.degenerate + other.degenerate,
        }
    }
}

/// Classic RANSAC: a fixed number of minimal samples, keeping the model with the most inliers.
///
/// Ties keep the hypothesis found first.
#[derive(Debug, Clone)]
pub struct Ransac<R> {
    /// Number of minimal samples drawn.
    pub iterations: usize,
    /// A datum is an inlier when its residual is strictly below this.
    pub threshold: f64,
    rng: R,
}

impl<R> Ransac<R>
where
    R: Rng,
{
    /// Creates RANSAC with `1000` iterations.
    pub fn new(threshold: f64, rng: R) -> Self {
        Self {
            iterations: 1000,
            threshold,
            rng,
        }
    }

    pub fn iterations(self, iterations: usize) -> Self {
        Self { iterations, ..self }
    }

    /// Draws every sample up front so that the generator is consumed in iteration order.
    fn draw_samples(&mut self, len: usize, amount: usize) -> Vec<Vec<usize>> {
        (0..self.iterations)
            .map(|_| index::sample(&mut self.rng, len, amount).into_vec())
            .collect()
    }
}

/// Scores every model the estimator produces for one sample, keeping the first best one.
fn evaluate<E, Data>(estimator: &E, data: &[Data], sample: &[usize], threshold: f64) -> Option<Hypothesis<E::Model>>
where
    E: Estimator<Data>,
    Data: Clone,
{
    let mut best: Option<Hypothesis<E::Model>> = None;
    for model in estimator.estimate(sample.iter().map(|&ix| data[ix].clone())) {
        let inliers: Vec<usize> = data
            .iter()
            .enumerate()
            .filter(|(_, datum)| model.residual(datum) < threshold)
            .map(|(ix, _)| ix)
            .collect();
        if best.as_ref().map_or(true, |best| inliers.len() > best.inliers.len()) {
            best = Some(Hypothesis { model, inliers });
        }
    }
    best
}

impl<E, Data, R> Consensus<E, Data> for Ransac<R>
where
    E: Estimator<Data> + Sync,
    E::Model: Send,
    Data: Clone + Send + Sync,
    R: Rng,
{
    type Inliers = Vec<usize>;

    fn model<I>(&mut self, estimator: &E, data: I) -> Option<E::Model>
    where
        I: Iterator<Item = Data> + Clone,
    {
        self.model_inliers(estimator, data).map(|(model, _)| model)
    }

    fn model_inliers<I>(&mut self, estimator: &E, data: I) -> Option<(E::Model, Self::Inliers)>
    where
        I: Iterator<Item = Data> + Clone,
    {
        let data: Vec<Data> = data.collect();
        if data.len() < E::MIN_SAMPLES {
            debug!(
                "RANSAC needs {} samples but only {} were given",
                E::MIN_SAMPLES,
                data.len()
            );
            return None;
        }
        let samples = self.draw_samples(data.len(), E::MIN_SAMPLES);
        let threshold = self.threshold;
        let score = |sample: &Vec<usize>| evaluate(estimator, &data, sample, threshold);

        #[cfg(not(feature = "rayon"))]
        let tally = samples
            .iter()
            .enumerate()
            .fold(Tally::default(), |tally, (ix, sample)| tally.push(ix, score(sample)));
        #[cfg(feature = "rayon")]
        let tally = samples
            .par_iter()
            .enumerate()
            .fold(Tally::default, |tally, (ix, sample)| tally.push(ix, score(sample)))
            .reduce(Tally::default, Tally::merge);

        if tally.degenerate > 0 {
            trace!("{} of {} RANSAC samples gave no model", tally.degenerate, samples.len());
        }
        let best = tally.best.map(|(_, hypothesis)| hypothesis);
        best.map(|Hypothesis { model, inliers }| {
            debug!("RANSAC kept a model with {} of {} inliers", inliers.len(), data.len());
            (model, inliers)
        })
    }
}
