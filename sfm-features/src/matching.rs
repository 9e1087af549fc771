use crate::Descriptor;
use float_ord::FloatOrd;
use log::*;
use sfm_core::Match;

#[cfg(feature = "rayon")]
use rayon::prelude::*;

#[cfg(feature = "serde-serialize")]
use serde::{Deserialize, Serialize};

/// Nearest-neighbor descriptor matching with Lowe's ratio test.
#[derive(Debug, Copy, Clone, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde-serialize", serde(rename_all = "kebab-case"))]
pub enum Matcher {
    /// Accept `(i, j)` if the best distance is below `ratio` times the second best.
    Ratio(f64),
    /// The ratio test, plus the best match of `j` over the first set must be `i`.
    Mutual(f64),
}

impl Default for Matcher {
    fn default() -> Self {
        Matcher::Ratio(0.8)
    }
}

impl Matcher {
    /// The mutual variant with its usual ratio.
    pub fn mutual() -> Self {
        Matcher::Mutual(0.75)
    }

    pub fn ratio(self) -> f64 {
        match self {
            Matcher::Ratio(ratio) | Matcher::Mutual(ratio) => ratio,
        }
    }

    /// Match every descriptor of `a` against `b`.
    ///
    /// Matches come out ordered by their index in `a`, and each index of `a` appears at most once.
    ///
    /// ```
    /// use sfm_core::Match;
    /// use sfm_features::{Descriptor, Matcher};
    ///
    /// let a = vec![Descriptor(vec![0.0, 1.0]), Descriptor(vec![5.0, 5.0])];
    /// let b = vec![Descriptor(vec![5.0, 4.5]), Descriptor(vec![0.0, 1.5])];
    /// assert_eq!(Matcher::default().match_descriptors(&a, &b), vec![Match(0, 1), Match(1, 0)]);
    /// ```
    pub fn match_descriptors(self, a: &[Descriptor], b: &[Descriptor]) -> Vec<Match> {
        let ratio = self.ratio();
        let forward = |(i, descriptor): (usize, &Descriptor)| {
            let (j, best, second) = two_nearest(descriptor, b)?;
            if best >= ratio * second {
                return None;
            }
            if let Matcher::Mutual(_) = self {
                let (back, _, _) = two_nearest(&b[j], a)?;
                if back != i {
                    return None;
                }
            }
            Some(Match(i, j))
        };
        #[cfg(not(feature = "rayon"))]
        let matches: Vec<Match> = a.iter().enumerate().filter_map(forward).collect();
        #[cfg(feature = "rayon")]
        let matches: Vec<Match> = a.par_iter().enumerate().filter_map(forward).collect();
        debug!(
            "Matched {} of {} descriptors against {}",
            matches.len(),
            a.len(),
            b.len()
        );
        matches
    }
}

/// Returns the index of the nearest descriptor, its distance, and the second smallest distance.
///
/// The first index wins ties. With a single candidate the second distance is infinite.
fn two_nearest(descriptor: &Descriptor, candidates: &[Descriptor]) -> Option<(usize, f64, f64)> {
    let (best_index, best) = candidates
        .iter()
        .map(|candidate| descriptor.distance(candidate))
        .enumerate()
        .min_by_key(|&(_, distance)| FloatOrd(distance))?;
    let second = candidates
        .iter()
        .enumerate()
        .filter(|&(j, _)| j != best_index)
        .map(|(_, candidate)| FloatOrd(descriptor.distance(candidate)))
        .min()
        .map_or(f64::INFINITY, |FloatOrd(distance)| distance);
    Some((best_index, best, second))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};
    use rand_pcg::Pcg64;

    fn random_descriptors(count: usize, seed: u64) -> Vec<Descriptor> {
        let mut rng = Pcg64::seed_from_u64(seed);
        (0..count)
            .map(|_| Descriptor((0..81).map(|_| rng.gen_range(-2.0..2.0)).collect()))
            .collect()
    }

    #[test]
    fn identical_sets_match_to_identity() {
        let descriptors = random_descriptors(50, 1);
        for matcher in [Matcher::Ratio(0.8), Matcher::Ratio(0.1), Matcher::mutual()] {
            let matches = matcher.match_descriptors(&descriptors, &descriptors);
            let identity: Vec<Match> = (0..50).map(|i| Match(i, i)).collect();
            assert_eq!(matches, identity);
        }
    }

    #[test]
    fn empty_candidates_give_no_matches() {
        let descriptors = random_descriptors(3, 2);
        assert!(Matcher::default().match_descriptors(&descriptors, &[]).is_empty());
        assert!(Matcher::default().match_descriptors(&[], &descriptors).is_empty());
    }

    #[test]
    fn single_candidate_always_passes_ratio() {
        let a = random_descriptors(2, 3);
        let b = random_descriptors(1, 4);
        let matches = Matcher::default().match_descriptors(&a, &b);
        assert_eq!(matches, vec![Match(0, 0), Match(1, 0)]);
    }

    #[test]
    fn ambiguous_matches_are_rejected() {
        let a = vec![Descriptor(vec![0.0, 0.0])];
        let b = vec![Descriptor(vec![1.0, 0.0]), Descriptor(vec![0.0, 1.05])];
        assert!(Matcher::Ratio(0.8).match_descriptors(&a, &b).is_empty());
        assert_eq!(Matcher::Ratio(0.99).match_descriptors(&a, &b), vec![Match(0, 0)]);
    }

    #[test]
    fn mutual_rejects_one_sided_matches() {
        let a = vec![Descriptor(vec![0.0]), Descriptor(vec![0.9])];
        let b = vec![Descriptor(vec![1.0]), Descriptor(vec![10.0])];
        // Both descriptors of `a` pick b[0], but b[0] is nearest to a[1].
        let one_sided = Matcher::Ratio(0.75).match_descriptors(&a, &b);
        assert_eq!(one_sided, vec![Match(0, 0), Match(1, 0)]);
        let mutual = Matcher::Mutual(0.75).match_descriptors(&a, &b);
        assert_eq!(mutual, vec![Match(1, 0)]);
    }
}
