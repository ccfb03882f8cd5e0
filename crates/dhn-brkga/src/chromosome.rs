//! The BRKGA chromosome (spec.md §3): a vector of reals in `[0,1]`, one per encoded
//! token. Genes carry no meaning on their own; only their relative order, recovered by
//! the decoder, does.

use rand::Rng;
use rand_chacha::ChaCha8Rng;

#[derive(Debug, Clone, PartialEq)]
pub struct Chromosome {
    pub keys: Vec<f64>,
}

impl Chromosome {
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn random(len: usize, rng: &mut ChaCha8Rng) -> Self {
        Self {
            keys: (0..len).map(|_| rng.gen_range(0.0..1.0)).collect(),
        }
    }

    /// Biased uniform crossover (spec.md §4.6 step 3): each gene comes from `elite` with
    /// probability `bias`, else from `other`.
    pub fn crossover(elite: &Chromosome, other: &Chromosome, bias: f64, rng: &mut ChaCha8Rng) -> Self {
        debug_assert_eq!(elite.len(), other.len());
        let keys = elite
            .keys
            .iter()
            .zip(&other.keys)
            .map(|(&e, &o)| if rng.gen_range(0.0..1.0) < bias { e } else { o })
            .collect();
        Self { keys }
    }
}
