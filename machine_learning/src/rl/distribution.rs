use rand::Rng;

/// A categorical distribution over a discrete action space.
#[derive(Debug, Clone, PartialEq)]
pub struct Categorical {
    probs: Vec<f32>,
    log_probs: Vec<f32>,
}

impl Categorical {
    /// Builds the distribution `softmax(logits)`.
    ///
    /// # Panics
    /// If `logits` is empty.
    pub fn from_logits(logits: &[f32]) -> Self {
        assert!(!logits.is_empty(), "a categorical needs at least one outcome");

        let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        let shifted: Vec<f32> = logits.iter().map(|l| l - max).collect();
        let exps: Vec<f32> = shifted.iter().map(|s| s.exp()).collect();
        let sum: f32 = exps.iter().sum();

        // Both stay relative to the max logit, large logits would cancel out otherwise.
        let log_sum = sum.ln();
        let log_probs = shifted.iter().map(|s| s - log_sum).collect();
        let probs = exps.iter().map(|e| e / sum).collect();

        Self { probs, log_probs }
    }

    pub fn probs(&self) -> &[f32] {
        &self.probs
    }

    pub fn log_prob(&self, action: usize) -> f32 {
        self.log_probs[action]
    }

    /// The amount of outcomes.
    pub fn len(&self) -> usize {
        self.probs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.probs.is_empty()
    }

    /// Shannon entropy in nats.
    pub fn entropy(&self) -> f32 {
        -self
            .probs
            .iter()
            .zip(&self.log_probs)
            .map(|(p, lp)| p * lp)
            .sum::<f32>()
    }

    /// Draws an action index by inverting the cumulative distribution.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> usize {
        let u: f32 = rng.random();
        let mut acc = 0.;

        for (action, p) in self.probs.iter().enumerate() {
            acc += p;
            if u < acc {
                return action;
            }
        }

        // Rounding can leave the cumulative sum just under 1.
        self.probs.len() - 1
    }
}
