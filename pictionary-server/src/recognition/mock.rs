use pictionary_core::guess_matcher::normalize;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

/// Canned wrong answers the mock draws from.
pub const MOCK_VOCABULARY: [&str; 8] = [
    "CIRCLE", "SQUARE", "TRIANGLE", "LINE", "SHAPE", "OBJECT", "DRAWING", "SKETCH",
];

/// Attempts before the mock may start naming the target.
pub const MIN_ATTEMPTS_BEFORE_CORRECT: u32 = 5;
/// Attempts after which the mock always names the target.
pub const MAX_ATTEMPTS_BEFORE_CORRECT: u32 = 7;

/// Stand-in recognizer used without a credential or when the remote call
/// fails. Guesses wrong for the first few attempts, then puts the target
/// in the second slot.
#[derive(Debug)]
pub struct MockGuesser {
    attempts: u32,
    rng: StdRng,
}

impl MockGuesser {
    pub fn new() -> Self {
        Self {
            attempts: 0,
            rng: StdRng::from_entropy(),
        }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            attempts: 0,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn reset(&mut self) {
        self.attempts = 0;
    }

    pub fn generate(&mut self, target: &str) -> Vec<String> {
        self.attempts += 1;

        // Threshold is re-rolled every call
        let threshold = self
            .rng
            .gen_range(MIN_ATTEMPTS_BEFORE_CORRECT..=MAX_ATTEMPTS_BEFORE_CORRECT);

        if self.attempts >= threshold {
            vec![self.canned(), normalize(target), self.canned()]
        } else {
            vec![self.canned(), self.canned(), self.canned()]
        }
    }

    fn canned(&mut self) -> String {
        MOCK_VOCABULARY
            .choose(&mut self.rng)
            .copied()
            .unwrap_or("SHAPE")
            .to_string()
    }
}

impl Default for MockGuesser {
    fn default() -> Self {
        Self::new()
    }
}
