use rand::rngs::{StdRng, ThreadRng};
use rand::{Rng, SeedableRng};
use sha2::{Digest, Sha256};

/// Where shuffle randomness comes from. One instance is used for every group
/// of a single run.
pub trait RandomSource {
    /// Uniform index in `0..bound`. `bound` is never zero.
    fn next_index(&mut self, bound: usize) -> usize;

    /// Unbiased Fisher-Yates shuffle in place.
    fn shuffle(&mut self, names: &mut [String]) {
        let mut i = names.len();
        while i > 1 {
            i -= 1;
            let j = self.next_index(i + 1);
            if j != i {
                names.swap(i, j);
            }
        }
    }
}

/// Reproducible source derived from a seed phrase.
pub struct SeededSource {
    rng: StdRng,
}

impl SeededSource {
    pub fn new(seed: &str) -> Self {
        Self::from_numeric(numeric_seed(seed))
    }

    pub fn from_numeric(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl RandomSource for SeededSource {
    fn next_index(&mut self, bound: usize) -> usize {
        self.rng.gen_range(0..bound)
    }
}

/// Non-reproducible source backed by the thread-local generator.
pub struct EntropySource {
    rng: ThreadRng,
}

impl EntropySource {
    pub fn new() -> Self {
        Self {
            rng: rand::thread_rng(),
        }
    }
}

impl Default for EntropySource {
    fn default() -> Self {
        Self::new()
    }
}

impl RandomSource for EntropySource {
    fn next_index(&mut self, bound: usize) -> usize {
        self.rng.gen_range(0..bound)
    }
}

/// Blank seeds count as no seed.
pub fn random_source(seed: Option<&str>) -> Box<dyn RandomSource> {
    match seed.filter(|s| !s.is_empty()) {
        Some(seed) => Box::new(SeededSource::new(seed)),
        None => Box::new(EntropySource::new()),
    }
}

/// Full SHA-256 hex digest of the seed phrase.
pub fn seed_hash(seed: &str) -> String {
    hex::encode(Sha256::digest(seed.as_bytes()))
}

/// First 8 hex digits of the seed hash read as a number, i.e. the first four
/// digest bytes big-endian.
pub fn numeric_seed(seed: &str) -> u64 {
    let digest = Sha256::digest(seed.as_bytes());
    u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]]) as u64
}
