use rand::Rng;
use std::sync::Mutex;

/// Source of the random choices made while generating quizzes (topics, difficulty,
/// question counts, title prefixes). Injected so tests can pin the outcome.
pub trait RandomSource: Send + Sync {
    /// Uniform index in `0..len`. `len` must be non-zero.
    fn pick_index(&self, len: usize) -> usize;

    /// Uniform value in `low..=high`
    fn in_range(&self, low: u32, high: u32) -> u32;
}

/// Thread-local `rand` generator
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn pick_index(&self, len: usize) -> usize {
        rand::thread_rng().gen_range(0..len)
    }

    fn in_range(&self, low: u32, high: u32) -> u32 {
        rand::thread_rng().gen_range(low..=high)
    }
}

/// Replays a fixed list of values, cycling when it runs out.
///
/// Each draw takes the next value `v` and maps it into the requested range:
/// `v % len` for indices and `low + v % (high - low + 1)` for ranges.
#[derive(Debug)]
pub struct ScriptedRandom {
    values: Vec<usize>,
    cursor: Mutex<usize>,
}

impl ScriptedRandom {
    pub fn new(values: Vec<usize>) -> Self {
        Self {
            values: if values.is_empty() { vec![0] } else { values },
            cursor: Mutex::new(0),
        }
    }

    /// Always draws the same value
    pub fn constant(value: usize) -> Self {
        Self::new(vec![value])
    }

    fn next_value(&self) -> usize {
        let mut cursor = self.cursor.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let value = self.values[*cursor % self.values.len()];
        *cursor += 1;
        value
    }
}

impl RandomSource for ScriptedRandom {
    fn pick_index(&self, len: usize) -> usize {
        self.next_value() % len
    }

    fn in_range(&self, low: u32, high: u32) -> u32 {
        let span = (high - low) as usize + 1;
        low + (self.next_value() % span) as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thread_random_stays_in_bounds() {
        let random = ThreadRandom;
        for _ in 0..500 {
            assert!(random.pick_index(29) < 29);
            let count = random.in_range(5, 20);
            assert!((5..=20).contains(&count));
        }
    }

    #[test]
    fn test_scripted_random_replays_and_cycles() {
        let random = ScriptedRandom::new(vec![1, 7, 30]);
        assert_eq!(random.pick_index(5), 1);
        assert_eq!(random.pick_index(5), 2);
        assert_eq!(random.in_range(5, 20), 19);
        // Wrapped back to the first value
        assert_eq!(random.in_range(5, 20), 6);
    }

    #[test]
    fn test_scripted_random_empty_script_draws_zero() {
        let random = ScriptedRandom::new(vec![]);
        assert_eq!(random.pick_index(10), 0);
        assert_eq!(random.in_range(5, 20), 5);
    }
}
