//! Bag randomizer: shuffled permutations of `0..max`, one after another.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use std::collections::VecDeque;

#[derive(Debug, Clone)]
pub struct PermutationGenerator {
    max: usize,
    queue: VecDeque<usize>,
    rng: StdRng,
}

impl PermutationGenerator {
    pub fn new(max: usize, rng: StdRng) -> Self {
        let mut generator = Self {
            max,
            queue: VecDeque::with_capacity(max * 2),
            rng,
        };
        generator.fill();
        generator
    }

    pub fn with_seed(max: usize, seed: u64) -> Self {
        Self::new(max, StdRng::seed_from_u64(seed))
    }

    pub fn from_entropy(max: usize) -> Self {
        Self::new(max, StdRng::from_entropy())
    }

    /// Append one freshly shuffled permutation.
    fn fill(&mut self) {
        let mut bag: Vec<usize> = (0..self.max).collect();
        bag.shuffle(&mut self.rng);
        self.queue.extend(bag);
    }

    fn top_up(&mut self) {
        if self.queue.len() < self.max {
            self.fill();
        }
    }

    /// Look `index` draws ahead without consuming anything. Valid for `index < max`.
    pub fn peek(&mut self, index: usize) -> Option<usize> {
        self.top_up();
        self.queue.get(index).copied()
    }

    pub fn next(&mut self) -> usize {
        self.top_up();
        // top_up guarantees at least `max` entries; max == 0 yields 0
        self.queue.pop_front().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_each_bag_is_a_permutation() {
        let mut bag = PermutationGenerator::with_seed(7, 42);
        for _ in 0..20 {
            let mut window: Vec<usize> = (0..7).map(|_| bag.next()).collect();
            window.sort_unstable();
            assert_eq!(window, (0..7).collect::<Vec<_>>());
        }
    }

    #[test]
    fn test_peek_does_not_consume() {
        let mut bag = PermutationGenerator::with_seed(7, 3);
        let ahead = bag.peek(0);
        assert_eq!(bag.peek(0), ahead);
        assert_eq!(Some(bag.next()), ahead);
    }

    #[test]
    fn test_peek_sees_into_next_bag() {
        let mut bag = PermutationGenerator::with_seed(7, 9);
        for _ in 0..6 {
            bag.next();
        }
        let last = bag.peek(0);
        let following = bag.peek(1);
        assert!(following.is_some());
        assert_eq!(Some(bag.next()), last);
        assert_eq!(Some(bag.next()), following);
    }

    #[test]
    fn test_same_seed_same_sequence() {
        let mut a = PermutationGenerator::with_seed(7, 11);
        let mut b = PermutationGenerator::with_seed(7, 11);
        for _ in 0..30 {
            assert_eq!(a.next(), b.next());
        }
    }
}
