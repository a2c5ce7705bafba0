// animation/path_animator.rs - Progressive reveal of the solution path markers

use crate::instancing::{InstanceBatch, REVEALED_SCALE};

/// Fractional reveal counter driving marker scale.
///
/// The counter only grows; markers before `floor(counter)` are at full scale,
/// the rest stay collapsed.
#[derive(Debug, Clone, PartialEq)]
pub struct PathReveal {
    counter: f32,
    rate: f32,
    revealed: usize,
    total: usize,
}

impl PathReveal {
    pub const DEFAULT_RATE: f32 = 0.5;

    pub fn new(total: usize) -> Self {
        Self::with_rate(total, Self::DEFAULT_RATE)
    }

    pub fn with_rate(total: usize, rate: f32) -> Self {
        Self {
            counter: 0.0,
            rate: rate.max(0.0),
            revealed: 0,
            total,
        }
    }

    pub fn counter(&self) -> f32 {
        self.counter
    }

    /// Leading markers already at full scale
    pub fn revealed(&self) -> usize {
        self.revealed
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn is_complete(&self) -> bool {
        self.revealed >= self.total
    }

    /// Ticks from a fresh reveal until every marker is shown
    pub fn ticks_to_complete(&self) -> usize {
        if self.total == 0 {
            return 0;
        }
        if self.rate <= 0.0 {
            return usize::MAX;
        }
        (self.total as f32 / self.rate).ceil() as usize
    }

    /// One tick. Grows the counter while it is below the path length and
    /// scales newly covered markers to full size, in path order.
    /// Returns true if any marker changed.
    pub fn advance(&mut self, markers: &mut InstanceBatch) -> bool {
        if (self.counter as usize) < self.total {
            self.counter += self.rate;
        }

        let target = (self.counter.floor() as usize).min(self.total);
        let mut changed = false;
        while self.revealed < target {
            changed |= markers.set_scale(self.revealed, REVEALED_SCALE);
            self.revealed += 1;
        }
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instancing::{GridLayout, COLLAPSED_SCALE};
    use maze_core::{Coord, Path};

    fn markers(n: usize) -> InstanceBatch {
        let path: Path = (0..n).map(|i| Coord::new(i + 1, 1)).collect::<Vec<_>>().into();
        InstanceBatch::path_markers(&path, &GridLayout::new(n + 2, 3, 1.0))
    }

    #[test]
    fn test_reveals_one_marker_every_two_ticks() {
        let mut batch = markers(5);
        batch.take_dirty();
        let mut reveal = PathReveal::new(5);

        assert!(!reveal.advance(&mut batch));
        assert_eq!(reveal.revealed(), 0);
        assert!(!batch.is_dirty());

        assert!(reveal.advance(&mut batch));
        assert_eq!(reveal.revealed(), 1);
        assert_eq!(batch.scale(0), Some(1.0));
        assert_eq!(batch.scale(1), Some(COLLAPSED_SCALE));
        assert!(batch.take_dirty());

        for _ in 0..4 {
            reveal.advance(&mut batch);
        }
        assert_eq!(reveal.revealed(), 3);
        for i in 0..5 {
            let expected = if i < 3 { 1.0 } else { COLLAPSED_SCALE };
            assert_eq!(batch.scale(i), Some(expected));
        }
    }

    #[test]
    fn test_counter_stops_at_path_length() {
        let mut batch = markers(3);
        let mut reveal = PathReveal::new(3);
        assert_eq!(reveal.ticks_to_complete(), 6);

        for _ in 0..6 {
            reveal.advance(&mut batch);
        }
        assert!(reveal.is_complete());
        assert_eq!(reveal.counter(), 3.0);

        batch.take_dirty();
        for _ in 0..10 {
            assert!(!reveal.advance(&mut batch));
        }
        assert_eq!(reveal.counter(), 3.0);
        assert!(!batch.is_dirty());
    }

    #[test]
    fn test_empty_path_is_complete() {
        let mut batch = markers(0);
        let mut reveal = PathReveal::new(0);
        assert!(reveal.is_complete());
        assert!(!reveal.advance(&mut batch));
        assert_eq!(reveal.counter(), 0.0);
        assert_eq!(reveal.ticks_to_complete(), 0);
    }

    #[test]
    fn test_revealed_never_decreases() {
        let mut batch = markers(40);
        let mut reveal = PathReveal::with_rate(40, 0.7);
        let mut last = 0;
        for _ in 0..100 {
            reveal.advance(&mut batch);
            assert!(reveal.revealed() >= last);
            assert_eq!(reveal.revealed(), (reveal.counter().floor() as usize).min(40));
            last = reveal.revealed();
        }
        assert!(reveal.is_complete());
    }
}
