//! Weighted pattern draws
//!
//! Boss behaviours describe each HP band as a [`WeightedTable`] and hand it to the
//! [`Selector`], which performs the draw, applies any [`RepetitionGuard`], and falls back to
//! a no-op (with a single warning) when a table has nothing eligible in it.

use bevy::prelude::*;
use smallvec::SmallVec;
use std::fmt::Debug;

use super::rng::GameRng;

/// Candidates for one HP band with their relative weights.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightedTable<T> {
    entries: SmallVec<[(T, f32); 4]>,
}

impl<T: Copy + PartialEq> WeightedTable<T> {
    pub fn new(entries: &[(T, f32)]) -> Self {
        Self {
            entries: entries.iter().copied().collect(),
        }
    }

    pub fn entries(&self) -> &[(T, f32)] {
        &self.entries
    }

    /// Sum of all positive weights.
    pub fn total_weight(&self) -> f32 {
        self.entries.iter().map(|(_, w)| w.max(0.0)).sum()
    }

    /// True when no candidate has a positive weight.
    pub fn is_exhausted(&self) -> bool {
        self.total_weight() <= 0.0
    }

    /// Whether `candidate` can ever be drawn from this table.
    pub fn can_draw(&self, candidate: T) -> bool {
        self.entries
            .iter()
            .any(|(c, w)| *c == candidate && *w > 0.0)
    }

    /// Drop every candidate the predicate rejects.
    pub fn retain(&mut self, mut keep: impl FnMut(&T) -> bool) {
        self.entries.retain(|(c, _)| keep(c));
    }

    /// Weighted random draw. `None` only when the table is exhausted.
    pub fn pick(&self, rng: &mut GameRng) -> Option<T> {
        let total = self.total_weight();
        if total <= 0.0 {
            return None;
        }

        let roll = rng.random_f32() * total;
        let mut cumulative = 0.0;
        let mut last_positive = None;
        for &(candidate, weight) in &self.entries {
            if weight <= 0.0 {
                continue;
            }
            cumulative += weight;
            last_positive = Some(candidate);
            if roll < cumulative {
                return Some(candidate);
            }
        }
        // Rounding can leave the roll a hair above the final cumulative weight.
        last_positive
    }
}

/// Tie-break that swaps a repeated action for an alternative.
///
/// If the drawn action equals both the guarded action and the previous command, the
/// alternative is taken instead. Anything else passes through unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepetitionGuard<T> {
    pub action: T,
    pub alternative: T,
}

impl<T: Copy + PartialEq> RepetitionGuard<T> {
    pub fn new(action: T, alternative: T) -> Self {
        Self {
            action,
            alternative,
        }
    }

    pub fn apply(&self, drawn: T, last: T) -> T {
        if drawn == self.action && last == self.action {
            self.alternative
        } else {
            drawn
        }
    }
}

/// Performs draws for one encounter and remembers whether it already complained.
#[derive(Debug, Default)]
pub struct Selector {
    warned_exhausted: bool,
}

impl Selector {
    /// Draw from `table`, applying `guard` against `last`.
    ///
    /// An exhausted table is a configuration error: it is logged once per encounter and the
    /// draw yields `None`, which callers treat as "do nothing this tick".
    pub fn draw<T: Copy + PartialEq + Debug>(
        &mut self,
        table: &WeightedTable<T>,
        guard: Option<RepetitionGuard<T>>,
        last: T,
        rng: &mut GameRng,
    ) -> Option<T> {
        let Some(drawn) = table.pick(rng) else {
            if !self.warned_exhausted {
                self.warned_exhausted = true;
                warn!(
                    "No eligible pattern in table {:?}; boss will idle instead",
                    table.entries()
                );
            }
            return None;
        };

        Some(match guard {
            Some(guard) => guard.apply(drawn, last),
            None => drawn,
        })
    }

    pub fn has_warned(&self) -> bool {
        self.warned_exhausted
    }

    pub fn reset(&mut self) {
        self.warned_exhausted = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Move {
        Walk,
        Dash,
        Throw,
    }

    #[test]
    fn test_pick_only_positive_weights() {
        let table = WeightedTable::new(&[(Move::Walk, 0.0), (Move::Dash, 1.0), (Move::Throw, 0.0)]);
        let mut rng = GameRng::from_seed(1);
        for _ in 0..100 {
            assert_eq!(table.pick(&mut rng), Some(Move::Dash));
        }
    }

    #[test]
    fn test_pick_roughly_follows_weights() {
        let table = WeightedTable::new(&[(Move::Walk, 0.5), (Move::Dash, 0.3), (Move::Throw, 0.2)]);
        let mut rng = GameRng::from_seed(2024);
        let mut walks = 0;
        for _ in 0..2000 {
            if table.pick(&mut rng) == Some(Move::Walk) {
                walks += 1;
            }
        }
        assert!((850..1150).contains(&walks), "walks = {}", walks);
    }

    #[test]
    fn test_guard_swaps_repeated_action() {
        let guard = RepetitionGuard::new(Move::Walk, Move::Throw);
        assert_eq!(guard.apply(Move::Walk, Move::Walk), Move::Throw);
        assert_eq!(guard.apply(Move::Walk, Move::Dash), Move::Walk);
        assert_eq!(guard.apply(Move::Dash, Move::Walk), Move::Dash);
    }

    #[test]
    fn test_exhausted_table_falls_back_and_warns_once() {
        let table: WeightedTable<Move> = WeightedTable::new(&[(Move::Walk, 0.0)]);
        let mut selector = Selector::default();
        let mut rng = GameRng::from_seed(3);

        assert_eq!(selector.draw(&table, None, Move::Dash, &mut rng), None);
        assert!(selector.has_warned());
        assert_eq!(selector.draw(&table, None, Move::Dash, &mut rng), None);
    }
}
