//! HP bands and one-shot escalation latches
//!
//! ## Bands
//!
//! [`PhaseThresholds`] holds HP-ratio breakpoints, highest first. A ratio that has crossed
//! none of them is in band 0, one that crossed the first is in band 1, and so on. Each
//! breakpoint says whether landing exactly on it counts as crossed, since bosses disagree
//! ("≤ 70%" versus "< 70%").
//!
//! ## Latches
//!
//! [`Latches`] records one-shot transitions such as "first time below half HP". A latch
//! fires at most once until [`Latches::clear`], no matter how often HP oscillates around the
//! breakpoint. Latches are the only phase state that survives a save, via [`PhaseSnapshot`].

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// A single HP-ratio breakpoint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Threshold {
    pub ratio: f32,
    /// Whether a ratio exactly equal to `ratio` counts as below it.
    #[serde(default)]
    pub inclusive: bool,
}

impl Threshold {
    pub const fn below(ratio: f32) -> Self {
        Self {
            ratio,
            inclusive: false,
        }
    }

    pub const fn at_or_below(ratio: f32) -> Self {
        Self {
            ratio,
            inclusive: true,
        }
    }

    pub fn is_crossed(&self, hp_ratio: f32) -> bool {
        if self.inclusive {
            hp_ratio <= self.ratio
        } else {
            hp_ratio < self.ratio
        }
    }
}

/// Ordered HP breakpoints that gate pattern eligibility.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseThresholds {
    pub bands: SmallVec<[Threshold; 4]>,
}

impl PhaseThresholds {
    pub fn new(bands: &[Threshold]) -> Self {
        Self {
            bands: bands.iter().copied().collect(),
        }
    }

    /// Number of bands (one more than the number of breakpoints).
    pub fn band_count(&self) -> usize {
        self.bands.len() + 1
    }

    /// Band index for an HP ratio. Band 0 is the healthiest.
    pub fn band_for(&self, hp_ratio: f32) -> usize {
        self.bands
            .iter()
            .position(|t| !t.is_crossed(hp_ratio))
            .unwrap_or(self.bands.len())
    }

    /// Breakpoints must lie in 0.0..=1.0 and strictly descend.
    pub fn validate(&self) -> Result<(), String> {
        for t in &self.bands {
            if !(0.0..=1.0).contains(&t.ratio) {
                return Err(format!("threshold {} is outside 0.0..=1.0", t.ratio));
            }
        }
        for pair in self.bands.windows(2) {
            if pair[1].ratio >= pair[0].ratio {
                return Err(format!(
                    "thresholds must strictly descend, found {} then {}",
                    pair[0].ratio, pair[1].ratio
                ));
            }
        }
        Ok(())
    }
}

/// One-shot transitions an encounter can go through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Latch {
    /// Forced ultimate the first time HP crosses half.
    Escalation,
    /// Sticky "HP has been at or below half" for weight-table switching.
    BelowHalf,
    /// Minions have been summoned.
    Summoned,
}

/// Set of latches that have fired this encounter lifetime.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Latches {
    fired: SmallVec<[Latch; 4]>,
}

impl Latches {
    pub fn is_set(&self, latch: Latch) -> bool {
        self.fired.contains(&latch)
    }

    /// Fire `latch` if `condition` holds and it has not fired yet.
    ///
    /// Returns true only on the tick the latch actually fires.
    pub fn fire_once(&mut self, latch: Latch, condition: bool) -> bool {
        if !condition || self.is_set(latch) {
            return false;
        }
        self.fired.push(latch);
        true
    }

    pub fn clear(&mut self) {
        self.fired.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.fired.is_empty()
    }

    pub fn snapshot(&self) -> PhaseSnapshot {
        PhaseSnapshot {
            fired: self.fired.to_vec(),
        }
    }

    pub fn restore(&mut self, snapshot: &PhaseSnapshot) {
        self.fired.clear();
        for &latch in &snapshot.fired {
            if !self.fired.contains(&latch) {
                self.fired.push(latch);
            }
        }
    }
}

/// Plain-data copy of the fired latches, handed to the save system.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseSnapshot {
    pub fired: Vec<Latch>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wolf_bands() -> PhaseThresholds {
        PhaseThresholds::new(&[Threshold::below(0.7), Threshold::below(0.4)])
    }

    #[test]
    fn test_band_for_exclusive_edges() {
        let bands = wolf_bands();
        assert_eq!(bands.band_for(1.0), 0);
        assert_eq!(bands.band_for(0.7), 0);
        assert_eq!(bands.band_for(0.69), 1);
        assert_eq!(bands.band_for(0.4), 1);
        assert_eq!(bands.band_for(0.1), 2);
        assert_eq!(bands.band_for(0.0), 2);
    }

    #[test]
    fn test_band_for_inclusive_edges() {
        let bands = PhaseThresholds::new(&[Threshold::at_or_below(0.7), Threshold::at_or_below(0.4)]);
        assert_eq!(bands.band_for(0.71), 0);
        assert_eq!(bands.band_for(0.7), 1);
        assert_eq!(bands.band_for(0.4), 2);
    }

    #[test]
    fn test_validate_rejects_non_monotonic() {
        let bad = PhaseThresholds::new(&[Threshold::below(0.4), Threshold::below(0.7)]);
        assert!(bad.validate().is_err());
        let out_of_range = PhaseThresholds::new(&[Threshold::below(1.5)]);
        assert!(out_of_range.validate().is_err());
        assert!(wolf_bands().validate().is_ok());
    }

    #[test]
    fn test_latch_fires_once_across_oscillation() {
        let mut latches = Latches::default();
        let threshold = Threshold::below(0.5);
        let mut fired = 0;
        for hp in [0.9, 0.49, 0.6, 0.3, 0.55, 0.1] {
            if latches.fire_once(Latch::Escalation, threshold.is_crossed(hp)) {
                fired += 1;
            }
        }
        assert_eq!(fired, 1);
        assert!(latches.is_set(Latch::Escalation));
    }

    #[test]
    fn test_snapshot_restore() {
        let mut latches = Latches::default();
        latches.fire_once(Latch::Summoned, true);
        let snapshot = latches.snapshot();

        let mut restored = Latches::default();
        restored.restore(&snapshot);
        assert_eq!(restored, latches);

        restored.clear();
        assert!(restored.is_empty());
    }
}
