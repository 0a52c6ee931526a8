use serde::{Deserialize, Serialize};

/// Ordered retention class controlling eviction precedence.
///
/// `Background` is evicted first, `Critical` never. Derived `Ord` follows
/// declaration order, so `Background < Low < Normal < High < Critical`.
/// Promotion and demotion saturate at the ends of the range; there is no
/// out-of-range arithmetic.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum PriorityTier {
    Background,
    Low,
    #[default]
    Normal,
    High,
    /// Reserved for externally pinned context (e.g. the caller's current
    /// file); never auto-evicted.
    Critical,
}

impl PriorityTier {
    const ORDERED: [PriorityTier; 5] = [
        PriorityTier::Background,
        PriorityTier::Low,
        PriorityTier::Normal,
        PriorityTier::High,
        PriorityTier::Critical,
    ];

    fn rank(self) -> usize {
        match self {
            PriorityTier::Background => 0,
            PriorityTier::Low => 1,
            PriorityTier::Normal => 2,
            PriorityTier::High => 3,
            PriorityTier::Critical => 4,
        }
    }

    /// Move up `steps` tiers, saturating at `Critical`.
    pub fn promote(self, steps: u32) -> PriorityTier {
        let idx = (self.rank() + steps as usize).min(Self::ORDERED.len() - 1);
        Self::ORDERED[idx]
    }

    /// Move down `steps` tiers, saturating at `Background`.
    pub fn demote(self, steps: u32) -> PriorityTier {
        let idx = self.rank().saturating_sub(steps as usize);
        Self::ORDERED[idx]
    }

    /// Apply a signed adjustment, clamped to the tier range.
    pub fn adjust(self, delta: i32) -> PriorityTier {
        if delta >= 0 {
            self.promote(delta as u32)
        } else {
            self.demote(delta.unsigned_abs())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_ordering() {
        assert!(PriorityTier::Background < PriorityTier::Low);
        assert!(PriorityTier::Low < PriorityTier::Normal);
        assert!(PriorityTier::Normal < PriorityTier::High);
        assert!(PriorityTier::High < PriorityTier::Critical);
    }

    #[test]
    fn test_promote_saturates() {
        assert_eq!(PriorityTier::Normal.promote(1), PriorityTier::High);
        assert_eq!(PriorityTier::High.promote(5), PriorityTier::Critical);
        assert_eq!(PriorityTier::Critical.promote(1), PriorityTier::Critical);
    }

    #[test]
    fn test_demote_saturates() {
        assert_eq!(PriorityTier::Normal.demote(1), PriorityTier::Low);
        assert_eq!(PriorityTier::Low.demote(3), PriorityTier::Background);
        assert_eq!(
            PriorityTier::Background.demote(1),
            PriorityTier::Background
        );
    }

    #[test]
    fn test_adjust_clamps_both_ways() {
        assert_eq!(PriorityTier::Normal.adjust(2), PriorityTier::Critical);
        assert_eq!(PriorityTier::Normal.adjust(-2), PriorityTier::Background);
        assert_eq!(PriorityTier::Normal.adjust(0), PriorityTier::Normal);
        assert_eq!(PriorityTier::Critical.adjust(10), PriorityTier::Critical);
        assert_eq!(PriorityTier::Background.adjust(-10), PriorityTier::Background);
    }
}
