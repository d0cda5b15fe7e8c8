//! Power-ups
//!
//! A power-up sits on the field for a fixed lifespan, blinking near the end,
//! and is removed once collected or expired. Lifecycle states are derived
//! from the sim clock rather than stored.

use glam::IVec2;
use serde::{Deserialize, Serialize};

use super::geom::Rect;
use crate::consts::{POWERUP_PICKUP_TOLERANCE, POWERUP_SIZE};

/// Power-up effect kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PowerUpKind {
    /// +1 health, instant
    Health,
    /// Absorbs the next hit
    Shield,
    /// Ignores all damage
    Invincibility,
    /// Destroys hostile units, instant
    Bomb,
    /// Faster fire, more damage
    Attack,
    /// Faster movement
    Speed,
}

impl PowerUpKind {
    pub const ALL: [PowerUpKind; 6] = [
        PowerUpKind::Health,
        PowerUpKind::Shield,
        PowerUpKind::Invincibility,
        PowerUpKind::Bomb,
        PowerUpKind::Attack,
        PowerUpKind::Speed,
    ];

    /// Timed effect length in seconds; 0 for instant kinds
    pub fn duration_secs(self) -> f32 {
        match self {
            PowerUpKind::Health | PowerUpKind::Bomb => 0.0,
            PowerUpKind::Shield => 10.0,
            PowerUpKind::Invincibility => 6.0,
            PowerUpKind::Attack => 10.0,
            PowerUpKind::Speed => 8.0,
        }
    }

    pub fn is_timed(self) -> bool {
        self.duration_secs() > 0.0
    }

    pub fn label(self) -> &'static str {
        match self {
            PowerUpKind::Health => "health",
            PowerUpKind::Shield => "shield",
            PowerUpKind::Invincibility => "invincibility",
            PowerUpKind::Bomb => "bomb",
            PowerUpKind::Attack => "attack",
            PowerUpKind::Speed => "speed",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        PowerUpKind::ALL
            .into_iter()
            .find(|kind| kind.label().eq_ignore_ascii_case(label))
    }
}

/// Derived lifecycle stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerUpStage {
    Fresh,
    Blinking,
    Expired,
    Collected,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PowerUp {
    pub id: u32,
    /// Top-left corner in world units
    pub pos: IVec2,
    pub kind: PowerUpKind,
    pub spawned_at_ms: u64,
    pub collected: bool,
    pub blink_after_ms: u64,
    pub lifespan_ms: u64,
}

impl PowerUp {
    pub fn new(
        id: u32,
        kind: PowerUpKind,
        pos: IVec2,
        spawned_at_ms: u64,
        blink_after_ms: u64,
        lifespan_ms: u64,
    ) -> Self {
        Self {
            id,
            pos,
            kind,
            spawned_at_ms,
            collected: false,
            blink_after_ms,
            lifespan_ms,
        }
    }

    pub fn rect(&self) -> Rect {
        Rect::square(self.pos, POWERUP_SIZE)
    }

    pub fn age_ms(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.spawned_at_ms)
    }

    pub fn stage(&self, now_ms: u64) -> PowerUpStage {
        let age = self.age_ms(now_ms);
        if self.collected {
            PowerUpStage::Collected
        } else if age >= self.lifespan_ms {
            PowerUpStage::Expired
        } else if age > self.blink_after_ms {
            PowerUpStage::Blinking
        } else {
            PowerUpStage::Fresh
        }
    }

    pub fn should_blink(&self, now_ms: u64) -> bool {
        self.stage(now_ms) == PowerUpStage::Blinking
    }

    pub fn should_remove(&self, now_ms: u64) -> bool {
        matches!(
            self.stage(now_ms),
            PowerUpStage::Collected | PowerUpStage::Expired
        )
    }

    /// Lenient pickup test: the box is grown by a few units on every side
    pub fn collides_with(&self, other: &Rect) -> bool {
        self.rect()
            .inflate(POWERUP_PICKUP_TOLERANCE)
            .intersects(other)
    }

    pub fn collect(&mut self) {
        self.collected = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shield_at(pos: IVec2) -> PowerUp {
        PowerUp::new(1, PowerUpKind::Shield, pos, 1000, 3000, 5000)
    }

    #[test]
    fn test_lifecycle_thresholds() {
        let p = shield_at(IVec2::ZERO);
        assert!(!p.should_blink(1000));
        assert!(!p.should_remove(1000));
        assert!(p.should_blink(4500));
        assert!(!p.should_remove(4500));
        assert!(p.should_remove(6000));
        assert!(!p.should_blink(6000));
        assert_eq!(p.stage(9000), PowerUpStage::Expired);
    }

    #[test]
    fn test_collect_is_absorbing() {
        let mut p = shield_at(IVec2::ZERO);
        p.collect();
        assert!(p.should_remove(1000));
        assert_eq!(p.stage(4500), PowerUpStage::Collected);
    }

    #[test]
    fn test_pickup_tolerance() {
        let p = shield_at(IVec2::new(100, 100));
        // Strictly 3 units to the right of the power-up's box
        let near = Rect::square(IVec2::new(133, 100), 40);
        assert!(!p.rect().intersects(&near));
        assert!(p.collides_with(&near));

        let far = Rect::square(IVec2::new(136, 100), 40);
        assert!(!p.collides_with(&far));
    }

    #[test]
    fn test_labels() {
        assert_eq!(PowerUpKind::from_label("Invincibility"), Some(PowerUpKind::Invincibility));
        assert_eq!(PowerUpKind::from_label("laser"), None);
        assert!(!PowerUpKind::Bomb.is_timed());
        assert!(PowerUpKind::Speed.is_timed());
    }
}
