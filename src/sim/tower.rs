//! Tower model: placed blocks and their fall bookkeeping
//!
//! The tower is append-only. Each scoring round places one block whose
//! horizontal offset, initial tilt and physics parameters depend on the
//! outcome. The physics collaborator owns the rigid bodies and only ever
//! reports back which blocks have fallen.

use glam::Vec3;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::scoring::Outcome;
use crate::consts::*;

/// Keeps a well-placed block near its intended spot (applied by the physics side)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DriftHold {
    /// Per-frame multiplier on x/z rotation
    pub rotation_damping: f32,
    /// Horizontal drift allowed before pulling back
    pub max_drift: f32,
    /// Lerp factor toward the placed position once drift is exceeded
    pub pull: f32,
}

/// Physics parameters for a block's rigid body
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Stability {
    pub restitution: f32,
    pub friction: f32,
    /// None lets the block fall naturally
    pub hold: Option<DriftHold>,
}

impl Stability {
    pub fn for_outcome(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Perfect => Self {
                restitution: 0.0,
                friction: 1.0,
                hold: Some(DriftHold {
                    rotation_damping: 0.9,
                    max_drift: 0.1,
                    pull: 0.05,
                }),
            },
            Outcome::Minor => Self {
                restitution: 0.02,
                friction: 0.95,
                hold: Some(DriftHold {
                    rotation_damping: 0.95,
                    max_drift: 0.2,
                    pull: 0.03,
                }),
            },
            Outcome::Failure => Self {
                restitution: 0.3,
                friction: 0.4,
                hold: None,
            },
        }
    }
}

/// Visual styling, colors as 0xRRGGBB
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockStyle {
    pub color: u32,
    pub glow: u32,
}

impl BlockStyle {
    pub fn for_outcome(outcome: Outcome) -> Self {
        let color = match outcome {
            Outcome::Perfect => 0x00ff88,
            Outcome::Minor => 0xffaa00,
            Outcome::Failure => 0xff4444,
        };
        Self { color, glow: color }
    }

    /// CSS hex form, e.g. `#00ff88`
    pub fn css(&self) -> String {
        format!("#{:06x}", self.color)
    }
}

/// A tower segment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Block {
    pub id: u32,
    pub outcome: Outcome,
    /// Placement index (0 = bottom)
    pub index: usize,
    /// Spawn position of the block center
    pub position: Vec3,
    /// Initial rotation in radians (y is always 0)
    pub tilt: Vec3,
    pub stability: Stability,
    pub style: BlockStyle,
    fallen: bool,
}

impl Block {
    pub fn has_fallen(&self) -> bool {
        self.fallen
    }
}

/// Result of a fall report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallReport {
    /// First report for this block; carries the new fallen count
    Marked(u32),
    AlreadyFallen,
    Unknown,
}

/// Spawn height for the block at `index`
#[inline]
pub fn block_height(index: usize) -> f32 {
    index as f32 * BLOCK_SPACING + BLOCK_BASE_Y
}

/// Symmetric horizontal offset bound for an outcome (None = align with previous block)
pub fn offset_bound(outcome: Outcome) -> Option<f32> {
    match outcome {
        Outcome::Perfect => None,
        Outcome::Minor => Some(MINOR_OFFSET),
        Outcome::Failure => Some(FAILURE_OFFSET),
    }
}

/// Symmetric x/z tilt bound for an outcome
pub fn tilt_bound(outcome: Outcome) -> f32 {
    match outcome {
        Outcome::Perfect => 0.0,
        Outcome::Minor => MINOR_TILT,
        Outcome::Failure => FAILURE_TILT,
    }
}

fn symmetric<R: Rng>(rng: &mut R, bound: f32) -> f32 {
    if bound <= 0.0 {
        0.0
    } else {
        rng.random_range(-bound..=bound)
    }
}

/// Append-only block list
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Tower {
    blocks: Vec<Block>,
    fallen: u32,
}

impl Tower {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn fallen_count(&self) -> u32 {
        self.fallen
    }

    pub fn get(&self, id: u32) -> Option<&Block> {
        self.blocks.iter().find(|b| b.id == id)
    }

    /// Place a block for `outcome` at the next index
    pub fn place<R: Rng>(&mut self, id: u32, outcome: Outcome, rng: &mut R) -> &Block {
        let index = self.blocks.len();

        let (x, z) = match offset_bound(outcome) {
            // Perfect blocks stack exactly on the previous one
            None => self
                .blocks
                .last()
                .map(|b| (b.position.x, b.position.z))
                .unwrap_or((0.0, 0.0)),
            Some(bound) => (symmetric(rng, bound), symmetric(rng, bound)),
        };

        let tilt_max = tilt_bound(outcome);
        let tilt = Vec3::new(symmetric(rng, tilt_max), 0.0, symmetric(rng, tilt_max));

        self.blocks.push(Block {
            id,
            outcome,
            index,
            position: Vec3::new(x, block_height(index), z),
            tilt,
            stability: Stability::for_outcome(outcome),
            style: BlockStyle::for_outcome(outcome),
            fallen: false,
        });
        &self.blocks[index]
    }

    /// Mark a block fallen. Repeated reports for the same block are no-ops.
    pub fn report_fallen(&mut self, id: u32) -> FallReport {
        let Some(block) = self.blocks.iter_mut().find(|b| b.id == id) else {
            return FallReport::Unknown;
        };
        if block.fallen {
            return FallReport::AlreadyFallen;
        }
        block.fallen = true;
        self.fallen += 1;
        FallReport::Marked(self.fallen)
    }
}

/// Per-frame fall predicate for raw rigid-body telemetry
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FallDetector {
    /// Below this height the block is on (or through) the ground
    pub min_height: f32,
    /// Horizontal distance from the tower axis that counts as fallen off
    pub max_axis_distance: f32,
    /// Height under which fast horizontal motion means sliding away
    pub slide_height: f32,
    pub slide_speed: f32,
}

impl Default for FallDetector {
    fn default() -> Self {
        Self {
            min_height: -0.3,
            max_axis_distance: 1.5,
            slide_height: 0.5,
            slide_speed: 3.0,
        }
    }
}

impl FallDetector {
    pub fn has_fallen(&self, position: Vec3, velocity: Vec3) -> bool {
        let axis_distance = (position.x * position.x + position.z * position.z).sqrt();
        let horizontal_speed = (velocity.x * velocity.x + velocity.z * velocity.z).sqrt();

        position.y < self.min_height
            || axis_distance > self.max_axis_distance
            || (position.y < self.slide_height && horizontal_speed > self.slide_speed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn rng() -> Pcg32 {
        Pcg32::seed_from_u64(42)
    }

    #[test]
    fn test_vertical_spacing() {
        let mut tower = Tower::new();
        let mut rng = rng();
        for (i, outcome) in [Outcome::Failure, Outcome::Perfect, Outcome::Minor]
            .into_iter()
            .enumerate()
        {
            let block = tower.place(i as u32 + 1, outcome, &mut rng);
            assert!((block.position.y - (i as f32 * 3.0 + 1.5)).abs() < 1e-6);
        }
    }

    #[test]
    fn test_first_perfect_centered() {
        let mut tower = Tower::new();
        let block = tower.place(1, Outcome::Perfect, &mut rng());
        assert_eq!(block.position.x, 0.0);
        assert_eq!(block.position.z, 0.0);
        assert_eq!(block.tilt, Vec3::ZERO);
    }

    #[test]
    fn test_perfect_aligns_with_previous() {
        let mut tower = Tower::new();
        let mut rng = rng();
        let (px, pz) = {
            let prev = tower.place(1, Outcome::Failure, &mut rng);
            (prev.position.x, prev.position.z)
        };
        let block = tower.place(2, Outcome::Perfect, &mut rng);
        assert_eq!(block.position.x, px);
        assert_eq!(block.position.z, pz);
    }

    #[test]
    fn test_offsets_within_bounds() {
        let mut tower = Tower::new();
        let mut rng = rng();
        for id in 0..200 {
            let outcome = if id % 2 == 0 { Outcome::Minor } else { Outcome::Failure };
            let block = tower.place(id, outcome, &mut rng);
            let bound = offset_bound(outcome).unwrap();
            assert!(block.position.x.abs() <= bound);
            assert!(block.position.z.abs() <= bound);
            assert!(block.tilt.x.abs() <= tilt_bound(outcome));
            assert_eq!(block.tilt.y, 0.0);
        }
    }

    #[test]
    fn test_placement_reproducible_with_seed() {
        let mut a = Tower::new();
        let mut b = Tower::new();
        let (mut ra, mut rb) = (rng(), rng());
        for id in 0..10 {
            a.place(id, Outcome::Failure, &mut ra);
            b.place(id, Outcome::Failure, &mut rb);
        }
        for (x, y) in a.blocks().iter().zip(b.blocks()) {
            assert_eq!(x.position, y.position);
            assert_eq!(x.tilt, y.tilt);
        }
    }

    #[test]
    fn test_report_fallen_deduplicates() {
        let mut tower = Tower::new();
        let mut rng = rng();
        tower.place(7, Outcome::Failure, &mut rng);
        tower.place(8, Outcome::Failure, &mut rng);

        assert_eq!(tower.report_fallen(7), FallReport::Marked(1));
        assert_eq!(tower.report_fallen(7), FallReport::AlreadyFallen);
        assert_eq!(tower.report_fallen(99), FallReport::Unknown);
        assert_eq!(tower.fallen_count(), 1);
        assert!(tower.get(7).unwrap().has_fallen());
        assert!(!tower.get(8).unwrap().has_fallen());
        assert_eq!(tower.len(), 2);
    }

    #[test]
    fn test_stability_ordering() {
        let perfect = Stability::for_outcome(Outcome::Perfect);
        let failure = Stability::for_outcome(Outcome::Failure);
        assert!(perfect.friction > failure.friction);
        assert!(perfect.restitution < failure.restitution);
        assert!(failure.hold.is_none());
    }

    #[test]
    fn test_style_css() {
        assert_eq!(BlockStyle::for_outcome(Outcome::Perfect).css(), "#00ff88");
        assert_eq!(BlockStyle::for_outcome(Outcome::Failure).css(), "#ff4444");
    }

    #[test]
    fn test_fall_detector() {
        let detector = FallDetector::default();
        let still = Vec3::ZERO;
        assert!(!detector.has_fallen(Vec3::new(0.0, 4.5, 0.0), still));
        assert!(detector.has_fallen(Vec3::new(0.0, -0.5, 0.0), still));
        assert!(detector.has_fallen(Vec3::new(1.2, 3.0, 1.2), still));
        assert!(detector.has_fallen(Vec3::new(0.2, 0.4, 0.0), Vec3::new(3.5, 0.0, 0.0)));
        assert!(!detector.has_fallen(Vec3::new(0.2, 1.5, 0.0), Vec3::new(3.5, 0.0, 0.0)));
    }
}
