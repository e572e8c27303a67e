/// Frame-driven easing for the card and the gallery spin
use std::f32::consts::FRAC_PI_2;

use serde::{Deserialize, Serialize};

use crate::config::PostLoad;
use crate::error::PhaseError;
use crate::transform::{Pose, RotationState};

/// Vertical rise toward a resting height.
///
/// Each step closes a fixed fraction of the remaining distance and snaps
/// once within `snap`. After snapping it stays inactive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rise {
    pub current: f32,
    pub target: f32,
    pub rate: f32,
    pub snap: f32,
    active: bool,
}

impl Rise {
    pub const RATE: f32 = 0.08;
    pub const SNAP: f32 = 0.05;

    pub fn new(start: f32, target: f32) -> Self {
        Self {
            current: start,
            target,
            rate: Self::RATE,
            snap: Self::SNAP,
            active: true,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Advance one frame. Returns true on the frame the rise completes.
    pub fn step(&mut self) -> bool {
        if !self.active {
            return false;
        }

        let diff = self.target - self.current;
        if diff.abs() > self.snap {
            self.current += diff * self.rate;
            false
        } else {
            self.current = self.target;
            self.active = false;
            true
        }
    }
}

/// Page scroll mapped to a tilt angle, eased every frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollRotation {
    pub angle: f32,
    pub target: f32,
    pub rate: f32,
    pub base: f32,
    /// Radians per scrolled pixel
    pub sensitivity: f32,
}

impl ScrollRotation {
    pub const RATE: f32 = 0.1;
    pub const SENSITIVITY: f32 = 0.01;

    pub fn new() -> Self {
        Self {
            angle: FRAC_PI_2,
            target: FRAC_PI_2,
            rate: Self::RATE,
            base: FRAC_PI_2,
            sensitivity: Self::SENSITIVITY,
        }
    }

    pub fn set_scroll(&mut self, offset_px: f32) {
        self.target = self.base + offset_px * self.sensitivity;
    }

    pub fn step(&mut self) {
        self.angle += (self.target - self.angle) * self.rate;
    }
}

impl Default for ScrollRotation {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Axis {
    X,
    Y,
    Z,
}

/// Continuous rotation by a fixed increment per frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Spin {
    pub axis: Axis,
    pub step: f32,
}

impl Spin {
    pub fn advance(&self, rotation: &mut RotationState) {
        match self.axis {
            Axis::X => rotation.x += self.step,
            Axis::Y => rotation.y += self.step,
            Axis::Z => rotation.z += self.step,
        }
    }
}

impl Default for Spin {
    fn default() -> Self {
        Self {
            axis: Axis::Z,
            step: 0.01,
        }
    }
}

/// Lifecycle of the card viewer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardPhase {
    Uninitialized,
    Loading,
    Loaded,
    FallbackCreated,
    Rising,
    /// Terminal
    ScrollRotating,
}

impl CardPhase {
    fn can_become(self, next: CardPhase) -> bool {
        use CardPhase::*;
        matches!(
            (self, next),
            (Uninitialized, Loading)
                | (Loading, Loaded)
                | (Loading, FallbackCreated)
                | (Loaded, Rising)
                | (FallbackCreated, Rising)
                | (Rising, ScrollRotating)
        )
    }
}

/// Rise, then scroll-coupled rotation
#[derive(Debug, Clone, PartialEq)]
pub struct CardAnimation {
    phase: CardPhase,
    rise: Rise,
    rotation: ScrollRotation,
    scroll_offset: f32,
}

impl CardAnimation {
    pub const START_HEIGHT: f32 = -30.0;
    pub const REST_HEIGHT: f32 = 0.0;

    pub fn new(start_height: f32, rest_height: f32) -> Self {
        Self {
            phase: CardPhase::Uninitialized,
            rise: Rise::new(start_height, rest_height),
            rotation: ScrollRotation::new(),
            scroll_offset: 0.0,
        }
    }

    pub fn phase(&self) -> CardPhase {
        self.phase
    }

    pub fn rise(&self) -> &Rise {
        &self.rise
    }

    pub fn rotation(&self) -> &ScrollRotation {
        &self.rotation
    }

    fn transition(&mut self, next: CardPhase) -> Result<(), PhaseError> {
        if !self.phase.can_become(next) {
            return Err(PhaseError {
                from: self.phase,
                to: next,
            });
        }
        tracing::debug!(from = ?self.phase, to = ?next, "card phase");
        self.phase = next;
        Ok(())
    }

    pub fn begin_loading(&mut self) -> Result<(), PhaseError> {
        self.transition(CardPhase::Loading)
    }

    pub fn asset_ready(&mut self, fallback: bool) -> Result<(), PhaseError> {
        self.transition(if fallback {
            CardPhase::FallbackCreated
        } else {
            CardPhase::Loaded
        })
    }

    /// Put the object in its initial pose (tipped back, below the view) and begin rising
    pub fn start(&mut self, pose: &mut Pose) -> Result<(), PhaseError> {
        self.transition(CardPhase::Rising)?;
        pose.rotation.x = self.rotation.angle;
        pose.position.y = self.rise.current;
        Ok(())
    }

    /// Latest page scroll offset in pixels; takes effect once the rise is done
    pub fn on_scroll(&mut self, offset_px: f32) {
        self.scroll_offset = offset_px;
        if self.phase == CardPhase::ScrollRotating {
            self.rotation.set_scroll(offset_px);
        }
    }

    /// Advance one frame
    pub fn tick(&mut self, pose: &mut Pose) {
        if self.phase == CardPhase::Rising {
            let finished = self.rise.step();
            pose.position.y = self.rise.current;
            if finished {
                self.phase = CardPhase::ScrollRotating;
                self.rotation.set_scroll(self.scroll_offset);
                tracing::debug!("card rise finished");
            }
        }

        if self.phase == CardPhase::ScrollRotating {
            self.rotation.step();
            pose.rotation.x = self.rotation.angle;
        }
    }
}

impl Default for CardAnimation {
    fn default() -> Self {
        Self::new(Self::START_HEIGHT, Self::REST_HEIGHT)
    }
}

/// Per-viewport motion built from its post-load behavior
#[derive(Debug, Clone, PartialEq)]
pub enum Motion {
    Card(CardAnimation),
    Spin {
        initial_rotation: RotationState,
        spin: Spin,
    },
}

impl Motion {
    pub fn new(behavior: &PostLoad) -> Self {
        match *behavior {
            PostLoad::CardRise {
                start_height,
                rest_height,
            } => Motion::Card(CardAnimation::new(start_height, rest_height)),
            PostLoad::Spin {
                initial_rotation,
                spin,
            } => Motion::Spin {
                initial_rotation,
                spin,
            },
        }
    }

    pub fn begin_loading(&mut self) -> Result<(), PhaseError> {
        match self {
            Motion::Card(card) => card.begin_loading(),
            Motion::Spin { .. } => Ok(()),
        }
    }

    /// Set the initial pose of a freshly attached object
    pub fn place(&mut self, pose: &mut Pose, fallback: bool) -> Result<(), PhaseError> {
        match self {
            Motion::Card(card) => {
                card.asset_ready(fallback)?;
                card.start(pose)
            }
            Motion::Spin {
                initial_rotation, ..
            } => {
                pose.rotation = *initial_rotation;
                Ok(())
            }
        }
    }

    pub fn on_scroll(&mut self, offset_px: f32) {
        if let Motion::Card(card) = self {
            card.on_scroll(offset_px);
        }
    }

    pub fn tick(&mut self, pose: &mut Pose) {
        match self {
            Motion::Card(card) => card.tick(pose),
            Motion::Spin { spin, .. } => spin.advance(&mut pose.rotation),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn started() -> (CardAnimation, Pose) {
        let mut animation = CardAnimation::default();
        let mut pose = Pose::identity();
        animation.begin_loading().unwrap();
        animation.asset_ready(false).unwrap();
        animation.start(&mut pose).unwrap();
        (animation, pose)
    }

    #[test]
    fn test_rise_converges_monotonically() {
        let mut rise = Rise::new(-30.0, 0.0);
        let mut previous = rise.current;
        let mut frames = 0;

        while rise.is_active() {
            rise.step();
            assert!(rise.current >= previous);
            assert!(rise.current <= rise.target + Rise::SNAP);
            previous = rise.current;
            frames += 1;
            assert!(frames < 1000);
        }

        assert_eq!(rise.current, 0.0);
        assert!(!rise.step());
        assert_eq!(rise.current, 0.0);
    }

    #[test]
    fn test_scroll_rotation_target_and_convergence() {
        let mut rotation = ScrollRotation::new();
        rotation.set_scroll(300.0);
        assert!((rotation.target - (FRAC_PI_2 + 3.0)).abs() < 1e-6);

        let before = (rotation.target - rotation.angle).abs();
        rotation.step();
        let after = (rotation.target - rotation.angle).abs();
        assert!((after / before - 0.9).abs() < 1e-4);

        for _ in 0..500 {
            rotation.step();
        }
        assert!((rotation.angle - rotation.target).abs() < 1e-4);
    }

    #[test]
    fn test_spin_advances_one_axis() {
        let mut rotation = RotationState::new(FRAC_PI_2, 0.0, 0.0);
        let spin = Spin::default();
        for _ in 0..100 {
            spin.advance(&mut rotation);
        }
        assert!((rotation.z - 1.0).abs() < 1e-4);
        assert_eq!(rotation.x, FRAC_PI_2);
    }

    #[test]
    fn test_card_start_sets_initial_pose() {
        let (animation, pose) = started();
        assert_eq!(animation.phase(), CardPhase::Rising);
        assert_eq!(pose.position.y, -30.0);
        assert_eq!(pose.rotation.x, FRAC_PI_2);
    }

    #[test]
    fn test_card_phases_run_once() {
        let (mut animation, mut pose) = started();

        let mut frames = 0;
        while animation.phase() == CardPhase::Rising {
            animation.tick(&mut pose);
            frames += 1;
            assert!(frames < 1000);
        }
        assert_eq!(animation.phase(), CardPhase::ScrollRotating);
        assert_eq!(pose.position.y, 0.0);

        // Terminal: no way back
        assert!(animation.start(&mut pose).is_err());
        for _ in 0..50 {
            animation.tick(&mut pose);
        }
        assert_eq!(animation.phase(), CardPhase::ScrollRotating);
        assert_eq!(pose.position.y, 0.0);
        assert!(!animation.rise().is_active());
    }

    #[test]
    fn test_scroll_is_applied_after_rise() {
        let (mut animation, mut pose) = started();
        animation.on_scroll(100.0);

        // Scrolling during the rise does not tilt the card
        animation.tick(&mut pose);
        assert_eq!(pose.rotation.x, FRAC_PI_2);

        while animation.phase() == CardPhase::Rising {
            animation.tick(&mut pose);
        }
        for _ in 0..300 {
            animation.tick(&mut pose);
        }
        assert!((pose.rotation.x - (FRAC_PI_2 + 1.0)).abs() < 1e-3);

        animation.on_scroll(0.0);
        for _ in 0..300 {
            animation.tick(&mut pose);
        }
        assert!((pose.rotation.x - FRAC_PI_2).abs() < 1e-3);
    }

    #[test]
    fn test_illegal_transitions() {
        let mut animation = CardAnimation::default();
        let mut pose = Pose::identity();
        assert_eq!(
            animation.start(&mut pose),
            Err(PhaseError {
                from: CardPhase::Uninitialized,
                to: CardPhase::Rising
            })
        );
        assert!(animation.asset_ready(true).is_err());

        animation.begin_loading().unwrap();
        animation.asset_ready(true).unwrap();
        assert_eq!(animation.phase(), CardPhase::FallbackCreated);
        assert!(animation.asset_ready(false).is_err());
    }

    #[test]
    fn test_spin_motion_places_then_spins() {
        let mut motion = Motion::new(&PostLoad::Spin {
            initial_rotation: RotationState::new(FRAC_PI_2, 0.0, 0.0),
            spin: Spin::default(),
        });
        let mut pose = Pose::identity();
        motion.begin_loading().unwrap();
        motion.place(&mut pose, false).unwrap();
        assert_eq!(pose.rotation.x, FRAC_PI_2);

        motion.tick(&mut pose);
        motion.tick(&mut pose);
        assert!((pose.rotation.z - 0.02).abs() < 1e-6);
        assert_eq!(pose.position, nalgebra::Vector3::zeros());
    }

    #[test]
    fn test_card_motion_uses_fallback_phase() {
        let mut motion = Motion::new(&PostLoad::CardRise {
            start_height: -30.0,
            rest_height: 0.0,
        });
        let mut pose = Pose::identity();
        motion.begin_loading().unwrap();
        motion.place(&mut pose, true).unwrap();
        assert_eq!(pose.position.y, -30.0);
        match &motion {
            Motion::Card(card) => assert_eq!(card.phase(), CardPhase::Rising),
            Motion::Spin { .. } => panic!("expected card motion"),
        }
    }
}
