//! Wheel position targeting for the spin animation.
//!
//! The wheel never decides anything: it is aimed at the index returned by
//! [`crate::draw::draw`]. The pointer sits at 0° (top) and segment `i` spans
//! `[i * seg, (i + 1) * seg)` in wheel coordinates.

use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::*;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum WheelError {
    #[error("segment {index} does not exist on a wheel with {segments} segments")]
    InvalidSegment { index: usize, segments: usize },
    #[error("wheel rotation must be a finite number of degrees, got {0}")]
    InvalidRotation(f64),
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct Anticipation {
    pub start: f64,
    pub anticipation: f64,
    pub duration_ms: u32,
}

impl Anticipation {
    /// Small backswing played before the real spin starts.
    pub fn from_rotation(current_rotation: f64) -> Self {
        Self {
            start: current_rotation,
            anticipation: current_rotation - ANTICIPATION_BACKSWING_DEG,
            duration_ms: ANTICIPATION_DURATION_MS,
        }
    }
}

/// Everything the client needs to animate one spin.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct WheelSpin {
    pub index: usize,
    pub target_angle: f64,
    pub extra_turns: u32,
    pub duration_ms: u32,
    pub easing: String,
    pub anticipation: Anticipation,
}

impl WheelSpin {
    /// Plans the animation that lands the pointer on `index`, starting from the wheel's
    /// current rotation. Only the number of decorative extra turns is random.
    ///
    /// `anticipation.start` is the rotation the animation begins from. It differs from
    /// `current_rotation` only when the latter was folded by [`rebase_rotation`], and
    /// shows the wheel in the same pose.
    pub fn plan<R: Rng + ?Sized>(
        segments: usize,
        index: usize,
        current_rotation: f64,
        rng: &mut R,
    ) -> Result<Self, WheelError> {
        let start = rebase_rotation(current_rotation)?;
        let extra_turns = rng.gen_range(MIN_EXTRA_TURNS..MAX_EXTRA_TURNS);
        let target_angle = target_angle(segments, index, start, extra_turns)?;

        Ok(Self {
            index,
            target_angle,
            extra_turns,
            duration_ms: animation_duration_ms(target_angle - start),
            easing: SPIN_EASING.to_string(),
            anticipation: Anticipation::from_rotation(start),
        })
    }
}

/// Rotation to start planning from. Angles past [`MAX_CONTINUOUS_ROTATION_DEG`] are
/// folded into `[0, 360)`; adding whole turns to them would not be exact in `f64`.
pub fn rebase_rotation(rotation: f64) -> Result<f64, WheelError> {
    if !rotation.is_finite() {
        return Err(WheelError::InvalidRotation(rotation));
    }
    if rotation.abs() > MAX_CONTINUOUS_ROTATION_DEG {
        return Ok(rotation.rem_euclid(FULL_TURN_DEG));
    }
    Ok(rotation)
}

fn check_segment(segments: usize, index: usize) -> Result<(), WheelError> {
    if segments == 0 || index >= segments {
        return Err(WheelError::InvalidSegment { index, segments });
    }
    Ok(())
}

pub fn segment_angle(segments: usize) -> f64 {
    FULL_TURN_DEG / segments as f64
}

/// Center of segment `index` in wheel coordinates.
pub fn segment_center(segments: usize, index: usize) -> Result<f64, WheelError> {
    check_segment(segments, index)?;
    let seg = segment_angle(segments);
    Ok(index as f64 * seg + seg / 2.0)
}

/// Final wheel rotation that puts the center of segment `index` under the pointer.
///
/// The result is always ahead of `current_rotation` by `extra_turns` full turns plus the
/// remaining distance (less than one turn) to the resting angle, so the wheel keeps turning
/// forward no matter where the previous spin left it.
pub fn target_angle(
    segments: usize,
    index: usize,
    current_rotation: f64,
    extra_turns: u32,
) -> Result<f64, WheelError> {
    let center = segment_center(segments, index)?;
    let resting = (FULL_TURN_DEG - center).rem_euclid(FULL_TURN_DEG);
    let offset = (resting - current_rotation.rem_euclid(FULL_TURN_DEG)).rem_euclid(FULL_TURN_DEG);
    Ok(current_rotation + f64::from(extra_turns) * FULL_TURN_DEG + offset)
}

/// Segment under the pointer once the wheel has come to rest at `rotation`.
pub fn landing_index(segments: usize, rotation: f64) -> Result<usize, WheelError> {
    check_segment(segments, 0)?;
    let under_pointer = (-rotation).rem_euclid(FULL_TURN_DEG);
    let index = (under_pointer / segment_angle(segments)).floor() as usize;
    Ok(index.min(segments - 1))
}

/// Spin duration grows slightly with the distance travelled, capped at +500ms.
pub fn animation_duration_ms(distance_deg: f64) -> u32 {
    let ratio = (distance_deg.abs() / DURATION_VARIATION_DISTANCE_DEG).min(1.0);
    BASE_SPIN_DURATION_MS + (ratio * f64::from(MAX_SPIN_DURATION_VARIATION_MS)) as u32
}
