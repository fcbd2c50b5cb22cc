//! Animation clips and keyframe sampling
//!
//! Controllers only see the [`AnimationClip`] trait. [`KeyframeClip`] is the
//! in-memory implementation: per-joint rotation and translation tracks with
//! step or linear interpolation.

use std::fmt;

use glam::{Quat, Vec3};

use crate::error::{AnimError, Result};
use crate::pose::Pose;
use crate::transform::{Lerp, Transform};

/// A sampled animation source
pub trait AnimationClip: fmt::Debug + Send + Sync {
    /// Length in seconds
    fn duration(&self) -> f32;

    /// Write the joint overrides (deltas from bind) for `time` into `pose`
    ///
    /// Joints the clip does not animate are left untouched.
    fn sample(&self, time: f32, pose: &mut Pose);
}

/// How values between two keyframes are produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize, serde::Deserialize))]
pub enum Interpolation {
    /// Hold the earlier keyframe
    Step,
    /// Linear (slerp for rotations)
    #[default]
    Linear,
}

/// Find the index of the keyframe at or before the given time
///
/// Returns None if there are no keyframes. The result is the earlier
/// keyframe of the bracketing pair, so callers interpolate between
/// `[index]` and `[index + 1]`.
pub fn find_timestamp_index(timestamps: &[f32], time: f32) -> Option<usize> {
    if timestamps.is_empty() {
        return None;
    }

    let last_index = timestamps.len() - 1;
    if time >= timestamps[last_index] {
        return Some(last_index);
    }

    // Largest index where timestamps[index] <= time
    Some(timestamps.partition_point(|&t| t <= time).saturating_sub(1))
}

/// Keyframes for a single animated value
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize, serde::Deserialize))]
pub struct KeyframeTrack<T> {
    interpolation: Interpolation,
    timestamps: Vec<f32>,
    values: Vec<T>,
}

impl<T: Lerp> KeyframeTrack<T> {
    /// Create a track, checking timestamps are sorted and match the values
    pub fn new(interpolation: Interpolation, timestamps: Vec<f32>, values: Vec<T>) -> Result<Self> {
        if timestamps.len() != values.len() {
            return Err(AnimError::InvalidTrack(format!(
                "{} timestamps for {} values",
                timestamps.len(),
                values.len()
            )));
        }
        if timestamps.windows(2).any(|w| w[0] > w[1]) {
            return Err(AnimError::InvalidTrack(
                "timestamps are not sorted".to_string(),
            ));
        }

        Ok(Self {
            interpolation,
            timestamps,
            values,
        })
    }

    /// Track holding one value forever
    pub fn constant(value: T) -> Self {
        Self {
            interpolation: Interpolation::Step,
            timestamps: vec![0.0],
            values: vec![value],
        }
    }

    /// Check if the track has keyframes
    pub fn has_data(&self) -> bool {
        !self.timestamps.is_empty()
    }

    /// Time of the last keyframe
    pub fn end_time(&self) -> f32 {
        self.timestamps.last().copied().unwrap_or(0.0)
    }

    /// Interpolated value at `time`, None if the track is empty
    pub fn sample(&self, time: f32) -> Option<T> {
        let index = find_timestamp_index(&self.timestamps, time)?;

        if index >= self.timestamps.len() - 1 || time <= self.timestamps[index] {
            return self.values.get(index).cloned();
        }

        let time1 = self.timestamps[index];
        let time2 = self.timestamps[index + 1];
        let value1 = &self.values[index];
        let value2 = &self.values[index + 1];

        match self.interpolation {
            Interpolation::Step => Some(value1.clone()),
            Interpolation::Linear => {
                let t = if time2 > time1 {
                    (time - time1) / (time2 - time1)
                } else {
                    0.0
                };
                Some(value1.lerp(value2, t.clamp(0.0, 1.0)))
            }
        }
    }
}

/// Rotation and translation tracks for one joint
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize, serde::Deserialize))]
pub struct JointTrack {
    /// Target joint index
    pub joint: usize,
    /// Rotation keyframes relative to the parent
    pub rotation: Option<KeyframeTrack<Quat>>,
    /// Translation keyframes relative to the parent
    pub translation: Option<KeyframeTrack<Vec3>>,
}

/// Keyframed clip held in memory
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize, serde::Deserialize))]
pub struct KeyframeClip {
    duration: f32,
    looping: bool,
    tracks: Vec<JointTrack>,
}

impl KeyframeClip {
    /// Create a clip
    ///
    /// Track values are deltas applied on top of each joint's bind local
    /// transform. A joint with only one channel keeps the other at identity.
    pub fn new(duration: f32, looping: bool, tracks: Vec<JointTrack>) -> Self {
        Self {
            duration: duration.max(0.0),
            looping,
            tracks,
        }
    }

    /// Check if sampling wraps around
    pub fn is_looping(&self) -> bool {
        self.looping
    }

    /// Joint tracks
    pub fn tracks(&self) -> &[JointTrack] {
        &self.tracks
    }

    fn local_time(&self, time: f32) -> f32 {
        if self.duration <= 0.0 {
            return 0.0;
        }
        if self.looping {
            time.rem_euclid(self.duration)
        } else {
            time.clamp(0.0, self.duration)
        }
    }
}

impl AnimationClip for KeyframeClip {
    fn duration(&self) -> f32 {
        self.duration
    }

    fn sample(&self, time: f32, pose: &mut Pose) {
        let time = self.local_time(time);

        for track in &self.tracks {
            let rotation = track.rotation.as_ref().and_then(|t| t.sample(time));
            let translation = track.translation.as_ref().and_then(|t| t.sample(time));
            if rotation.is_none() && translation.is_none() {
                continue;
            }

            pose.insert(
                track.joint,
                Transform::new(
                    rotation.map_or(Quat::IDENTITY, Quat::normalize),
                    translation.unwrap_or(Vec3::ZERO),
                ),
            );
        }
    }
}
