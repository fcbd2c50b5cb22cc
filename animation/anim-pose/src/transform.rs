//! Rigid joint transforms
//!
//! Joints only carry rotation and translation. Composition follows the usual
//! matrix convention: `a * b` applies `b` first, then `a`.

use glam::{Quat, Vec3, Vec4};

/// Rotation plus translation
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize, serde::Deserialize))]
pub struct Transform {
    /// Unit quaternion rotation
    pub rotation: Quat,
    /// Translation applied after rotation
    pub translation: Vec3,
}

impl Transform {
    /// Identity transform
    pub const IDENTITY: Self = Self {
        rotation: Quat::IDENTITY,
        translation: Vec3::ZERO,
    };

    /// Create a transform from rotation and translation
    pub const fn new(rotation: Quat, translation: Vec3) -> Self {
        Self {
            rotation,
            translation,
        }
    }

    /// Pure translation
    pub const fn from_translation(translation: Vec3) -> Self {
        Self {
            rotation: Quat::IDENTITY,
            translation,
        }
    }

    /// Pure rotation
    pub const fn from_rotation(rotation: Quat) -> Self {
        Self {
            rotation,
            translation: Vec3::ZERO,
        }
    }

    /// Compose two transforms (self * other)
    pub fn mul(&self, other: &Self) -> Self {
        Self {
            rotation: (self.rotation * other.rotation).normalize(),
            translation: self.rotation * other.translation + self.translation,
        }
    }

    /// Inverse transform
    pub fn inverse(&self) -> Self {
        let rotation = self.rotation.conjugate();
        Self {
            rotation,
            translation: rotation * -self.translation,
        }
    }

    /// Transform a point
    pub fn transform_point(&self, p: Vec3) -> Vec3 {
        self.rotation * p + self.translation
    }

    /// Transform a direction (ignores translation)
    pub fn transform_vector(&self, v: Vec3) -> Vec3 {
        self.rotation * v
    }

    /// Pack as `[rotation, translation]` for skinning upload
    ///
    /// The rotation lands in xyzw order, the translation carries `w = 0`.
    pub fn to_packed(&self) -> [Vec4; 2] {
        [Vec4::from(self.rotation), self.translation.extend(0.0)]
    }

    /// Rebuild a transform from its packed form
    pub fn from_packed(rotation: Vec4, translation: Vec4) -> Self {
        Self {
            rotation: Quat::from_vec4(rotation),
            translation: translation.truncate(),
        }
    }

    /// Compare within `max_abs_diff`, treating `q` and `-q` as equal
    pub fn abs_diff_eq(&self, other: &Self, max_abs_diff: f32) -> bool {
        let same_rotation = self.rotation.abs_diff_eq(other.rotation, max_abs_diff)
            || self.rotation.abs_diff_eq(-other.rotation, max_abs_diff);
        same_rotation
            && self
                .translation
                .abs_diff_eq(other.translation, max_abs_diff)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl std::ops::Mul for Transform {
    type Output = Transform;

    fn mul(self, rhs: Self) -> Self::Output {
        Transform::mul(&self, &rhs)
    }
}

/// Trait for values that can be interpolated between keyframes
pub trait Lerp: Clone {
    /// Interpolate between self and other
    fn lerp(&self, other: &Self, t: f32) -> Self;
}

impl Lerp for f32 {
    fn lerp(&self, other: &Self, t: f32) -> Self {
        self + (other - self) * t
    }
}

impl Lerp for Vec3 {
    fn lerp(&self, other: &Self, t: f32) -> Self {
        Vec3::lerp(*self, *other, t)
    }
}

impl Lerp for Quat {
    fn lerp(&self, other: &Self, t: f32) -> Self {
        // slerp takes the shorter arc
        self.slerp(*other, t).normalize()
    }
}

impl Lerp for Transform {
    fn lerp(&self, other: &Self, t: f32) -> Self {
        if t <= 0.0 {
            return *self;
        }
        if t >= 1.0 {
            return *other;
        }
        Self {
            rotation: Lerp::lerp(&self.rotation, &other.rotation, t),
            translation: Lerp::lerp(&self.translation, &other.translation, t),
        }
    }
}
