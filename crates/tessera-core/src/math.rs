/// Fast mathematical operations using SIMD-accelerated `glam` types.
///
/// The draw pool stores its 2D transforms as [`Mat3`] (homogeneous
/// coordinates) and transforms points with [`Vec2`].
///
/// # Examples
///
/// ```
/// use tessera_core::math::{Mat3, Vec2};
///
/// let transform = Mat3::from_translation(Vec2::new(10.0, 20.0));
/// let moved = transform.transform_point2(Vec2::ZERO);
/// assert_eq!(moved, Vec2::new(10.0, 20.0));
/// ```
///
/// [`glam`]: https://docs.rs/glam
pub mod fast {
    pub use glam::*;
}

pub use fast::*;

/// Bit pattern of a matrix, for hashing and exact comparison.
///
/// `f32` is neither `Hash` nor `Eq`; comparing bit patterns treats `-0.0` and
/// `0.0` as different, which only ever causes a spurious cache miss.
pub fn mat3_bits(m: &Mat3) -> [u32; 9] {
    m.to_cols_array().map(f32::to_bits)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mat3_bits_identity() {
        assert_eq!(mat3_bits(&Mat3::IDENTITY), mat3_bits(&Mat3::IDENTITY));
        assert_ne!(
            mat3_bits(&Mat3::IDENTITY),
            mat3_bits(&Mat3::from_translation(Vec2::new(1.0, 0.0)))
        );
    }
}
