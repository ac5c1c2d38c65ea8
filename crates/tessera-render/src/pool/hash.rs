//! Content hashing for draw dedup and state grouping.
//!
//! Hashes are compared for equality only and never persisted, so the fast
//! non-cryptographic `fxhash` is used throughout.

use std::hash::{Hash, Hasher};

use fxhash::FxHasher64;
use tessera_core::math::mat3_bits;

use crate::pool::coords::CoordsBuffer;
use crate::pool::method::DrawMethod;
use crate::pool::state::PaintState;

/// Mix `value` into `seed`.
#[inline]
pub fn hash_combine(seed: u64, value: u64) -> u64 {
    seed ^ (value
        .wrapping_add(0x9e37_79b9_7f4a_7c15)
        .wrapping_add(seed << 6)
        .wrapping_add(seed >> 2))
}

/// Hash of every replay-relevant field of `state`. The apply action is ignored.
pub fn state_hash(state: &PaintState) -> u64 {
    let mut hasher = FxHasher64::default();
    mat3_bits(&state.transform).hash(&mut hasher);
    state.color.hash(&mut hasher);
    state.opacity.to_bits().hash(&mut hasher);
    state.composition_mode.hash(&mut hasher);
    state.blend_equation.hash(&mut hasher);
    state.clip_rect.hash(&mut hasher);
    state.texture.as_ref().map(|t| t.id()).hash(&mut hasher);
    state.shader.as_ref().map(|s| s.id()).hash(&mut hasher);
    hasher.finish()
}

pub fn method_hash(method: &DrawMethod) -> u64 {
    fxhash::hash64(method)
}

/// Hash of pre-built geometry, over its raw bytes.
pub fn coords_hash(coords: &CoordsBuffer) -> u64 {
    let mut hasher = FxHasher64::default();
    hasher.write(coords.as_bytes());
    hasher.write(coords.index_bytes());
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Color;
    use crate::pool::state::Action;
    use std::rc::Rc;
    use tessera_core::geometry::Rect;

    #[test]
    fn test_combine_is_order_sensitive() {
        assert_ne!(hash_combine(1, 2), hash_combine(2, 1));
    }

    #[test]
    fn test_state_hash_ignores_action() {
        let plain = PaintState::default();
        let mut with_action = PaintState::default();
        let action: Action = Rc::new(|_| {});
        with_action.on_apply = Some(action);
        assert_eq!(state_hash(&plain), state_hash(&with_action));
    }

    #[test]
    fn test_state_hash_sees_color() {
        let mut red = PaintState::default();
        red.color = Color::RED;
        assert_ne!(state_hash(&PaintState::default()), state_hash(&red));
    }

    #[test]
    fn test_method_hash_sees_geometry() {
        let a = DrawMethod::filled(Rect::new(0, 0, 4, 4));
        let b = DrawMethod::filled(Rect::new(0, 0, 4, 5));
        assert_eq!(method_hash(&a), method_hash(&a));
        assert_ne!(method_hash(&a), method_hash(&b));
    }
}
