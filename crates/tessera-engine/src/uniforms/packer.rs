//! Flattens uniform values into a `f32` buffer following uniform-block alignment.
//!
//! Slots are 4-byte floats:
//! - a scalar takes one slot, no alignment
//! - a vector of at most 2 components starts on a 2-slot boundary
//! - a longer vector (vec3, vec4, matrices) starts on a 4-slot boundary
//!
//! The total length is rounded up to a multiple of 4 slots.

use super::UniformData;

#[inline]
fn aligned_offset(offset: usize, value: &UniformData<'_>) -> usize {
    match value {
        UniformData::Scalar(_) => offset,
        UniformData::Vector(v) if v.len() <= 2 => offset.next_multiple_of(2),
        UniformData::Vector(_) => offset.next_multiple_of(4),
    }
}

#[inline]
fn slots(value: &UniformData<'_>) -> usize {
    match value {
        UniformData::Scalar(_) => 1,
        UniformData::Vector(v) => v.len(),
    }
}

/// Number of `f32` slots [`pack`] produces for `values`.
pub fn packed_len(values: &[UniformData<'_>]) -> usize {
    values
        .iter()
        .fold(0, |offset, v| aligned_offset(offset, v) + slots(v))
        .next_multiple_of(4)
}

/// Packs `values` into a fresh zeroed buffer.
pub fn pack(values: &[UniformData<'_>]) -> Vec<f32> {
    let mut out = Vec::new();
    pack_into(values, &mut out);
    out
}

/// Packs `values` into `out`, reusing its allocation. Padding slots are zero.
pub fn pack_into(values: &[UniformData<'_>], out: &mut Vec<f32>) {
    out.clear();
    out.resize(packed_len(values), 0.0);

    let mut offset = 0;
    for value in values {
        offset = aligned_offset(offset, value);
        match value {
            UniformData::Scalar(s) => out[offset] = *s,
            UniformData::Vector(v) => out[offset..offset + v.len()].copy_from_slice(v),
        }
        offset += slots(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use UniformData::{Scalar, Vector};

    // ── length ──────────────────────────────────────────────────────────────

    #[test]
    fn length_rounds_up_to_four() {
        assert_eq!(packed_len(&[]), 0);
        assert_eq!(packed_len(&[Scalar(1.0)]), 4);
        assert_eq!(packed_len(&[Scalar(1.0); 5]), 8);
        assert_eq!(packed_len(&[Vector(&[0.0; 16])]), 16);
    }

    #[test]
    fn pack_length_matches_size_pass() {
        let values = [Scalar(1.0), Vector(&[1.0, 2.0, 3.0]), Vector(&[4.0, 5.0]), Scalar(6.0)];
        assert_eq!(pack(&values).len(), packed_len(&values));
    }

    // ── alignment ───────────────────────────────────────────────────────────

    #[test]
    fn vec3_after_scalar_starts_on_four() {
        let out = pack(&[Scalar(1.0), Vector(&[2.0, 3.0, 4.0])]);
        assert_eq!(out, [1.0, 0.0, 0.0, 0.0, 2.0, 3.0, 4.0, 0.0]);
    }

    #[test]
    fn vec2_starts_on_two() {
        let out = pack(&[Scalar(1.0), Vector(&[2.0, 3.0])]);
        assert_eq!(out, [1.0, 0.0, 2.0, 3.0]);
    }

    #[test]
    fn scalar_fills_vec3_tail() {
        let out = pack(&[Vector(&[1.0, 2.0, 3.0]), Scalar(4.0)]);
        assert_eq!(out, [1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn scalars_pack_tightly() {
        let out = pack(&[Scalar(1.0), Scalar(2.0), Scalar(3.0)]);
        assert_eq!(out, [1.0, 2.0, 3.0, 0.0]);
    }

    #[test]
    fn matrix_after_vec2_realigns() {
        let mut m = [0.0f32; 16];
        m[0] = 9.0;
        let out = pack(&[Vector(&[1.0, 2.0]), Vector(&m)]);
        assert_eq!(out.len(), 20);
        assert_eq!(out[4], 9.0);
        assert_eq!(&out[2..4], &[0.0, 0.0]);
    }

    // ── reuse ───────────────────────────────────────────────────────────────

    #[test]
    fn pack_into_clears_stale_contents() {
        let mut buf = vec![7.0; 12];
        pack_into(&[Scalar(1.0), Vector(&[2.0, 3.0, 4.0])], &mut buf);
        assert_eq!(buf, [1.0, 0.0, 0.0, 0.0, 2.0, 3.0, 4.0, 0.0]);
    }
}
