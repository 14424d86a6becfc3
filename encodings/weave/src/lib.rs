//! Bit interleaving ("weaving") of coordinate pairs and triples.
//!
//! Weaving packs the zigzagged per-axis deltas of a point into a single integer, so that a point
//! whose deltas are all small costs a single short varint on the wire instead of one per axis.
//! Bit `i` of the first input lands on bit `2i` (2D) or `3i` (3D) of the output, bit `i` of the
//! second on `2i + 1` / `3i + 1`, and bit `i` of the third on `3i + 2`.
//!
//! [`weave_2d`] accepts full 32-bit inputs; [`weave_3d`] accepts inputs of up to
//! [`WEAVE_3D_BITS`] bits. Both are exact inverses of their `unweave` counterparts over those
//! domains.

#![allow(clippy::cast_possible_truncation)]

/// Number of significant bits per input accepted by [`weave_3d`].
pub const WEAVE_3D_BITS: u32 = 21;

/// Largest value [`weave_3d`] can interleave without losing bits.
pub const WEAVE_3D_MAX: u32 = (1 << WEAVE_3D_BITS) - 1;

#[inline]
fn spread_2(value: u32) -> u64 {
    let mut x = u64::from(value);
    x = (x | (x << 16)) & 0x0000_FFFF_0000_FFFF;
    x = (x | (x << 8)) & 0x00FF_00FF_00FF_00FF;
    x = (x | (x << 4)) & 0x0F0F_0F0F_0F0F_0F0F;
    x = (x | (x << 2)) & 0x3333_3333_3333_3333;
    (x | (x << 1)) & 0x5555_5555_5555_5555
}

#[inline]
fn compact_2(value: u64) -> u32 {
    let mut x = value & 0x5555_5555_5555_5555;
    x = (x | (x >> 1)) & 0x3333_3333_3333_3333;
    x = (x | (x >> 2)) & 0x0F0F_0F0F_0F0F_0F0F;
    x = (x | (x >> 4)) & 0x00FF_00FF_00FF_00FF;
    x = (x | (x >> 8)) & 0x0000_FFFF_0000_FFFF;
    ((x | (x >> 16)) & 0x0000_0000_FFFF_FFFF) as u32
}

#[inline]
fn spread_3(value: u32) -> u64 {
    let mut x = u64::from(value & WEAVE_3D_MAX);
    x = (x | (x << 32)) & 0x001F_0000_0000_FFFF;
    x = (x | (x << 16)) & 0x001F_0000_FF00_00FF;
    x = (x | (x << 8)) & 0x100F_00F0_0F00_F00F;
    x = (x | (x << 4)) & 0x10C3_0C30_C30C_30C3;
    (x | (x << 2)) & 0x1249_2492_4924_9249
}

#[inline]
fn compact_3(value: u64) -> u32 {
    let mut x = value & 0x1249_2492_4924_9249;
    x = (x | (x >> 2)) & 0x10C3_0C30_C30C_30C3;
    x = (x | (x >> 4)) & 0x100F_00F0_0F00_F00F;
    x = (x | (x >> 8)) & 0x001F_0000_FF00_00FF;
    x = (x | (x >> 16)) & 0x001F_0000_0000_FFFF;
    ((x | (x >> 32)) & u64::from(WEAVE_3D_MAX)) as u32
}

/// Interleave the bits of `a` and `b`.
#[inline]
pub fn weave_2d(a: u32, b: u32) -> u64 {
    spread_2(a) | (spread_2(b) << 1)
}

/// Split a value produced by [`weave_2d`] back into its two inputs.
#[inline]
pub fn unweave_2d(woven: u64) -> (u32, u32) {
    (compact_2(woven), compact_2(woven >> 1))
}

/// Interleave the low [`WEAVE_3D_BITS`] bits of `a`, `b` and `c`.
///
/// Higher bits are discarded; callers that cannot guarantee the range must check against
/// [`WEAVE_3D_MAX`] first.
#[inline]
pub fn weave_3d(a: u32, b: u32, c: u32) -> u64 {
    spread_3(a) | (spread_3(b) << 1) | (spread_3(c) << 2)
}

/// Split a value produced by [`weave_3d`] back into its three inputs.
#[inline]
pub fn unweave_3d(woven: u64) -> (u32, u32, u32) {
    (
        compact_3(woven),
        compact_3(woven >> 1),
        compact_3(woven >> 2),
    )
}

#[cfg(test)]
mod test {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use rstest::rstest;

    use super::*;

    fn naive_weave(inputs: &[u32], bits: u32) -> u64 {
        let n = inputs.len() as u32;
        let mut out = 0_u64;
        for bit in 0..bits {
            for (lane, input) in inputs.iter().enumerate() {
                out |= u64::from((input >> bit) & 1) << (bit * n + lane as u32);
            }
        }
        out
    }

    #[rstest]
    #[case(0, 0, 0)]
    #[case(1, 0, 0b01)]
    #[case(0, 1, 0b10)]
    #[case(3, 0, 0b0101)]
    #[case(0b11, 0b11, 0b1111)]
    #[case(65_535, 0, 0x5555_5555)]
    #[case(0, 65_535, 0xAAAA_AAAA)]
    fn test_weave_2d_layout(#[case] a: u32, #[case] b: u32, #[case] woven: u64) {
        assert_eq!(weave_2d(a, b), woven);
        assert_eq!(unweave_2d(woven), (a, b));
    }

    #[test]
    fn test_weave_2d_all_16_bit_pairs_on_stride() {
        // Every a with a coarse stride on b, plus every b with a coarse stride on a.
        for a in 0..=u16::MAX as u32 {
            for b in (0..=u16::MAX as u32).step_by(4099).chain([u16::MAX as u32]) {
                assert_eq!(unweave_2d(weave_2d(a, b)), (a, b));
                assert_eq!(unweave_2d(weave_2d(b, a)), (b, a));
            }
        }
    }

    #[test]
    fn test_weave_2d_matches_naive_full_width() {
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..10_000 {
            let (a, b) = (rng.random::<u32>(), rng.random::<u32>());
            assert_eq!(weave_2d(a, b), naive_weave(&[a, b], 32));
            assert_eq!(unweave_2d(weave_2d(a, b)), (a, b));
        }
        assert_eq!(unweave_2d(weave_2d(u32::MAX, u32::MAX)), (u32::MAX, u32::MAX));
    }

    #[test]
    fn test_weave_3d_layout() {
        assert_eq!(weave_3d(1, 0, 0), 0b001);
        assert_eq!(weave_3d(0, 1, 0), 0b010);
        assert_eq!(weave_3d(0, 0, 1), 0b100);
        assert_eq!(weave_3d(2, 2, 2), 0b111_000);
        assert_eq!(unweave_3d(0b111_000), (2, 2, 2));
    }

    #[test]
    fn test_weave_3d_16_bit_inverse() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..50_000 {
            let a = u32::from(rng.random::<u16>());
            let b = u32::from(rng.random::<u16>());
            let c = u32::from(rng.random::<u16>());
            let woven = weave_3d(a, b, c);
            assert!(woven < 1 << 48);
            assert_eq!(woven, naive_weave(&[a, b, c], 16));
            assert_eq!(unweave_3d(woven), (a, b, c));
        }
        let max = u32::from(u16::MAX);
        assert_eq!(unweave_3d(weave_3d(max, max, max)), (max, max, max));
    }

    #[test]
    fn test_weave_3d_full_width() {
        let woven = weave_3d(WEAVE_3D_MAX, 0, WEAVE_3D_MAX);
        assert_eq!(unweave_3d(woven), (WEAVE_3D_MAX, 0, WEAVE_3D_MAX));
        assert_eq!(woven, naive_weave(&[WEAVE_3D_MAX, 0, WEAVE_3D_MAX], WEAVE_3D_BITS));
    }
}
