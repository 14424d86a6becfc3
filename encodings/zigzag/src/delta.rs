use crate::{zigzag_decode, zigzag_encode};

/// Replace every value after the first with its difference from the previous value.
///
/// Differences wrap on overflow so that [`delta_decode`] is an exact inverse for any input.
pub fn delta_encode(values: &[i64]) -> Vec<i64> {
    let mut prev = 0_i64;
    values
        .iter()
        .map(|&v| {
            let delta = v.wrapping_sub(prev);
            prev = v;
            delta
        })
        .collect()
}

/// Running sum of `deltas`, the inverse of [`delta_encode`].
pub fn delta_decode(deltas: &[i64]) -> Vec<i64> {
    let mut acc = 0_i64;
    deltas
        .iter()
        .map(|&d| {
            acc = acc.wrapping_add(d);
            acc
        })
        .collect()
}

/// Delta encode an unsigned sequence and zigzag each delta back into an unsigned value.
///
/// This is the codec for index lists, shape value lists and triangulation indices.
pub fn zigzag_delta_encode(values: &[u64]) -> Vec<u64> {
    let mut prev = 0_u64;
    values
        .iter()
        .map(|&v| {
            let delta = v.wrapping_sub(prev) as i64;
            prev = v;
            zigzag_encode(delta)
        })
        .collect()
}

/// The inverse of [`zigzag_delta_encode`].
pub fn zigzag_delta_decode(encoded: &[u64]) -> Vec<u64> {
    let mut acc = 0_u64;
    encoded
        .iter()
        .map(|&e| {
            acc = acc.wrapping_add(zigzag_decode(e) as u64);
            acc
        })
        .collect()
}

#[cfg(test)]
mod test {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(vec![])]
    #[case(vec![7])]
    #[case(vec![1, 2, 3, 4, 5])]
    #[case(vec![5, 3, -10, 400, 400, -1])]
    #[case(vec![i64::MIN, i64::MAX, 0, i64::MAX, i64::MIN])]
    fn test_delta_roundtrip(#[case] values: Vec<i64>) {
        assert_eq!(delta_decode(&delta_encode(&values)), values);
    }

    #[test]
    fn test_delta_encode_values() {
        assert_eq!(delta_encode(&[10, 12, 11, 11]), vec![10, 2, -1, 0]);
    }

    #[test]
    fn test_delta_random_sequences() {
        let mut rng = StdRng::seed_from_u64(42);
        for len in [1, 2, 17, 256, 4096] {
            let values = (0..len).map(|_| rng.random::<i64>()).collect::<Vec<_>>();
            assert_eq!(delta_decode(&delta_encode(&values)), values);
        }
    }

    #[test]
    fn test_zigzag_delta_small_steps_stay_small() {
        let encoded = zigzag_delta_encode(&[100, 101, 99, 99]);
        assert_eq!(encoded, vec![200, 2, 3, 0]);
        assert_eq!(zigzag_delta_decode(&encoded), vec![100, 101, 99, 99]);
    }

    #[test]
    fn test_zigzag_delta_random_sequences() {
        let mut rng = StdRng::seed_from_u64(7);
        for len in [0, 1, 3, 1000] {
            let values = (0..len).map(|_| rng.random::<u64>()).collect::<Vec<_>>();
            assert_eq!(zigzag_delta_decode(&zigzag_delta_encode(&values)), values);
        }
    }
}
