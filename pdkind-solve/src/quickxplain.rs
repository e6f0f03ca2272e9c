//! A single generic QuickXplain (Junker 2004), used by `Facade` for all
//! three shrinking sites the original solver names separately
//! (`quickxplain_interpolant`, `quickxplain_generalization`,
//! `quickxplain_frame` in `original_source/src/engine/pdkind/solvers.h`):
//! minimizing a generalized cube, an interpolant's conjuncts, and a frame
//! before it is returned to the driver (`SPEC_FULL.md` §4.5).

/// Returns a minimal sublist of `items` for which `holds` is still `true`,
/// assuming `holds(&items)` holds for the full list (callers must ensure
/// this) and that `holds` is monotone: if it holds for a set, it holds for
/// every superset. `holds` is evaluated at most `O(n log n)` times.
pub fn quickxplain<T: Clone>(items: &[T], holds: &mut impl FnMut(&[T]) -> bool) -> Vec<T> {
    fn go<T: Clone>(background: &[T], items: &[T], holds: &mut impl FnMut(&[T]) -> bool) -> Vec<T> {
        if items.is_empty() {
            return Vec::new();
        }
        if !background.is_empty() && holds(background) {
            return Vec::new();
        }
        if items.len() == 1 {
            return items.to_vec();
        }
        let mid = items.len() / 2;
        let (first_half, second_half) = items.split_at(mid);

        let mut background_with_second: Vec<T> = background.to_vec();
        background_with_second.extend_from_slice(second_half);
        let delta1 = go(&background_with_second, first_half, holds);

        let mut background_with_delta1: Vec<T> = background.to_vec();
        background_with_delta1.extend_from_slice(&delta1);
        let delta2 = go(&background_with_delta1, second_half, holds);

        let mut result = delta1;
        result.extend(delta2);
        result
    }
    go(&[], items, holds)
}

#[cfg(test)]
mod tests {
    use super::quickxplain;

    #[test]
    fn drops_irrelevant_items() {
        // "still holds" iff the remaining items' sum is >= 5.
        let items = vec![1, 1, 1, 10];
        let result = quickxplain(&items, &mut |xs: &[i32]| xs.iter().sum::<i32>() >= 5);
        assert_eq!(result, vec![10]);
    }

    #[test]
    fn keeps_everything_when_necessary() {
        let items = vec![2, 2, 2];
        let result = quickxplain(&items, &mut |xs: &[i32]| xs.iter().sum::<i32>() >= 6);
        assert_eq!(result.iter().sum::<i32>(), 6);
    }

    #[test]
    fn empty_input_is_empty_output() {
        let items: Vec<i32> = Vec::new();
        let result = quickxplain(&items, &mut |_: &[i32]| true);
        assert!(result.is_empty());
    }
}
