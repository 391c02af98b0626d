//! In-place heap sort.

use std::cmp::Ordering;

/// Sorts the slice in ascending order using heap sort.
///
/// Runs in *O*(*n* \* log(*n*)) time and uses constant auxiliary space. The sort is not stable.
pub fn heap_sort<T: Ord>(items: &mut [T]) {
    heap_sort_by(items, T::cmp)
}

/// Sorts the slice using a custom compare function.
///
/// # Arguments
/// * `items` - Slice to be sorted in place
/// * `compare` - Function to be used to compare items
pub fn heap_sort_by<T, F>(items: &mut [T], mut compare: F)
where
    F: FnMut(&T, &T) -> Ordering,
{
    let len = items.len();
    if len < 2 {
        return;
    }

    for root in (0..len / 2).rev() {
        sift_down(items, root, len, &mut compare);
    }

    for end in (1..len).rev() {
        // the root holds the maximum of the unsorted prefix
        items.swap(0, end);
        sift_down(items, 0, end, &mut compare);
    }
}

/// Restores the max-heap property of the subtree rooted at `root` within `items[..len]`.
fn sift_down<T, F>(items: &mut [T], mut root: usize, len: usize, compare: &mut F)
where
    F: FnMut(&T, &T) -> Ordering,
{
    loop {
        let left = 2 * root + 1;
        let right = left + 1;
        let mut largest = root;

        if left < len && compare(&items[left], &items[largest]) == Ordering::Greater {
            largest = left;
        }
        if right < len && compare(&items[right], &items[largest]) == Ordering::Greater {
            largest = right;
        }
        if largest == root {
            return;
        }

        items.swap(root, largest);
        root = largest;
    }
}

#[cfg(test)]
mod test {
    use rand::seq::SliceRandom;
    use rstest::*;

    use super::{heap_sort, heap_sort_by};

    #[rstest]
    #[case(vec![], vec![])]
    #[case(vec!["b"], vec!["b"])]
    #[case(vec!["b", "a"], vec!["a", "b"])]
    #[case(vec!["pear", "Apple", "apple", "Pear", "apple"], vec!["Apple", "Pear", "apple", "apple", "pear"])]
    #[case(vec!["c", "b", "a", "c", "b", "a"], vec!["a", "a", "b", "b", "c", "c"])]
    fn test_heap_sort(#[case] mut items: Vec<&str>, #[case] expected: Vec<&str>) {
        heap_sort(&mut items);
        assert_eq!(items, expected);
    }

    #[rstest]
    #[case(1)]
    #[case(63)]
    #[case(64)]
    #[case(1000)]
    fn test_heap_sort_shuffled(#[case] len: u32) {
        let expected = Vec::from_iter(0..len);

        let mut items = expected.clone();
        items.shuffle(&mut rand::thread_rng());
        heap_sort(&mut items);

        assert_eq!(items, expected);
    }

    #[test]
    fn test_heap_sort_by_reversed() {
        let mut items = vec![3, 1, 4, 1, 5, 9, 2, 6];
        heap_sort_by(&mut items, |a, b| a.cmp(b).reverse());
        assert_eq!(items, vec![9, 6, 5, 4, 3, 2, 1, 1]);
    }

    #[test]
    fn test_heap_sort_code_point_order() {
        let mut items = vec!["é".to_string(), "z".to_string(), "Z".to_string(), "ä".to_string(), "".to_string()];
        heap_sort(&mut items);
        assert_eq!(items, vec!["", "Z", "z", "ä", "é"]);
    }
}
