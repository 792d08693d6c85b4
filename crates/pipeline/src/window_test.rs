//! Tests for CatchUpWindow

use super::*;

fn ranges(window: &CatchUpWindow) -> Vec<Range<usize>> {
    window.ranges().collect()
}

// ============================================================================
// compute
// ============================================================================

#[test]
fn test_no_new_data() {
    let window = CatchUpWindow::compute(5, 3, 3);
    assert!(window.is_empty());
    assert_eq!(window.len(), 0);
    assert!(ranges(&window).is_empty());
    assert_eq!(window.indices().count(), 0);
}

#[test]
fn test_forward_single_range() {
    let window = CatchUpWindow::compute(5, 1, 4);
    assert_eq!(ranges(&window), vec![1..4]);
    assert_eq!(window.len(), 3);
}

#[test]
fn test_wrapped_two_ranges() {
    let window = CatchUpWindow::compute(5, 3, 1);
    assert_eq!(ranges(&window), vec![3..5, 0..1]);
    assert_eq!(window.len(), 3);
    assert_eq!(window.indices().collect::<Vec<_>>(), vec![3, 4, 0]);
}

#[test]
fn test_wrapped_to_zero() {
    let window = CatchUpWindow::compute(5, 3, 0);
    assert_eq!(ranges(&window), vec![3..5]);
    assert_eq!(window.len(), 2);
}

#[test]
fn test_from_zero() {
    let window = CatchUpWindow::compute(8, 0, 8 - 1);
    assert_eq!(window.indices().collect::<Vec<_>>(), (0..7).collect::<Vec<_>>());
}

// ============================================================================
// full
// ============================================================================

#[test]
fn test_full_window_is_oldest_first() {
    let window = CatchUpWindow::full(4, 2);
    assert_eq!(window.indices().collect::<Vec<_>>(), vec![2, 3, 0, 1]);
    assert_eq!(window.len(), 4);
}

#[test]
fn test_full_window_at_zero() {
    let window = CatchUpWindow::full(3, 0);
    assert_eq!(ranges(&window), vec![0..3]);
}

#[test]
fn test_compute_len_matches_distance() {
    let capacity = 7;
    for last in 0..capacity {
        for current in 0..capacity {
            let window = CatchUpWindow::compute(capacity, last, current);
            let expected = (current + capacity - last) % capacity;
            assert_eq!(window.len(), expected, "last {last}, current {current}");
            assert_eq!(window.indices().count(), expected);
        }
    }
}
