use core::cmp::Ordering;
use std::{
    collections::hash_map::DefaultHasher,
    panic::{catch_unwind, AssertUnwindSafe},
};

use crate::{
    alloc::{composable::Propagating, primitives::TrackingAllocator},
    collections::DoubleOrMinReserveStrategy,
    dynarr,
};

use super::*;

use tracked::{Event, Tracked};

type TrackedArr<T> = DynArr<T, TrackingAllocator>;
type PropagatingArr<T> = DynArr<T, Propagating<TrackingAllocator>>;

fn events_of<F: FnOnce()>(f: F) -> Vec<Event> {
    tracked::reset();
    f();
    tracked::take_events()
}

fn hash_of<T: Hash + ?Sized>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

fn tracked_arr(values: &[i32], capacity: usize) -> DynArr<Tracked> {
    let mut arr = DynArr::with_capacity(capacity);
    for &value in values {
        arr.push(Tracked::new(value));
    }
    arr
}

#[test]
fn dynarr_new() {
    let arr = DynArr::<i32>::new();
    assert_eq!(arr.capacity(), 0);
    assert_eq!(arr.len(), 0);
    assert!(arr.is_empty());

    let arr = DynArr::<i32>::with_capacity(21);
    assert_eq!(arr.capacity(), 21);
    assert_eq!(arr.len(), 0);

    let arr = DynArr::<()>::new();
    assert_eq!(arr.capacity(), usize::MAX);
}

#[test]
fn dynarr_reserve() {
    let mut arr = DynArr::<i32>::new();
    arr.reserve(21);
    assert!(arr.capacity() >= 21);

    let mut arr = DynArr::<i32>::new();
    arr.reserve_exact(21);
    assert_eq!(arr.capacity(), 21);

    let mut arr = DynArr::<i32>::new();
    assert!(matches!(arr.try_reserve(21), Ok(())));
    assert!(arr.capacity() >= 21);

    let mut arr = DynArr::<i32>::with_capacity(10);
    arr.extend([1, 2]);
    arr.reserve(9);
    assert_eq!(arr.capacity(), 11);
    arr.reserve_exact(20);
    assert_eq!(arr.capacity(), 22);
    arr.reserve(5);
    assert_eq!(arr.capacity(), 22);
    assert_eq!(arr, [1, 2]);
}

#[test]
fn dynarr_reserve_oversize() {
    let alloc = TrackingAllocator::with_limit(64);
    let mut arr = TrackedArr::<u64>::new_in(alloc.clone());
    assert_eq!(arr.max_len(), 8);

    assert_eq!(arr.try_reserve(9), Err(TryReserveError::CapacityOverflow));
    assert_eq!(arr.try_reserve_exact(usize::MAX), Err(TryReserveError::CapacityOverflow));
    assert_eq!(arr.try_resize(usize::MAX, 0), Err(TryReserveError::CapacityOverflow));
    assert_eq!(alloc.stats().failed_allocs, 0);
    assert_eq!(arr.capacity(), 0);

    let res = catch_unwind(AssertUnwindSafe(|| arr.reserve(100)));
    assert!(res.is_err());
    assert_eq!(arr.capacity(), 0);
}

#[test]
fn dynarr_growth_follows_len() {
    let mut arr = DynArr::<i32>::new();
    let mut caps = Vec::new();
    for i in 0..9 {
        arr.push(i);
        caps.push(arr.capacity());
    }
    assert_eq!(caps, [1, 2, 4, 4, 8, 8, 8, 8, 16]);

    // Only the number of elements is doubled, not the reserved capacity
    let mut arr = DynArr::<i32>::with_capacity(10);
    arr.extend([1, 2]);
    arr.reserve(9);
    assert_eq!(arr.capacity(), 11);

    let mut arr = DynArr::<i32, Mallocator, DoubleOrMinReserveStrategy>::new_in(Mallocator);
    arr.reserve_exact(10);
    arr.extend([1, 2]);
    arr.reserve(9);
    assert_eq!(arr.capacity(), 20);
}

#[test]
fn dynarr_push_and_pop() {
    let mut arr = DynArr::<i32>::new();

    arr.push(42);
    assert!(arr.capacity() >= 1);
    assert_eq!(arr.len(), 1);
    assert_eq!(arr[0], 42);

    arr.push(84);
    assert_eq!(arr.len(), 2);
    assert_eq!(arr[1], 84);

    let cap = arr.capacity();
    arr.push(3);
    assert_eq!(arr.pop(), Some(3));
    assert_eq!(arr, [42, 84]);
    assert!(arr.capacity() >= cap);

    assert_eq!(arr.pop(), Some(84));
    assert_eq!(arr.pop(), Some(42));
    assert_eq!(arr.pop(), None);
}

#[test]
fn dynarr_push_insert_erase_resize_shrink() {
    let mut arr = DynArr::<i32>::new();
    for i in 1..=4 {
        arr.push(i);
    }
    assert_eq!(arr.len(), 4);
    assert!(arr.capacity() >= 4);
    assert_eq!(arr, [1, 2, 3, 4]);

    arr.insert(1, 9);
    assert_eq!(arr, [1, 9, 2, 3, 4]);

    arr.erase_at(0);
    assert_eq!(arr, [9, 2, 3, 4]);

    let cap = arr.capacity();
    arr.resize_default(2);
    assert_eq!(arr, [9, 2]);
    assert_eq!(arr.len(), 2);
    assert_eq!(arr.capacity(), cap);

    arr.shrink_to_fit();
    assert_eq!(arr.capacity(), 2);
    assert_eq!(arr, [9, 2]);
}

#[test]
fn dynarr_assign_n_assigns_then_constructs() {
    let mut arr = dynarr![7; 3];
    assert_eq!(arr, [7, 7, 7]);
    arr.assign_n(5, 2);
    assert_eq!(arr, [2, 2, 2, 2, 2]);

    tracked::reset();
    let mut arr = from_elem(Tracked::new(7), 3);
    assert_eq!(tracked::take_events(), [
        Event::Create(0),
        Event::Clone { from: 0, to: 1 },
        Event::Clone { from: 0, to: 2 },
    ]);

    arr.assign_n(5, Tracked::new(2));
    assert_eq!(tracked::values(&arr), [2; 5]);
    assert_eq!(tracked::take_events(), [
        Event::Create(3),
        Event::CloneFrom { from: 3, to: 1 },
        Event::CloneFrom { from: 3, to: 2 },
        Event::CloneFrom { from: 3, to: 0 },
        Event::Clone { from: 3, to: 4 },
    ]);

    arr.assign_n(1, Tracked::new(5));
    assert_eq!(tracked::values(&arr), [5]);
    assert_eq!(tracked::take_events(), [
        Event::Create(5),
        Event::CloneFrom { from: 5, to: 1 },
        Event::Drop(2),
        Event::Drop(0),
        Event::Drop(4),
        Event::Drop(3),
        Event::Drop(5),
    ]);

    assert_eq!(arr.try_assign_n(usize::MAX, Tracked::new(0)), Err(TryReserveError::CapacityOverflow));
    assert_eq!(tracked::values(&arr), [5]);
    drop(arr);
    assert_eq!(tracked::live(), 0);
}

#[test]
fn dynarr_push_with_failing_alloc_keeps_state() {
    let alloc = TrackingAllocator::new();
    let mut arr = TrackedArr::<i32>::with_capacity_in(4, alloc.clone());
    arr.extend([1, 2, 3, 4]);
    let ptr = arr.as_ptr();

    alloc.fail_next();
    assert!(matches!(arr.try_push(5), Err(TryReserveError::AllocError(_))));
    assert_eq!(arr, [1, 2, 3, 4]);
    assert_eq!(arr.len(), 4);
    assert_eq!(arr.capacity(), 4);
    assert_eq!(arr.as_ptr(), ptr);

    let res = catch_unwind(AssertUnwindSafe(|| arr.push(5)));
    assert!(res.is_err());
    assert_eq!(arr, [1, 2, 3, 4]);
    assert_eq!(arr.capacity(), 4);
    assert_eq!(alloc.stats().failed_allocs, 2);

    alloc.reset_failures();
    arr.push(5);
    assert_eq!(arr, [1, 2, 3, 4, 5]);
}

#[test]
fn dynarr_insert_with_failing_alloc_keeps_state() {
    let alloc = TrackingAllocator::new();
    let mut arr = TrackedArr::<i32>::with_capacity_in(4, alloc.clone());
    arr.extend([1, 2, 3, 4]);
    let ptr = arr.as_ptr();

    alloc.fail_next();
    assert!(matches!(arr.try_insert(1, 9), Err(TryReserveError::AllocError(_))));
    assert!(matches!(arr.try_insert_n(0, 3, 9), Err(TryReserveError::AllocError(_))));
    assert!(matches!(arr.try_insert_from_slice(4, &[7, 8]), Err(TryReserveError::AllocError(_))));
    assert!(arr.try_insert_iter(2, [5, 6]).is_err());
    assert!(arr.try_emplace(2, |prefix| prefix[0] + 10).is_err());
    let res = catch_unwind(AssertUnwindSafe(|| arr.insert(0, 0)));
    assert!(res.is_err());

    assert_eq!(arr, [1, 2, 3, 4]);
    assert_eq!(arr.len(), 4);
    assert_eq!(arr.capacity(), 4);
    assert_eq!(arr.as_ptr(), ptr);

    alloc.reset_failures();
    arr.insert(1, 9);
    assert_eq!(arr, [1, 9, 2, 3, 4]);
    drop(arr);
    assert_eq!(alloc.stats().live_allocs(), 0);
}

#[test]
fn dynarr_len_never_exceeds_capacity() {
    let check = |arr: &DynArr<i32>| assert!(arr.len() <= arr.capacity(), "len {} > capacity {}", arr.len(), arr.capacity());

    let mut arr = DynArr::<i32>::new();
    check(&arr);
    for i in 0..64 {
        match i % 8 {
            0 => arr.push(i),
            1 => arr.insert(arr.len() / 2, i),
            2 => arr.insert_n(0, 3, i),
            3 => { arr.erase_at(0); },
            4 => arr.resize(arr.len() + 5, i),
            5 => arr.shrink_to_fit(),
            6 => { arr.erase_range(..2); },
            _ => { arr.pop(); },
        }
        check(&arr);
    }

    arr.assign_n(3, 1);
    check(&arr);
    arr.reserve(10);
    assert!(arr.capacity() >= 13);
    arr.clear();
    check(&arr);
    arr.clear_and_release();
    check(&arr);
    arr.assign_from_slice(&[1, 2, 3, 4, 5]);
    check(&arr);
    arr.truncate(1);
    check(&arr);
}

#[test]
fn dynarr_insert_in_place_and_realloc() {
    let alloc = TrackingAllocator::new();
    let mut arr = TrackedArr::<i32>::with_capacity_in(8, alloc.clone());
    arr.extend([1, 2, 3, 4]);

    arr.insert_from_slice(2, &[10, 11]);
    assert_eq!(arr, [1, 2, 10, 11, 3, 4]);
    assert_eq!(arr.capacity(), 8);
    assert_eq!(alloc.stats().num_allocs, 1);

    arr.insert_n(0, 3, 0);
    assert_eq!(arr, [0, 0, 0, 1, 2, 10, 11, 3, 4]);
    assert_eq!(arr.capacity(), 12);
    assert_eq!(alloc.stats().num_allocs, 2);
    assert_eq!(alloc.stats().live_allocs(), 1);

    arr.insert(9, 5);
    assert_eq!(arr, [0, 0, 0, 1, 2, 10, 11, 3, 4, 5]);

    arr.insert_iter(1, [7, 8]);
    assert_eq!(arr, [0, 7, 8, 0, 0, 1, 2, 10, 11, 3, 4, 5]);

    arr.insert_n(4, 0, 99);
    arr.insert_from_slice(4, &[]);
    assert_eq!(arr.len(), 12);

    drop(arr);
    assert_eq!(alloc.stats().live_allocs(), 0);
    assert_eq!(alloc.stats().live_bytes, 0);
}

#[test]
fn dynarr_insert_keeps_surrounding_elements() {
    for cap in [4, 16] {
        for pos in 0..=4 {
            let mut arr = DynArr::<i32>::with_capacity(cap);
            arr.extend([0, 1, 2, 3]);
            arr.insert_from_slice(pos, &[100, 101, 102]);

            let mut expected = vec![0, 1, 2, 3];
            expected.splice(pos..pos, [100, 101, 102]);
            assert_eq!(arr, expected.as_slice());
        }
    }
}

#[test]
#[should_panic(expected = "insertion index (is 3) should be <= len (is 2)")]
fn dynarr_insert_past_len_panics() {
    let mut arr = dynarr![1, 2];
    arr.insert(3, 3);
}

#[test]
fn dynarr_insert_from_within() {
    tracked::reset();
    let mut arr = tracked_arr(&[0, 1, 2, 3], 8);
    tracked::take_events();

    // In front of the source: a temporary clone is made first
    arr.insert_n_from_within(1, 2, 3);
    assert_eq!(tracked::values(&arr), [0, 3, 3, 1, 2, 3]);
    assert_eq!(tracked::take_events(), [
        Event::Clone { from: 3, to: 4 },
        Event::Clone { from: 4, to: 5 },
    ]);

    // At the end, nothing moves
    arr.insert_n_from_within(6, 2, 0);
    assert_eq!(tracked::values(&arr), [0, 3, 3, 1, 2, 3, 0, 0]);
    assert_eq!(tracked::take_events(), [
        Event::Clone { from: 0, to: 6 },
        Event::Clone { from: 0, to: 7 },
    ]);

    // Reallocating, the old block is still intact
    assert_eq!(arr.len(), arr.capacity());
    arr.insert_from_within(0, 7);
    assert_eq!(tracked::values(&arr), [0, 0, 3, 3, 1, 2, 3, 0, 0]);
    assert_eq!(tracked::take_events(), [Event::Clone { from: 7, to: 8 }]);

    drop(arr);
    assert_eq!(tracked::live(), 0);
}

#[test]
fn dynarr_emplace() {
    let mut arr = DynArr::<i32>::with_capacity(4);
    arr.extend([1, 2, 3]);

    assert_eq!(*arr.emplace(1, |elems| elems.iter().sum()), 6);
    assert_eq!(arr, [1, 6, 2, 3]);
    assert_eq!(arr.capacity(), 4);

    *arr.emplace(0, |elems| elems[3] * 2) += 1;
    assert_eq!(arr, [7, 1, 6, 2, 3]);

    arr.emplace_back(|elems| elems.len() as i32);
    assert_eq!(arr, [7, 1, 6, 2, 3, 5]);
}

#[test]
fn dynarr_erase() {
    let mut arr = dynarr![1, 2, 3, 4, 5, 6];
    assert_eq!(arr.erase_range(1..3), 1);
    assert_eq!(arr, [1, 4, 5, 6]);

    assert_eq!(arr.erase_range(2..2), 2);
    assert_eq!(arr, [1, 4, 5, 6]);

    assert_eq!(arr.erase_range(2..100), 2);
    assert_eq!(arr, [1, 4]);

    assert_eq!(arr.erase_range(2..), 2);
    assert_eq!(arr.erase_at(0), 0);
    assert_eq!(arr, [4]);
    assert_eq!(arr.remove(0), 4);
    assert!(arr.is_empty());

    tracked::reset();
    let mut arr = tracked_arr(&[0, 1, 2, 3, 4], 5);
    tracked::take_events();
    arr.erase_range(1..=2);
    assert_eq!(tracked::values(&arr), [0, 3, 4]);
    assert_eq!(tracked::take_events(), [Event::Drop(1), Event::Drop(2)]);
}

#[test]
#[should_panic(expected = "range start (is 5) should be <= len (is 3)")]
fn dynarr_erase_past_len_panics() {
    let mut arr = dynarr![1, 2, 3];
    arr.erase_range(5..6);
}

#[test]
#[should_panic(expected = "index (is 2) should be < len (is 2)")]
fn dynarr_remove_out_of_bounds_panics() {
    let mut arr = dynarr![1, 2];
    arr.remove(2);
}

#[test]
fn dynarr_retain_and_erase_if() {
    let mut arr = dynarr![1, 2, 3, 4, 5, 6];
    assert_eq!(erase_if(&mut arr, |x| x % 3 == 0), 2);
    assert_eq!(arr, [1, 2, 4, 5]);

    assert_eq!(erase(&mut arr, &4), 1);
    assert_eq!(erase(&mut arr, &7), 0);
    assert_eq!(arr, [1, 2, 5]);

    arr.retain_mut(|x| {
        *x *= 2;
        *x > 2
    });
    assert_eq!(arr, [4, 10]);

    arr.retain(|_| false);
    assert!(arr.is_empty());
}

#[test]
fn dynarr_resize() {
    let mut arr = dynarr![1, 2, 3];
    arr.resize(5, 0);
    assert_eq!(arr, [1, 2, 3, 0, 0]);
    arr.resize(1, 9);
    assert_eq!(arr, [1]);

    let mut n = 0;
    arr.resize_with(4, || {
        n += 1;
        n
    });
    assert_eq!(arr, [1, 1, 2, 3]);

    arr.truncate(2);
    assert_eq!(arr, [1, 1]);
    arr.truncate(10);
    assert_eq!(arr, [1, 1]);

    let mut arr = DynArr::<String>::new();
    arr.resize_default(2);
    assert_eq!(arr, ["", ""]);
}

#[test]
fn dynarr_shrink_and_release() {
    let alloc = TrackingAllocator::new();
    let mut arr = TrackedArr::<i32>::with_capacity_in(10, alloc.clone());
    arr.extend([1, 2, 3]);

    arr.shrink_to(5);
    assert_eq!(arr.capacity(), 5);
    arr.shrink_to(1);
    assert_eq!(arr.capacity(), 3);
    arr.shrink_to_fit();
    assert_eq!(arr.capacity(), 3);
    assert_eq!(arr, [1, 2, 3]);

    arr.clear();
    assert_eq!(arr.capacity(), 3);
    arr.shrink_to_fit();
    assert_eq!(arr.capacity(), 0);
    assert_eq!(alloc.stats().live_allocs(), 0);

    arr.push(1);
    arr.clear_and_release();
    assert!(arr.is_empty());
    assert_eq!(arr.capacity(), 0);
    assert_eq!(alloc.stats().live_allocs(), 0);
}

#[test]
fn dynarr_access() {
    let mut arr = dynarr![1, 2, 3];
    assert_eq!(arr.at(0), Ok(&1));
    assert_eq!(arr.at(3), Err(OutOfBoundsError { index: 3, len: 3 }));
    assert!(arr.at_mut(3).is_err());

    *arr.at_mut(1).unwrap() = 5;
    assert_eq!(arr.front(), Some(&1));
    assert_eq!(arr.back(), Some(&3));

    *arr.front_mut().unwrap() = 0;
    *arr.back_mut().unwrap() = 7;
    assert_eq!(arr, [0, 5, 7]);
    assert_eq!(arr.as_slice(), &[0, 5, 7]);
    assert_eq!(unsafe { *arr.as_slice().get_unchecked(2) }, 7);

    let empty = DynArr::<i32>::new();
    assert_eq!(empty.front(), None);
    assert_eq!(empty.back(), None);
}

#[test]
fn dynarr_iter() {
    let arr = dynarr![1, 2, 3];
    assert_eq!(arr.iter().rev().copied().collect::<Vec<_>>(), [3, 2, 1]);

    let mut sum = 0;
    for x in &arr {
        sum += x;
    }
    assert_eq!(sum, 6);

    let mut arr = arr;
    for x in &mut arr {
        *x *= 2;
    }
    assert_eq!(arr, [2, 4, 6]);

    let mut iter = dynarr![1, 2, 3, 4].into_iter();
    assert_eq!(iter.next(), Some(1));
    assert_eq!(iter.next_back(), Some(4));
    assert_eq!(iter.as_slice(), &[2, 3]);
    assert_eq!(iter.len(), 2);
    assert_eq!(iter.collect::<Vec<_>>(), [2, 3]);

    tracked::reset();
    let mut iter = tracked_arr(&[0, 1, 2], 3).into_iter();
    assert_eq!(iter.next().map(|elem| elem.value), Some(0));
    drop(iter);
    assert_eq!(tracked::live(), 0);
}

#[test]
fn dynarr_construct() {
    let arr: DynArr<i32> = (0..5).collect();
    assert_eq!(arr, [0, 1, 2, 3, 4]);

    let mut arr = DynArr::<i32>::new();
    arr.extend(&[1, 2]);
    arr.extend(vec![3]);
    assert_eq!(arr, [1, 2, 3]);

    let alloc = TrackingAllocator::new();
    let arr: TrackedArr<i32> = DynArr::from_iter_in(0..3, alloc.clone());
    assert_eq!(arr, [0, 1, 2]);
    assert!(arr.allocator().is_equal(&alloc));

    let arr: DynArr<i32> = DynArr::from(&[1, 2][..]);
    assert_eq!(arr, [1, 2]);

    let arr: DynArr<i32> = DynArr::with_len_in(3, Mallocator);
    assert_eq!(arr, [0, 0, 0]);

    let arr: TrackedArr<i32> = from_elem_in(5, 2, alloc.clone());
    assert_eq!(arr, [5, 5]);

    let arr: DynArr<i32> = DynArr::default();
    assert!(arr.is_empty());

    let empty: DynArr<i32> = dynarr![];
    assert_eq!(empty.capacity(), 0);
}

#[test]
fn dynarr_assign() {
    let mut arr = dynarr![1, 2, 3];
    arr.assign_from_slice(&[4, 5]);
    assert_eq!(arr, [4, 5]);
    assert_eq!(arr.capacity(), 3);

    arr.assign_from_slice(&[1, 2, 3, 4, 5]);
    assert_eq!(arr, [1, 2, 3, 4, 5]);

    arr.assign_iter([9]);
    assert_eq!(arr, [9]);

    arr.assign_iter(0..4);
    assert_eq!(arr, [0, 1, 2, 3]);
}

#[test]
fn dynarr_assign_drops_surplus_last() {
    tracked::reset();
    let src = [Tracked::new(1), Tracked::new(2)];
    let mut dst = tracked_arr(&[10, 20, 30, 40], 4);
    tracked::take_events();

    dst.assign_from_slice(&src);
    assert_eq!(tracked::values(&dst), [1, 2]);
    assert_eq!(tracked::take_events(), [
        Event::CloneFrom { from: 0, to: 2 },
        Event::CloneFrom { from: 1, to: 3 },
        Event::Drop(4),
        Event::Drop(5),
    ]);

    let other = tracked_arr(&[7], 1);
    tracked::take_events();
    dst.clone_from(&other);
    assert_eq!(tracked::values(&dst), [7]);
    assert_eq!(tracked::take_events(), [
        Event::CloneFrom { from: 6, to: 2 },
        Event::Drop(3),
    ]);
    assert_eq!(dst.capacity(), 4);

    drop(dst);
    drop(other);
    drop(src);
    assert_eq!(tracked::live(), 0);
}

#[test]
fn dynarr_assign_from_slice_failure_is_strong() {
    tracked::reset();
    let src = [Tracked::new(5), Tracked::new(6), Tracked::new(7)];
    let mut arr = tracked_arr(&[1, 2], 2);

    tracked::fail_clone_after(1);
    defer! { tracked::clear_clone_failure(); }

    let res = catch_unwind(AssertUnwindSafe(|| arr.assign_from_slice(&src)));
    assert!(res.is_err());
    assert_eq!(tracked::values(&arr), [1, 2]);
    assert_eq!(arr.capacity(), 2);
    assert_eq!(tracked::live(), 5);

    tracked::clear_clone_failure();
    arr.assign_from_slice(&src);
    assert_eq!(tracked::values(&arr), [5, 6, 7]);
    drop(arr);
    drop(src);
    assert_eq!(tracked::live(), 0);
}

#[test]
fn dynarr_failing_clone_insert_is_strong() {
    tracked::reset();
    let src = [Tracked::new(10), Tracked::new(11), Tracked::new(12)];
    defer! { tracked::clear_clone_failure(); }

    // in place
    let mut arr = tracked_arr(&[0, 1, 2, 3], 8);
    tracked::fail_clone_after(1);
    let res = catch_unwind(AssertUnwindSafe(|| arr.insert_from_slice(1, &src)));
    assert!(res.is_err());
    assert_eq!(tracked::values(&arr), [0, 1, 2, 3]);
    assert_eq!(arr.capacity(), 8);
    assert_eq!(tracked::live(), 7);

    // reallocating
    let mut full = tracked_arr(&[0, 1], 2);
    let ptr = full.as_ptr();
    tracked::fail_clone_after(2);
    let res = catch_unwind(AssertUnwindSafe(|| full.insert_from_slice(1, &src)));
    assert!(res.is_err());
    assert_eq!(tracked::values(&full), [0, 1]);
    assert_eq!(full.capacity(), 2);
    assert_eq!(full.as_ptr(), ptr);
    assert_eq!(tracked::live(), 9);

    // cloning from within
    tracked::fail_clone_after(1);
    let res = catch_unwind(AssertUnwindSafe(|| arr.insert_n_from_within(4, 3, 0)));
    assert!(res.is_err());
    assert_eq!(tracked::values(&arr), [0, 1, 2, 3]);

    tracked::clear_clone_failure();
    full.insert_from_slice(1, &src);
    assert_eq!(tracked::values(&full), [0, 10, 11, 12, 1]);

    drop(arr);
    drop(full);
    drop(src);
    assert_eq!(tracked::live(), 0);
}

#[test]
fn dynarr_failing_clone_resize_keeps_prefix() {
    tracked::reset();
    let mut arr = tracked_arr(&[0, 1], 8);
    defer! { tracked::clear_clone_failure(); }

    tracked::fail_clone_after(1);
    let res = catch_unwind(AssertUnwindSafe(|| arr.resize(5, Tracked::new(9))));
    assert!(res.is_err());
    assert_eq!(tracked::values(&arr), [0, 1, 9]);
    assert_eq!(tracked::live(), 3);

    drop(arr);
    assert_eq!(tracked::live(), 0);
}

#[test]
fn dynarr_events_match_vec() {
    // clone
    let arr_events = events_of(|| {
        let src = dynarr![Tracked::new(1), Tracked::new(2), Tracked::new(3)];
        let copy = src.clone();
        drop(copy);
        drop(src);
    });
    let vec_events = events_of(|| {
        let src = vec![Tracked::new(1), Tracked::new(2), Tracked::new(3)];
        let copy = src.clone();
        drop(copy);
        drop(src);
    });
    assert_eq!(arr_events, vec_events);

    // clone_from into a shorter array with enough capacity
    let arr_events = events_of(|| {
        let src = dynarr![Tracked::new(1), Tracked::new(2), Tracked::new(3)];
        let mut dst = DynArr::with_capacity(4);
        dst.push(Tracked::new(10));
        dst.clone_from(&src);
    });
    let vec_events = events_of(|| {
        let src = vec![Tracked::new(1), Tracked::new(2), Tracked::new(3)];
        let mut dst = Vec::with_capacity(4);
        dst.push(Tracked::new(10));
        dst.clone_from(&src);
    });
    assert_eq!(arr_events, vec_events);

    // truncate, resize and extend
    let arr_events = events_of(|| {
        let mut arr = dynarr![Tracked::new(1), Tracked::new(2), Tracked::new(3)];
        arr.truncate(1);
        arr.resize(4, Tracked::new(9));
        arr.resize(2, Tracked::new(0));
        let more = dynarr![Tracked::new(5), Tracked::new(6)];
        arr.extend(more.iter().cloned());
        arr.extend(more);
    });
    let vec_events = events_of(|| {
        let mut arr = vec![Tracked::new(1), Tracked::new(2), Tracked::new(3)];
        arr.truncate(1);
        arr.resize(4, Tracked::new(9));
        arr.resize(2, Tracked::new(0));
        let more = vec![Tracked::new(5), Tracked::new(6)];
        arr.extend(more.iter().cloned());
        arr.extend(more);
    });
    assert_eq!(arr_events, vec_events);
    assert_eq!(tracked::live(), 0);
}

#[test]
fn dynarr_clone_isolation() {
    let a = dynarr![1, 2, 3];
    let mut b = a.clone();
    b.push(4);
    b[0] = 10;
    assert_eq!(a, [1, 2, 3]);
    assert_eq!(b, [10, 2, 3, 4]);

    let alloc = TrackingAllocator::new();
    let a: TrackedArr<i32> = from_elem_in(1, 3, alloc.clone());
    let b = a.clone();
    assert!(b.allocator().is_equal(&alloc));
    assert_eq!(alloc.stats().live_allocs(), 2);

    let other = TrackingAllocator::new();
    let c = a.clone_in(other.clone());
    assert_eq!(c, a);
    assert!(!c.allocator().is_equal(&alloc));
    assert_eq!(other.stats().live_allocs(), 1);
}

#[test]
fn dynarr_clone_from_allocator() {
    let a1 = TrackingAllocator::new();
    let a2 = TrackingAllocator::new();

    // The destination keeps its allocator
    let mut dst = TrackedArr::<i32>::from_iter_in([1, 2, 3, 4], a1.clone());
    let src = TrackedArr::<i32>::from_iter_in([5, 6], a2.clone());
    dst.clone_from(&src);
    assert_eq!(dst, [5, 6]);
    assert!(dst.allocator().is_equal(&a1));

    // The source's allocator is adopted
    let mut dst = PropagatingArr::<i32>::from_iter_in([1, 2, 3, 4], Propagating::new(a1.clone()));
    let src = PropagatingArr::<i32>::from_iter_in([5, 6], Propagating::new(a2.clone()));
    dst.clone_from(&src);
    assert_eq!(dst, [5, 6]);
    assert!(dst.allocator().is_equal(src.allocator()));
    assert_eq!(a2.stats().live_allocs(), 3);
}

#[test]
fn dynarr_take_and_move_in() {
    let mut a = dynarr![1, 2];
    let b = a.take();
    assert!(a.is_empty());
    assert_eq!(a.capacity(), 0);
    assert_eq!(b, [1, 2]);
    a.push(3);
    assert_eq!(a, [3]);

    let a1 = TrackingAllocator::new();
    let a2 = TrackingAllocator::new();

    // Equal allocators, the block changes hands
    let mut src = TrackedArr::<i32>::with_capacity_in(4, a1.clone());
    src.extend([1, 2, 3]);
    let ptr = src.as_ptr();
    let moved = DynArr::move_in(&mut src, a1.clone()).unwrap();
    assert_eq!(moved, [1, 2, 3]);
    assert_eq!(moved.as_ptr(), ptr);
    assert!(src.is_empty());
    assert_eq!(src.capacity(), 0);

    // Different allocators, elements are moved one by one
    let mut src = TrackedArr::<i32>::with_capacity_in(4, a1.clone());
    src.extend([1, 2, 3]);
    let moved = DynArr::move_in(&mut src, a2.clone()).unwrap();
    assert_eq!(moved, [1, 2, 3]);
    assert_eq!(moved.capacity(), 3);
    assert!(moved.allocator().is_equal(&a2));
    assert!(src.is_empty());
    assert_eq!(src.capacity(), 4);
    src.push(7);
    assert_eq!(src, [7]);

    // A failed allocation leaves the source alone
    a2.fail_next();
    assert!(DynArr::move_in(&mut src, a2.clone()).is_err());
    assert_eq!(src, [7]);
    a2.reset_failures();
}

#[test]
fn dynarr_move_assign() {
    // Mallocator propagates on move assignment
    let mut dst = dynarr![1];
    let mut src = dynarr![2, 3];
    dst.move_assign(&mut src);
    assert_eq!(dst, [2, 3]);
    assert!(src.is_empty());
    assert_eq!(src.capacity(), 0);

    let a1 = TrackingAllocator::new();
    let a2 = TrackingAllocator::new();

    // Equal allocators
    let mut dst = TrackedArr::<i32>::from_iter_in([9], a1.clone());
    let mut src = TrackedArr::<i32>::from_iter_in([1, 2, 3], a1.clone());
    let ptr = src.as_ptr();
    dst.move_assign(&mut src);
    assert_eq!(dst, [1, 2, 3]);
    assert_eq!(dst.as_ptr(), ptr);
    assert_eq!(src.capacity(), 0);
    assert_eq!(a1.stats().live_allocs(), 1);

    // Unequal allocators, elements are moved over
    let mut dst = TrackedArr::<i32>::from_iter_in([9], a1.clone());
    let mut src = TrackedArr::<i32>::with_capacity_in(3, a2.clone());
    src.extend([1, 2, 3]);
    dst.move_assign(&mut src);
    assert_eq!(dst, [1, 2, 3]);
    assert!(dst.allocator().is_equal(&a1));
    assert!(src.is_empty());
    assert_eq!(src.capacity(), 3);

    // Propagating allocators travel along
    let p1 = TrackingAllocator::new();
    let p2 = TrackingAllocator::new();
    let mut dst = PropagatingArr::<i32>::from_iter_in([9], Propagating::new(p1.clone()));
    let mut src = PropagatingArr::<i32>::from_iter_in([1, 2], Propagating::new(p2.clone()));
    dst.move_assign(&mut src);
    assert_eq!(dst, [1, 2]);
    assert!(dst.allocator().inner().is_equal(&p2));
    assert_eq!(src.capacity(), 0);
    assert_eq!(p1.stats().live_allocs(), 0);
}

#[test]
fn dynarr_move_assign_with_failing_alloc_keeps_state() {
    let a1 = TrackingAllocator::new();
    let a2 = TrackingAllocator::new();
    let mut dst = TrackedArr::<i32>::from_iter_in([9, 8], a1.clone());
    let mut src = TrackedArr::<i32>::from_iter_in([1, 2, 3, 4, 5], a2.clone());
    let dst_ptr = dst.as_ptr();
    let src_ptr = src.as_ptr();

    a1.fail_next();
    assert!(matches!(dst.try_move_assign(&mut src), Err(TryReserveError::AllocError(_))));
    let res = catch_unwind(AssertUnwindSafe(|| dst.move_assign(&mut src)));
    assert!(res.is_err());
    assert_eq!(dst, [9, 8]);
    assert_eq!(dst.as_ptr(), dst_ptr);
    assert_eq!(src, [1, 2, 3, 4, 5]);
    assert_eq!(src.as_ptr(), src_ptr);

    a1.reset_failures();
    dst.move_assign(&mut src);
    assert_eq!(dst, [1, 2, 3, 4, 5]);
    assert!(dst.allocator().is_equal(&a1));
    assert!(src.is_empty());

    drop(dst);
    drop(src);
    assert_eq!(a1.stats().live_allocs(), 0);
    assert_eq!(a2.stats().live_allocs(), 0);
}

#[test]
fn dynarr_move_in_with_colliding_alloc_ids() {
    let a = TrackingAllocator::new();
    let b = loop {
        let b = TrackingAllocator::new();
        if b.alloc_id() == a.alloc_id() {
            break b;
        }
    };

    let mut src = TrackedArr::<i32>::from_iter_in([1, 2, 3], a.clone());
    let ptr = src.as_ptr();
    let moved = DynArr::move_in(&mut src, b.clone()).unwrap();
    assert_eq!(moved, [1, 2, 3]);
    assert_ne!(moved.as_ptr(), ptr);
    assert_eq!(a.stats().live_allocs(), 1);
    assert_eq!(b.stats().live_allocs(), 1);

    drop(moved);
    drop(src);
    assert_eq!(a.stats().live_allocs(), 0);
    assert_eq!(b.stats().live_allocs(), 0);
}

#[test]
fn dynarr_swap() {
    let mut a = dynarr![1, 2, 3];
    let mut b = dynarr![4];
    swap(&mut a, &mut b);
    assert_eq!(a, [4]);
    assert_eq!(b, [1, 2, 3]);

    let alloc = TrackingAllocator::new();
    let mut a = TrackedArr::<i32>::from_iter_in([1], alloc.clone());
    let mut b = TrackedArr::<i32>::from_iter_in([2, 3], alloc.clone());
    a.swap_with(&mut b);
    assert_eq!(a, [2, 3]);
    assert_eq!(b, [1]);

    let p1 = TrackingAllocator::new();
    let p2 = TrackingAllocator::new();
    let mut a = PropagatingArr::<i32>::from_iter_in([1], Propagating::new(p1.clone()));
    let mut b = PropagatingArr::<i32>::from_iter_in([2, 3], Propagating::new(p2.clone()));
    a.swap_with(&mut b);
    assert_eq!(a, [2, 3]);
    assert!(a.allocator().inner().is_equal(&p2));
    assert!(b.allocator().inner().is_equal(&p1));
}

#[test]
#[should_panic(expected = "cannot swap dynamic arrays with unequal allocators")]
fn dynarr_swap_unequal_allocators_panics() {
    let mut a = TrackedArr::<i32>::from_iter_in([1], TrackingAllocator::new());
    let mut b = TrackedArr::<i32>::from_iter_in([2], TrackingAllocator::new());
    a.swap_with(&mut b);
}

#[test]
fn dynarr_compare_and_hash() {
    let a = dynarr![1, 2, 3];
    let b = dynarr![1, 2, 4];
    assert!(a < b);
    assert_eq!(a.cmp(&b), Ordering::Less);
    assert_eq!(a, a.clone());
    assert_ne!(a, b);
    assert_eq!(&[1, 2, 3][..], a);

    assert_eq!(hash_of(&a), hash_of(&[1, 2, 3][..]));

    assert_eq!(format!("{:?}", a), "[1, 2, 3]");
}

#[test]
fn dynarr_zst() {
    let alloc = TrackingAllocator::new();
    let mut arr = TrackedArr::<()>::new_in(alloc.clone());
    for _ in 0..10 {
        arr.push(());
    }
    arr.insert(3, ());
    assert_eq!(arr.len(), 11);
    assert_eq!(arr.capacity(), usize::MAX);
    assert_eq!(arr.pop(), Some(()));
    arr.erase_range(..5);
    assert_eq!(arr.len(), 5);
    assert_eq!(alloc.stats().num_allocs, 0);
}

#[test]
fn dynarr_no_leaks() {
    tracked::reset();
    let alloc = TrackingAllocator::new();
    {
        let mut arr = TrackedArr::<Tracked>::new_in(alloc.clone());
        for i in 0..20 {
            arr.push(Tracked::new(i));
        }
        arr.insert_n(5, 3, Tracked::new(100));
        arr.erase_range(2..8);
        arr.insert_iter(0, (0..4).map(Tracked::new));
        arr.retain(|elem| elem.value % 2 == 0);
        arr.resize_with(30, Tracked::default);
        arr.truncate(10);
        let copy = arr.clone();
        arr.assign_from_slice(&copy);
        arr.shrink_to_fit();
        let _ = arr.pop();
    }
    assert_eq!(tracked::live(), 0);
    assert_eq!(alloc.stats().live_allocs(), 0);
    assert_eq!(alloc.stats().live_bytes, 0);
}
