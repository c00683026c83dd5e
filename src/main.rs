use almost_common::{
    alloc::primitives::TrackingAllocator,
    collections::{self, DynArr},
};
use almost_logging::{log_error, log_info, log_verbose, LogCategory, LogLevel, Logger, set_logger, get_logger};

pub const LOG_CAT : LogCategory = LogCategory::new("Main");
const STATS_CAT : LogCategory = LogCategory::new_with_sub("Main", "Alloc");

type TrackedArr<T> = DynArr<T, TrackingAllocator>;

fn log_stats(label: &str, alloc: &TrackingAllocator) {
    let stats = alloc.stats();
    log_verbose!(STATS_CAT, "{}: {} allocs, {} deallocs, {} failed, {} live bytes, {} peak bytes",
        label, stats.num_allocs, stats.num_deallocs, stats.failed_allocs, stats.live_bytes, stats.peak_bytes);
}

fn push_insert_erase_resize(alloc: &TrackingAllocator) {
    let mut arr = TrackedArr::<i32>::new_in(alloc.clone());
    for i in 1..=4 {
        arr.push(i);
    }
    log_info!(LOG_CAT, "push 1..=4: {:?} (len {}, capacity {})", arr, arr.len(), arr.capacity());

    arr.insert(1, 9);
    log_info!(LOG_CAT, "insert 9 at 1: {:?}", arr);

    arr.erase_at(0);
    log_info!(LOG_CAT, "erase at 0: {:?}", arr);

    arr.resize_default(2);
    log_info!(LOG_CAT, "resize to 2: {:?} (capacity {})", arr, arr.capacity());

    arr.shrink_to_fit();
    log_info!(LOG_CAT, "shrink to fit: capacity {}", arr.capacity());
}

fn assign(alloc: &TrackingAllocator) {
    let mut arr: TrackedArr<i32> = collections::from_elem_in(7, 3, alloc.clone());
    log_info!(LOG_CAT, "from elem: {:?}", arr);

    arr.assign_n(5, 2);
    log_info!(LOG_CAT, "assign 5 x 2: {:?}", arr);

    let removed = collections::erase_if(&mut arr, |&x| x == 2);
    log_info!(LOG_CAT, "erase all 2s: removed {}, {:?} left", removed, arr);
}

fn failing_push(alloc: &TrackingAllocator) {
    let mut arr = TrackedArr::<i32>::with_capacity_in(4, alloc.clone());
    arr.extend([1, 2, 3, 4]);

    alloc.fail_next();
    match arr.try_push(5) {
        Ok(()) => {
            log_error!(LOG_CAT, failing_push, "push succeeded while allocations were failing");
        },
        Err(err) => {
            log_info!(LOG_CAT, "push on a full array failed: {}, array is still {:?} (capacity {})", err, arr, arr.capacity());
        },
    }
    alloc.reset_failures();

    let limited = TrackingAllocator::with_limit(64);
    let mut arr = TrackedArr::<u64>::new_in(limited.clone());
    if let Err(err) = arr.try_reserve(arr.max_len() + 1) {
        log_info!(LOG_CAT, "reserving past {} elements failed: {}", arr.max_len(), err);
    }
    log_stats("limited", &limited);
}

fn main() {
    if set_logger(Logger::new()).is_err() {
        panic!("logger was already set");
    }
    let logger = get_logger();
    logger.set_max_level(LogLevel::Verbose);

    let alloc = TrackingAllocator::new();

    push_insert_erase_resize(&alloc);
    log_stats("push/insert/erase/resize", &alloc);

    assign(&alloc);
    log_stats("assign", &alloc);

    failing_push(&alloc);
    log_stats("failing push", &alloc);

    if alloc.stats().live_allocs() != 0 {
        log_error!(LOG_CAT, main, "{} allocations were leaked", alloc.stats().live_allocs());
    }

    logger.flush();
}
