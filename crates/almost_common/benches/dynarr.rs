use std::vec::Vec;

use criterion::{criterion_group, criterion_main, black_box, Criterion};

use almost_common::{collections::*, dynarr};

fn dynarr_new(c: &mut Criterion) {
    c.bench_function("DynArr::new", |b| b.iter(|| {
        DynArr::<u32>::new()
    }));
    c.bench_function("Vec::new", |b| b.iter(|| {
        Vec::<u32>::new()
    }));
    c.bench_function("DynArr::with_capacity(64)", |b| b.iter(|| {
        DynArr::<u32>::with_capacity(64)
    }));
    c.bench_function("Vec::with_capacity(64)", |b| b.iter(|| {
        Vec::<u32>::with_capacity(64)
    }));
}

fn dynarr_push(c: &mut Criterion) {
    c.bench_function("DynArr::push(100) no reserve", |b| b.iter(|| {
        let mut arr = DynArr::<u32>::new();
        for i in 0..100 {
            arr.push(i);
        }
        arr
    }));
    c.bench_function("DynArr::push(100) reserve", |b| b.iter(|| {
        let mut arr = DynArr::<u32>::new();
        arr.reserve(100);
        for i in 0..100 {
            arr.push(i);
        }
        arr
    }));

    c.bench_function("Vec::push(100) no reserve", |b| b.iter(|| {
        let mut arr = Vec::<u32>::new();
        for i in 0..100 {
            arr.push(i);
        }
        arr
    }));
    c.bench_function("Vec::push(100) reserve", |b| b.iter(|| {
        let mut arr = Vec::<u32>::new();
        arr.reserve(100);
        for i in 0..100 {
            arr.push(i);
        }
        arr
    }));
}

fn dynarr_insert(c: &mut Criterion) {
    c.bench_function("DynArr::insert(front, 100)", |b| b.iter(|| {
        let mut arr = DynArr::<u32>::new();
        for i in 0..100 {
            arr.insert(0, i);
        }
        arr
    }));
    c.bench_function("Vec::insert(front, 100)", |b| b.iter(|| {
        let mut arr = Vec::<u32>::new();
        for i in 0..100 {
            arr.insert(0, i);
        }
        arr
    }));

    let src = [7u32; 16];
    c.bench_function("DynArr::insert_from_slice(middle, 16)", |b| b.iter(|| {
        let mut arr = dynarr![5u32; 64];
        arr.insert_from_slice(32, black_box(&src));
        arr
    }));
    c.bench_function("Vec::splice(middle, 16)", |b| b.iter(|| {
        let mut arr = vec![5u32; 64];
        arr.splice(32..32, black_box(src).iter().copied());
        arr
    }));
}

fn dynarr_erase(c: &mut Criterion) {
    c.bench_function("DynArr::erase_range(middle, 16)", |b| b.iter(|| {
        let mut arr = dynarr![5u32; 64];
        arr.erase_range(black_box(24..40));
        arr
    }));
    c.bench_function("Vec::drain(middle, 16)", |b| b.iter(|| {
        let mut arr = vec![5u32; 64];
        arr.drain(black_box(24..40));
        arr
    }));
}

fn dynarr_clone(c: &mut Criterion) {
    let arr: DynArr<String> = (0..64).map(|i| i.to_string()).collect();
    c.bench_function("DynArr::clone(64 strings)", |b| b.iter(|| {
        arr.clone()
    }));
    let mut dst = arr.clone();
    c.bench_function("DynArr::clone_from(64 strings)", |b| b.iter(|| {
        dst.clone_from(black_box(&arr));
    }));

    let vbuf: Vec<String> = (0..64).map(|i| i.to_string()).collect();
    c.bench_function("Vec::clone(64 strings)", |b| b.iter(|| {
        vbuf.clone()
    }));
    let mut vdst = vbuf.clone();
    c.bench_function("Vec::clone_from(64 strings)", |b| b.iter(|| {
        vdst.clone_from(black_box(&vbuf));
    }));
}

fn dynarr_index(c: &mut Criterion) {
    let arr = dynarr![5; 100];
    c.bench_function("DynArr::index(100)", |b| b.iter(|| {
        for i in 0..100 {
            black_box(arr[i]);
        }
    }));

    let vbuf = vec![5; 100];
    c.bench_function("Vec::index(100)", |b| b.iter(|| {
        for i in 0..100 {
            black_box(vbuf[i]);
        }
    }));
}

criterion_group!(dynarr,
    dynarr_new,
    dynarr_push,
    dynarr_insert,
    dynarr_erase,
    dynarr_clone,
    dynarr_index
);
criterion_main!(dynarr);
