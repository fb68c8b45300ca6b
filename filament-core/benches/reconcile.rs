//! Keyed list reconciliation benchmarks.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

use filament_core::dom::Node;
use filament_core::element::{create_element, Props};
use filament_core::reactive::State;
use filament_core::{render, run_microtasks, Element, For};

fn list(items: &State<Vec<u32>>) -> Element {
    For::new(items.clone(), |item, index| {
        create_element("li", Props::new().child(item).child(index))
    })
    .into()
}

fn bench_reverse(c: &mut Criterion) {
    let mut group = c.benchmark_group("for_reverse");
    for size in [10u32, 100, 1_000] {
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            let root = Node::element("ul");
            let items = State::new((0..size).collect::<Vec<_>>());
            let _dispose = render(&root, &list(&items)).expect("initial render");

            b.iter(|| {
                let mut next = items.get_untracked();
                next.reverse();
                items.set(black_box(next));
                run_microtasks().expect("flush");
            });
        });
    }
    group.finish();
}

fn bench_append_remove(c: &mut Criterion) {
    let mut group = c.benchmark_group("for_append_remove");
    for size in [10u32, 100, 1_000] {
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            let root = Node::element("ul");
            let items = State::new((0..size).collect::<Vec<_>>());
            let _dispose = render(&root, &list(&items)).expect("initial render");

            b.iter(|| {
                let mut next = items.get_untracked();
                next.push(size);
                items.set(next);
                run_microtasks().expect("flush");

                let mut next = items.get_untracked();
                next.remove(0);
                next.insert(0, 0);
                next.pop();
                items.set(black_box(next));
                run_microtasks().expect("flush");
            });
        });
    }
    group.finish();
}

fn bench_mount(c: &mut Criterion) {
    c.bench_function("for_mount_1000", |b| {
        let items: Vec<u32> = (0..1_000).collect();
        b.iter(|| {
            let root = Node::element("ul");
            let tree: Element = For::new(items.clone(), |item, _| {
                create_element("li", Props::new().child(item))
            })
            .into();
            let dispose = render(&root, &tree).expect("render");
            dispose.dispose();
            black_box(root.child_count())
        });
    });
}

criterion_group!(benches, bench_reverse, bench_append_remove, bench_mount);
criterion_main!(benches);
