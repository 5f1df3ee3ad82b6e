use criterion::Criterion;
use gcpool::thread::ThreadRegistry;
use std::time::Duration;

pub fn bench(c: &mut Criterion) {
    let registry = ThreadRegistry::new(Duration::from_millis(5));
    let thread = registry.register("bench");
    thread.leave_safe_region();

    c.bench_function("enter_and_leave_safe_region", |b| {
        b.iter(|| {
            thread.enter_safe_region();
            thread.leave_safe_region();
        })
    });

    c.bench_function("safepoint_poll", |b| b.iter(|| thread.safepoint_poll()));

    thread.enter_safe_region();
}
