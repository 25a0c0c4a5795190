//! Benchmarks for registration, wiring, lookup and teardown

use autowirer::{AutoWirer, Cleanable, BoxError, Constructor};
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;
use std::sync::Arc;

#[allow(dead_code)]
struct Config {
    url: String,
}

#[allow(dead_code)]
struct Pool {
    config: Arc<Config>,
    size: usize,
}

#[allow(dead_code)]
struct Repository {
    pool: Arc<Pool>,
}

#[allow(dead_code)]
struct Service {
    repository: Arc<Repository>,
    config: Arc<Config>,
}

impl Cleanable for Pool {
    fn cleanup(&self) -> Result<(), BoxError> {
        black_box(self.size);
        Ok(())
    }
}

trait Store: Send + Sync {
    fn get(&self) -> u64;
}

struct Memory(u64);

impl Store for Memory {
    fn get(&self) -> u64 {
        self.0
    }
}

/// Config <- Pool <- Repository <- Service, registered leaf-last
fn register_stack(wirer: &AutoWirer) {
    wirer
        .add_singleton_with(
            Constructor::new(|args| {
                Ok(Service {
                    repository: args.get(0)?,
                    config: args.get(1)?,
                })
            })
            .depends_on::<Repository>()
            .depends_on::<Config>(),
        )
        .add_singleton_with(
            Constructor::new(|args| Ok(Repository { pool: args.get(0)? })).depends_on::<Pool>(),
        )
        .add_singleton_with(
            Constructor::new(|args| {
                Ok(Pool {
                    config: args.get(0)?,
                    size: 16,
                })
            })
            .depends_on::<Config>()
            .cleanable(),
        )
        .add_singleton_with(Constructor::new(|_| {
            Ok(Config {
                url: "postgres://localhost".into(),
            })
        }));
}

fn wired_stack() -> AutoWirer {
    let wirer = AutoWirer::new();
    register_stack(&wirer);
    wirer.try_wire().unwrap();
    wirer
}

fn bench_registration(c: &mut Criterion) {
    let mut group = c.benchmark_group("registration");

    group.bench_function("constructor_4", |b| {
        b.iter(|| {
            let wirer = AutoWirer::new();
            register_stack(&wirer);
            black_box(wirer)
        })
    });

    group.bench_function("existing_singleton", |b| {
        b.iter(|| {
            let wirer = AutoWirer::new();
            wirer.add_existing_singleton(Memory(7));
            black_box(wirer)
        })
    });

    group.finish();
}

fn bench_wiring(c: &mut Criterion) {
    let mut group = c.benchmark_group("wiring");

    group.bench_function("stack_4", |b| {
        b.iter(|| {
            let wirer = AutoWirer::new();
            register_stack(&wirer);
            wirer.try_wire().unwrap();
            black_box(wirer)
        })
    });

    group.bench_function("stack_4_with_listener", |b| {
        b.iter(|| {
            let wirer = AutoWirer::new();
            wirer.add_instantiation_listener(
                |pool: Arc<Pool>, _args: &autowirer::Arguments| {
                    black_box(pool.size);
                    Ok(())
                },
                &[],
            );
            register_stack(&wirer);
            wirer.try_wire().unwrap();
            black_box(wirer)
        })
    });

    group.finish();
}

fn bench_lookup(c: &mut Criterion) {
    let mut group = c.benchmark_group("lookup");
    group.throughput(Throughput::Elements(1));

    let wirer = wired_stack();
    wirer.add_existing_instance(
        autowirer::Instance::new(Arc::new(Memory(42)))
            .with_view(|m: Arc<Memory>| -> Arc<dyn Store> { m }),
        false,
    );

    group.bench_function("find_instance_concrete", |b| {
        b.iter(|| black_box(wirer.find_instance::<Service>().unwrap()))
    });

    group.bench_function("find_instance_interface", |b| {
        b.iter(|| black_box(wirer.find_instance::<dyn Store>().unwrap().unwrap().get()))
    });

    group.bench_function("resolve_existing", |b| {
        b.iter(|| black_box(wirer.resolve::<Repository>(true).unwrap()))
    });

    group.bench_function("resolve_fresh", |b| {
        b.iter(|| black_box(wirer.resolve::<Service>(false).unwrap()))
    });

    group.finish();
}

fn bench_cleanup(c: &mut Criterion) {
    let mut group = c.benchmark_group("cleanup");

    for size in [1usize, 16, 128] {
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("existing", size), &size, |b, &size| {
            b.iter_with_setup(
                || {
                    let wirer = AutoWirer::builder().with_capacity(size).build();
                    for i in 0..size {
                        wirer.add_existing_singleton(Memory(i as u64));
                    }
                    wirer
                },
                |wirer| wirer.cleanup().unwrap(),
            )
        });
    }

    group.bench_function("stack_4", |b| {
        b.iter_with_setup(wired_stack, |wirer| wirer.cleanup().unwrap())
    });

    group.finish();
}

fn bench_concurrent(c: &mut Criterion) {
    use std::thread;

    let mut group = c.benchmark_group("concurrent");

    group.bench_function("concurrent_find_4", |b| {
        let wirer = wired_stack();

        b.iter(|| {
            let handles: Vec<_> = (0..4)
                .map(|_| {
                    let w = wirer.clone();
                    thread::spawn(move || {
                        for _ in 0..100 {
                            let _ = w.find_instance::<Pool>().unwrap();
                        }
                    })
                })
                .collect();

            for h in handles {
                h.join().unwrap();
            }
        })
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_registration,
    bench_wiring,
    bench_lookup,
    bench_cleanup,
    bench_concurrent,
);

criterion_main!(benches);
