//! # ECS Churn Benchmark
//!
//! Measures the paths that run every tick:
//! - Spawning and killing with id recycling
//! - Attach/detach churn with live membership recomputation
//! - `update_all` over a populated system
//!
//! Run with: `cargo bench --package meridian_ecs`

// Benchmarks don't need docs
#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use meridian_ecs::{Coordinator, Entity, System};

#[derive(Clone, Copy)]
struct Position {
    x: f32,
    y: f32,
}

#[derive(Clone, Copy)]
struct Velocity {
    dx: f32,
    dy: f32,
}

struct Frozen;

struct MoverSystem;

impl System for MoverSystem {
    fn on_update(&mut self, world: &mut Coordinator, entities: &[Entity], dt: f32) {
        for &entity in entities {
            let Ok(Some(&velocity)) = world.get_component::<Velocity>(entity) else {
                continue;
            };
            if let Ok(Some(position)) = world.get_component_mut::<Position>(entity) {
                position.x += velocity.dx * dt;
                position.y += velocity.dy * dt;
            }
        }
    }
}

/// A second system so every signature change is matched against more than one.
struct FreezeSystem;

impl System for FreezeSystem {
    fn on_update(&mut self, _world: &mut Coordinator, entities: &[Entity], _dt: f32) {
        black_box(entities.len());
    }
}

fn populated(count: usize) -> (Coordinator, Vec<Entity>) {
    let mut world = Coordinator::new();
    world.register_component::<Position>().expect("register Position");
    world.register_component::<Velocity>().expect("register Velocity");
    world.register_component::<Frozen>().expect("register Frozen");
    world.add_system(MoverSystem).expect("add MoverSystem");
    world.add_system(FreezeSystem).expect("add FreezeSystem");
    world
        .set_system_signature::<MoverSystem, (Position, Velocity)>()
        .expect("mover signature");
    world
        .set_system_signature::<FreezeSystem, (Position, Frozen)>()
        .expect("freeze signature");

    let entities = (0..count)
        .map(|i| {
            let e = world.spawn_entity("body");
            #[allow(clippy::cast_precision_loss)]
            let x = i as f32;
            world
                .add_component(e, Position { x, y: 0.0 })
                .expect("add Position");
            world
                .add_component(e, Velocity { dx: 1.0, dy: 0.5 })
                .expect("add Velocity");
            e
        })
        .collect();
    (world, entities)
}

fn bench_spawn_kill(c: &mut Criterion) {
    let mut group = c.benchmark_group("spawn_kill");

    for count in [1_000, 10_000] {
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            let mut world = Coordinator::new();
            let mut live = Vec::with_capacity(count);
            b.iter(|| {
                for _ in 0..count {
                    live.push(world.spawn_entity("bullet"));
                }
                for e in live.drain(..) {
                    black_box(world.kill_entity(e));
                }
            });
        });
    }

    group.finish();
}

fn bench_component_churn(c: &mut Criterion) {
    let (mut world, entities) = populated(10_000);

    c.bench_function("attach_detach_10k", |b| {
        b.iter(|| {
            for &e in &entities {
                world.add_component(e, Frozen).expect("attach");
            }
            for &e in &entities {
                black_box(world.remove_component::<Frozen>(e).expect("detach"));
            }
        });
    });
}

fn bench_update_all(c: &mut Criterion) {
    let mut group = c.benchmark_group("update_all");

    for count in [1_000, 10_000, 100_000] {
        let (mut world, _) = populated(count);
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, _| {
            b.iter(|| black_box(world.update_all(1.0 / 60.0)));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_spawn_kill, bench_component_churn, bench_update_all);
criterion_main!(benches);
