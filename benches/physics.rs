//! Benchmarks for ropesim simulation.

use criterion::{criterion_group, criterion_main, Criterion};
use ropesim::*;

fn draped_rope(scene: &SceneQuery, count: usize, config: RopeConfig) -> Rope {
    let binding = AnchorBinding::between(
        Anchor::point(Vec3::new(0.0, 2.0, 0.0)),
        Anchor::point(Vec3::new(8.0, 2.0, 0.0)),
    );
    let config = config
        .with_particle_count(count)
        .with_rope_length(12.0)
        .with_warmup(0, 0);
    Rope::new(Vec3::ZERO, binding, config, Environment::scene(scene)).unwrap()
}

fn bench_rope_free(c: &mut Criterion) {
    c.bench_function("rope_50_particles_60_steps", |b| {
        let scene = SceneQuery::new();
        b.iter(|| {
            let mut rope = draped_rope(&scene, 50, RopeConfig::new().with_collisions(false, false));
            for _ in 0..60 {
                rope.step(1.0 / 60.0, Environment::new(), &mut NoOpStepObserver);
            }
            rope.chain().positions()
        });
    });
}

fn bench_rope_static_collision(c: &mut Criterion) {
    c.bench_function("rope_50_particles_floor_60_steps", |b| {
        let mut scene = SceneQuery::new();
        scene.add_plane(Vec3::ZERO, Vec3::Y, LayerMask::ALL);
        scene.add_box(Vec3::new(3.0, -1.0, -1.0), Vec3::new(5.0, 0.8, 1.0), LayerMask::ALL);
        b.iter(|| {
            let mut rope = draped_rope(&scene, 50, RopeConfig::new().with_collisions(true, false));
            for _ in 0..60 {
                rope.step(1.0 / 60.0, Environment::scene(&scene), &mut NoOpStepObserver);
            }
            rope.chain().positions()
        });
    });
}

fn bench_rope_dynamic_collision(c: &mut Criterion) {
    c.bench_function("rope_50_particles_8_bodies_60_steps", |b| {
        b.iter(|| {
            let mut scene = SceneQuery::new();
            let bodies: Vec<BodyId> = (0..8)
                .map(|i| scene.add_body(Vec3::new(i as f32, 0.0, 0.0), 0.3, LayerMask::ALL, true))
                .collect();
            let mut rope = draped_rope(&scene, 50, RopeConfig::new().with_collisions(true, true));
            for frame in 0..60 {
                let t = frame as f32 / 60.0;
                for (i, &id) in bodies.iter().enumerate() {
                    scene.move_body(id, Vec3::new(i as f32, t * 2.0, 0.0), 1.0 / 60.0);
                }
                rope.step(1.0 / 60.0, Environment::scene(&scene), &mut NoOpStepObserver);
            }
            rope.chain().positions()
        });
    });
}

fn bench_wind_turbulence(c: &mut Criterion) {
    c.bench_function("rope_200_particles_wind_60_steps", |b| {
        let scene = SceneQuery::new();
        b.iter(|| {
            let config = RopeConfig::new()
                .with_collisions(false, false)
                .with_wind(Vec3::X, -1.0, 3.0);
            let mut rope = draped_rope(&scene, 200, config);
            for _ in 0..60 {
                rope.step(1.0 / 60.0, Environment::new(), &mut NoOpStepObserver);
            }
            rope.chain().positions()
        });
    });
}

criterion_group!(
    benches,
    bench_rope_free,
    bench_rope_static_collision,
    bench_rope_dynamic_collision,
    bench_wind_turbulence
);
criterion_main!(benches);
