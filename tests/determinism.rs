use glam::Vec3;
use ropesim::{Anchor, AnchorBinding, Environment, LayerMask, NoOpStepObserver, Rope, RopeConfig, SceneQuery};

fn windy_config() -> RopeConfig {
    RopeConfig::new()
        .with_particle_count(24)
        .with_rope_length(8.0)
        .with_wind(Vec3::new(1.0, 0.0, 0.5), -0.5, 2.0)
        .with_collisions(true, true)
        .with_seed(1234)
}

fn scene() -> SceneQuery {
    let mut scene = SceneQuery::new();
    scene.add_plane(Vec3::new(0.0, -3.0, 0.0), Vec3::Y, LayerMask::ALL);
    scene.add_box(Vec3::new(1.0, -2.0, -1.0), Vec3::new(2.0, -1.0, 1.0), LayerMask::ALL);
    scene
}

#[test]
fn rope_deterministic() {
    let results: Vec<_> = (0..5)
        .map(|_| {
            let mut scene = scene();
            let swinging = scene.add_body(Vec3::new(-1.0, -1.5, 0.0), 0.4, LayerMask::ALL, true);
            let binding = AnchorBinding::between(
                Anchor::point(Vec3::ZERO),
                Anchor::point(Vec3::new(3.0, 0.0, 0.0)),
            );
            let mut rope = Rope::new(Vec3::ZERO, binding, windy_config(), Environment::scene(&scene)).unwrap();

            for frame in 0..240 {
                let t = frame as f32 / 60.0;
                scene.move_body(swinging, Vec3::new(-1.0 + t.sin() * 2.0, -1.5, 0.0), 1.0 / 60.0);
                rope.tick(1.0 / 60.0, Environment::scene(&scene), &mut NoOpStepObserver);
            }
            rope.chain().positions()
        })
        .collect();

    for r in &results[1..] {
        for (a, b) in results[0].iter().zip(r.iter()) {
            assert_eq!(a, b);
        }
    }
}

#[test]
fn unwrap_jitter_is_seeded() {
    let build = |seed: u64| {
        let binding = AnchorBinding::between(Anchor::point(Vec3::ONE), Anchor::point(Vec3::ONE));
        let config = RopeConfig::new().with_seed(seed).with_warmup(0, 0);
        Rope::new(Vec3::ZERO, binding, config, Environment::new())
            .unwrap()
            .chain()
            .positions()
    };

    assert_eq!(build(7), build(7));
    assert_ne!(build(7), build(8));
}
