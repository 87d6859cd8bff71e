use glam::Vec3;
use ropesim::{
    CollisionPolicy, CollisionQuery, CollisionResolver, LayerMask, ParticleChain, RopeConfig,
    SceneQuery, StepCounter,
};

const STATIC_LAYER: LayerMask = LayerMask::layer(0);
const BODY_LAYER: LayerMask = LayerMask::layer(1);

fn resolver(config: &RopeConfig) -> CollisionResolver {
    CollisionResolver::new(CollisionPolicy::from_config(config))
}

fn base_config() -> RopeConfig {
    let mut config = RopeConfig::new().with_collisions(true, true).with_clearance(0.05);
    config.static_mask = STATIC_LAYER;
    config.dynamic_mask = BODY_LAYER;
    config
}

/// A pinned particle at (0, 2, 0) and a free one that moved from (0, 1, 0)
/// to `pos` during the step.
fn falling_pair(pos: Vec3, rest_length: f32) -> ParticleChain {
    let mut chain = ParticleChain::from_positions(&[Vec3::new(0.0, 2.0, 0.0), Vec3::new(0.0, 1.0, 0.0)])
        .unwrap()
        .with_rest_length(rest_length);
    chain.attach(0).unwrap();
    chain.particle_mut(1).pos = pos;
    chain
}

fn floor_scene(height: f32) -> SceneQuery {
    let mut scene = SceneQuery::new();
    scene.add_plane(Vec3::new(0.0, height, 0.0), Vec3::Y, STATIC_LAYER);
    scene
}

#[test]
fn static_hit_stops_particle_at_clearance() {
    let scene = floor_scene(0.95);
    let mut chain = falling_pair(Vec3::new(0.0, 0.9, 0.0), 1.1);
    let mut counter = StepCounter::default();

    let corrections = resolver(&base_config()).resolve(&mut chain, Some(&scene), &[], &mut counter);

    assert_eq!(corrections, 1);
    assert_eq!(counter.static_hits, 1);
    assert_eq!(counter.collided, vec![1]);
    let y = chain.particle(1).pos.y;
    assert!((y - 1.0).abs() < 1e-5, "expected particle at 0.95 + clearance, got {}", y);
}

#[test]
fn particle_not_reaching_surface_is_untouched() {
    let scene = floor_scene(0.5);
    let mut chain = falling_pair(Vec3::new(0.0, 0.9, 0.0), 1.1);

    let corrections = resolver(&base_config()).resolve(&mut chain, Some(&scene), &[], &mut StepCounter::default());

    assert_eq!(corrections, 0);
    assert_eq!(chain.particle(1).pos, Vec3::new(0.0, 0.9, 0.0));
}

#[test]
fn taut_rope_slides_along_surface() {
    let scene = floor_scene(0.95);
    let config = base_config().with_stretch_policy(0.05, 10.0);
    let mut chain = falling_pair(Vec3::new(0.2, 0.9, 0.0), 1.0);

    let corrections = resolver(&config).resolve(&mut chain, Some(&scene), &[], &mut StepCounter::default());

    assert_eq!(corrections, 1);
    let pos = chain.particle(1).pos;
    assert!(pos.y > 0.95, "particle must stay above the surface, got {:?}", pos);
    assert!(
        (pos.x - 0.2).abs() < 1e-4,
        "tangential motion should be kept when sliding, got {:?}",
        pos
    );
}

#[test]
fn slack_rope_stops_without_sliding() {
    let scene = floor_scene(0.95);
    let config = base_config().with_stretch_policy(0.05, 10.0);
    // Trailing segment is at rest length: hard stop.
    let mut chain = falling_pair(Vec3::new(0.2, 0.9, 0.0), 1.118);

    resolver(&config).resolve(&mut chain, Some(&scene), &[], &mut StepCounter::default());

    let pos = chain.particle(1).pos;
    assert!(pos.y > 0.95);
    assert!(pos.x < 0.1, "hard stop should cut tangential motion, got {:?}", pos);
}

#[test]
fn overstretched_particle_is_ignored() {
    let scene = floor_scene(0.95);
    let mut counter = StepCounter::default();
    // Trailing segment is 1.1 long against a 0.3 rest length.
    let mut chain = falling_pair(Vec3::new(0.0, 0.9, 0.0), 0.3);

    let corrections = resolver(&base_config()).resolve(&mut chain, Some(&scene), &[], &mut counter);

    assert_eq!(corrections, 0);
    assert_eq!(counter.collisions(), 0);
    assert_eq!(chain.particle(1).pos, Vec3::new(0.0, 0.9, 0.0), "ignored particle keeps penetrating");
}

#[test]
fn unready_or_missing_query_means_no_collision() {
    let mut scene = floor_scene(0.95);
    scene.set_ready(false);
    let mut resolver = resolver(&base_config());

    let mut chain = falling_pair(Vec3::new(0.0, 0.9, 0.0), 1.1);
    assert_eq!(resolver.resolve(&mut chain, Some(&scene), &[], &mut StepCounter::default()), 0);
    assert_eq!(resolver.resolve(&mut chain, None, &[], &mut StepCounter::default()), 0);
    assert_eq!(chain.particle(1).pos, Vec3::new(0.0, 0.9, 0.0));
}

#[test]
fn attached_particles_are_never_probed() {
    let scene = floor_scene(0.95);
    let mut chain = falling_pair(Vec3::new(0.0, 0.9, 0.0), 1.1);
    chain.attach(1).unwrap();

    let corrections = resolver(&base_config()).resolve(&mut chain, Some(&scene), &[], &mut StepCounter::default());
    assert_eq!(corrections, 0);
}

#[test]
fn static_mask_filters_geometry() {
    let mut scene = SceneQuery::new();
    scene.add_plane(Vec3::new(0.0, 0.95, 0.0), Vec3::Y, LayerMask::layer(5));
    let mut chain = falling_pair(Vec3::new(0.0, 0.9, 0.0), 1.1);

    let corrections = resolver(&base_config()).resolve(&mut chain, Some(&scene), &[], &mut StepCounter::default());
    assert_eq!(corrections, 0, "plane on an unmasked layer must be ignored");
}

#[test]
fn tracking_follows_and_evicts_bodies() {
    let mut scene = SceneQuery::new();
    let body = scene.add_body(Vec3::new(0.5, 1.5, 0.0), 0.2, BODY_LAYER, true);
    let chain = falling_pair(Vec3::new(0.0, 1.0, 0.0), 1.0);
    let mut resolver = resolver(&base_config());

    resolver.track_bodies(&chain, &scene, &[]);
    assert_eq!(resolver.tracked_count(), 1);
    assert_eq!(resolver.tracked(body).unwrap().displacement(), Vec3::ZERO);

    scene.move_body(body, Vec3::new(0.6, 1.5, 0.0), 1.0 / 60.0);
    resolver.track_bodies(&chain, &scene, &[]);
    let displacement = resolver.tracked(body).unwrap().displacement();
    assert!((displacement - Vec3::new(0.1, 0.0, 0.0)).length() < 1e-6);

    scene.move_body(body, Vec3::new(10.0, 10.0, 10.0), 1.0 / 60.0);
    resolver.track_bodies(&chain, &scene, &[]);
    assert_eq!(resolver.tracked_count(), 0, "body out of range must be evicted");
    assert!(resolver.tracked(body).is_none());
}

#[test]
fn anchored_bodies_are_not_tracked() {
    let mut scene = SceneQuery::new();
    let body = scene.add_body(Vec3::new(0.0, 2.0, 0.0), 0.2, BODY_LAYER, true);
    let chain = falling_pair(Vec3::new(0.0, 1.0, 0.0), 1.0);
    let mut resolver = resolver(&base_config());

    resolver.track_bodies(&chain, &scene, &[body]);
    assert_eq!(resolver.tracked_count(), 0);
}

#[test]
fn approaching_body_pushes_particle() {
    let mut scene = SceneQuery::new();
    let body = scene.add_body(Vec3::new(-0.5, 1.0, 0.0), 0.3, BODY_LAYER, true);
    let config = base_config().with_clearance(0.1);
    let mut resolver = resolver(&config);
    // Free particle at rest at (0, 1, 0).
    let mut chain = falling_pair(Vec3::new(0.0, 1.0, 0.0), 1.0);

    let mut counter = StepCounter::default();
    assert_eq!(resolver.resolve(&mut chain, Some(&scene), &[], &mut counter), 0);

    // Surface moves to x = -0.05, inside the clearance band.
    scene.move_body(body, Vec3::new(-0.35, 1.0, 0.0), 1.0 / 60.0);
    let corrections = resolver.resolve(&mut chain, Some(&scene), &[], &mut counter);

    assert_eq!(corrections, 1);
    assert_eq!(counter.dynamic_hits, 1);
    let pos = chain.particle(1).pos;
    assert!(
        (pos - Vec3::new(0.05, 1.0, 0.0)).length() < 1e-4,
        "particle should be pushed to surface + clearance, got {:?}",
        pos
    );
}

#[test]
fn receding_body_does_not_pull_particle() {
    let mut scene = SceneQuery::new();
    let body = scene.add_body(Vec3::new(-0.5, 1.0, 0.0), 0.3, BODY_LAYER, true);
    let mut resolver = resolver(&base_config().with_clearance(0.1));
    let mut chain = falling_pair(Vec3::new(0.0, 1.0, 0.0), 1.0);

    resolver.resolve(&mut chain, Some(&scene), &[], &mut StepCounter::default());
    scene.move_body(body, Vec3::new(-0.6, 1.0, 0.0), 1.0 / 60.0);
    let corrections = resolver.resolve(&mut chain, Some(&scene), &[], &mut StepCounter::default());

    assert_eq!(corrections, 0);
    assert_eq!(chain.particle(1).pos, Vec3::new(0.0, 1.0, 0.0));
}

#[test]
fn static_channel_wins_over_dynamic() {
    let mut scene = floor_scene(0.95);
    scene.add_body(Vec3::new(0.0, 0.7, 0.0), 0.1, BODY_LAYER, true);
    let mut counter = StepCounter::default();
    let mut chain = falling_pair(Vec3::new(0.0, 0.9, 0.0), 1.1);

    resolver(&base_config()).resolve(&mut chain, Some(&scene), &[], &mut counter);

    assert_eq!(counter.static_hits, 1);
    assert_eq!(counter.dynamic_hits, 0, "one correction per particle per step");
}

#[test]
fn scene_raycast_reports_closest_hit() {
    let mut scene = floor_scene(0.0);
    scene.add_box(Vec3::new(-1.0, 1.0, -1.0), Vec3::new(1.0, 2.0, 1.0), STATIC_LAYER);
    let body = scene.add_body(Vec3::new(0.0, 4.0, 0.0), 0.5, BODY_LAYER, false);

    let origin = Vec3::new(0.0, 6.0, 0.0);
    let down = Vec3::new(0.0, -10.0, 0.0);

    let hit = scene.raycast(origin, down, LayerMask::ALL, &[]).unwrap();
    assert_eq!(hit.body, Some(body));
    assert!((hit.point.y - 4.5).abs() < 1e-5);

    let hit = scene.raycast(origin, down, LayerMask::ALL, &[body]).unwrap();
    assert_eq!(hit.body, None);
    assert!((hit.point.y - 2.0).abs() < 1e-5);
    assert_eq!(hit.normal, Vec3::Y);

    assert!(scene.raycast(origin, Vec3::new(0.0, -1.0, 0.0), LayerMask::ALL, &[]).is_none());
}
