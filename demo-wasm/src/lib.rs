use ropesim::{
    Anchor, AnchorBinding, BodyId, Environment, ForceJoint, LayerMask, NoOpStepObserver, Rope, RopeConfig, SceneQuery,
    SimulationMode, Vec3,
};
use wasm_bindgen::prelude::*;

/// Canvas coordinates grow downward.
const CANVAS_GRAVITY: Vec3 = Vec3::new(0.0, 400.0, 0.0);

fn to_js(e: ropesim::RopeError) -> JsValue {
    JsValue::from_str(&e.to_string())
}

fn flatten_xy(rope: &Rope) -> Vec<f32> {
    let pos = rope.chain().positions();
    let mut out = Vec::with_capacity(pos.len() * 2);
    for p in &pos {
        out.push(p.x);
        out.push(p.y);
    }
    out
}

// ---- Rope Demo ----

/// A cable hanging from a draggable handle, draping over the canvas floor.
#[wasm_bindgen]
pub struct RopeDemo {
    rope: Rope,
    scene: SceneQuery,
    handle: BodyId,
}

#[wasm_bindgen]
impl RopeDemo {
    #[wasm_bindgen(constructor)]
    pub fn new(particles: usize, length: f32) -> Result<RopeDemo, JsValue> {
        let mut scene = SceneQuery::new();
        scene.add_plane(Vec3::new(0.0, 460.0, 0.0), Vec3::NEG_Y, LayerMask::ALL);
        let handle = scene.add_body(Vec3::new(300.0, 60.0, 0.0), 8.0, LayerMask::layer(1), false);

        let config = RopeConfig::new()
            .with_particle_count(particles)
            .with_rope_length(length)
            .with_gravity(CANVAS_GRAVITY)
            .with_stiffness(1.0, 8)
            .with_damping(4.0)
            .with_clearance(2.0);
        let binding = AnchorBinding::hanging(Anchor::body(handle));
        let rope = Rope::new(Vec3::ZERO, binding, config, Environment::scene(&scene)).map_err(to_js)?;

        Ok(RopeDemo { rope, scene, handle })
    }

    pub fn update(&mut self, dt: f32) {
        self.rope.tick(dt, Environment::scene(&self.scene), &mut NoOpStepObserver);
    }

    pub fn move_handle(&mut self, x: f32, y: f32, dt: f32) {
        self.scene.move_body(self.handle, Vec3::new(x, y, 0.0), dt);
    }

    /// Attach the free end to a fixed point, or release it.
    pub fn pin_end(&mut self, pinned: bool, x: f32, y: f32) -> Result<(), JsValue> {
        let end = pinned.then(|| Anchor::point(Vec3::new(x, y, 0.0)));
        let binding = AnchorBinding::new(self.rope.binding().start, end);
        self.rope
            .rebind(binding, Environment::scene(&self.scene))
            .map_err(to_js)
    }

    /// Throttle the rope to `rate` steps per second, 0 for every frame.
    pub fn set_rate(&mut self, rate: f32) -> Result<(), JsValue> {
        let config = self.rope.config().clone().with_target_rate(rate);
        self.rope
            .reconfigure(config, Environment::scene(&self.scene))
            .map_err(to_js)
    }

    pub fn set_enabled(&mut self, enabled: bool) -> Result<(), JsValue> {
        let mode = if enabled {
            SimulationMode::AlwaysRun
        } else {
            SimulationMode::Disabled
        };
        let config = self.rope.config().clone().with_mode(mode);
        self.rope
            .reconfigure(config, Environment::scene(&self.scene))
            .map_err(to_js)
    }

    /// Returns flat [x0, y0, x1, y1, ...] positions
    pub fn positions(&self) -> Vec<f32> {
        flatten_xy(&self.rope)
    }

    pub fn particle_count(&self) -> usize {
        self.rope.particle_count()
    }
}

// ---- Tether Demo ----

/// Two balls joined by a cable and a force joint. The ball under the cursor
/// pushes the cable aside and drags its partner once the cable is taut.
#[wasm_bindgen]
pub struct TetherDemo {
    rope: Rope,
    scene: SceneQuery,
    joint: ForceJoint,
    leader: BodyId,
    follower: BodyId,
    pusher: BodyId,
}

#[wasm_bindgen]
impl TetherDemo {
    #[wasm_bindgen(constructor)]
    pub fn new() -> Result<TetherDemo, JsValue> {
        let mut scene = SceneQuery::new();
        scene.add_plane(Vec3::new(0.0, 460.0, 0.0), Vec3::NEG_Y, LayerMask::ALL);
        let leader = scene.add_body(Vec3::new(200.0, 200.0, 0.0), 16.0, LayerMask::layer(1), true);
        let follower = scene.add_body(Vec3::new(420.0, 200.0, 0.0), 16.0, LayerMask::layer(1), true);
        let pusher = scene.add_body(Vec3::new(310.0, 60.0, 0.0), 24.0, LayerMask::layer(2), false);

        let mut config = RopeConfig::new()
            .with_particle_count(32)
            .with_rope_length(300.0)
            .with_gravity(CANVAS_GRAVITY)
            .with_stiffness(1.0, 6)
            .with_damping(3.0)
            .with_collisions(true, true)
            .with_clearance(3.0);
        config.dynamic_mask = LayerMask::layer(2);
        config.dynamic_probe_length = 30.0;
        config.tracking_margin = 40.0;

        let binding = AnchorBinding::between(Anchor::body(leader), Anchor::body(follower));
        let rope = Rope::new(Vec3::ZERO, binding, config, Environment::scene(&scene)).map_err(to_js)?;
        let joint = ForceJoint::new(leader, follower, 280.0, 4000.0).with_ease(60.0, 2.0);

        Ok(TetherDemo { rope, scene, joint, leader, follower, pusher })
    }

    pub fn update(&mut self, dt: f32) {
        self.joint.apply(&mut self.scene);
        for id in [self.leader, self.follower] {
            let force = self.scene.take_force(id);
            if let Some(body) = self.scene.body(id) {
                let velocity = (body.velocity + force * dt) * 0.98;
                let center = body.center + velocity * dt;
                self.scene.move_body(id, center, dt);
            }
        }
        self.rope.tick(dt, Environment::scene(&self.scene), &mut NoOpStepObserver);
    }

    pub fn move_leader(&mut self, x: f32, y: f32, dt: f32) {
        self.scene.move_body(self.leader, Vec3::new(x, y, 0.0), dt);
    }

    pub fn move_pusher(&mut self, x: f32, y: f32, dt: f32) {
        self.scene.move_body(self.pusher, Vec3::new(x, y, 0.0), dt);
    }

    /// Returns [leader x, leader y, follower x, follower y, pusher x, pusher y]
    pub fn bodies(&self) -> Vec<f32> {
        [self.leader, self.follower, self.pusher]
            .iter()
            .filter_map(|&id| self.scene.body(id))
            .flat_map(|b| [b.center.x, b.center.y])
            .collect()
    }

    /// Returns flat [x0, y0, x1, y1, ...] positions
    pub fn positions(&self) -> Vec<f32> {
        flatten_xy(&self.rope)
    }
}
