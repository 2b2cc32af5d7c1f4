use crate::particles::ParticleSystem;
use crate::protocol::{ServerEvent, UpdatePayload, VehicleSnapshot};
use crate::telemetry::{Telemetry, TelemetryRow};
use crate::trails::{TrailBuffers, TrailPoint};

/// Latest server-authoritative view of the race.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderState {
    pub generation: u32,
    pub alive_count: u32,
    pub steps: Option<u64>,
    pub paused: bool,
    pub connected: bool,
    /// Car list of the most recent `update`, replaced wholesale each time.
    pub cars: Vec<VehicleSnapshot>,
}

impl Default for RenderState {
    fn default() -> Self {
        Self {
            generation: 1,
            alive_count: 0,
            steps: None,
            paused: false,
            connected: false,
            cars: Vec::new(),
        }
    }
}

/// Everything the frame composer reads. Mutated only through the
/// per-event transitions below; rendering borrows it immutably.
pub struct Viewer {
    pub render: RenderState,
    pub trails: TrailBuffers,
    pub particles: ParticleSystem,
    pub telemetry: Telemetry,
}

impl Viewer {
    pub fn new(trail_capacity: usize) -> Self {
        Self::with_particles(trail_capacity, ParticleSystem::new())
    }

    pub fn with_particles(trail_capacity: usize, particles: ParticleSystem) -> Self {
        Self {
            render: RenderState::default(),
            trails: TrailBuffers::new(trail_capacity),
            particles,
            telemetry: Telemetry::new(),
        }
    }

    pub fn apply(&mut self, event: ServerEvent) {
        match event {
            ServerEvent::Update(u) => self.on_update(u),
            ServerEvent::Reset(g) => self.on_reset(g.generation),
            ServerEvent::HardReset(g) => self.on_hard_reset(g.generation),
            ServerEvent::PauseState(p) => self.on_pause_state(p.paused),
            ServerEvent::GenLog(row) => self.on_gen_log(row),
        }
    }

    /// New snapshot: record trails, spawn crash bursts, then advance the
    /// particle animation by exactly one step.
    pub fn on_update(&mut self, update: UpdatePayload) {
        for car in &update.cars {
            self.trails
                .append(car.id, TrailPoint { x: car.x, y: car.y }, car.alive);
            if car.crashed {
                self.particles.spawn_burst(car.x, car.y, car.color);
            }
        }
        self.particles.tick();
        self.render.cars = update.cars;
        self.render.alive_count = update.alive;
        if update.steps.is_some() {
            self.render.steps = update.steps;
        }
    }

    /// Generation rollover. The car list stays until the next update.
    pub fn on_reset(&mut self, generation: u32) {
        self.render.generation = generation;
        self.render.steps = Some(0);
        self.trails.clear();
        self.particles.clear();
    }

    pub fn on_hard_reset(&mut self, generation: u32) {
        self.on_reset(generation);
        self.telemetry.clear();
    }

    pub fn on_pause_state(&mut self, paused: bool) {
        self.render.paused = paused;
    }

    pub fn on_gen_log(&mut self, row: TelemetryRow) {
        self.telemetry.push(row);
    }

    pub fn set_connected(&mut self, connected: bool) {
        self.render.connected = connected;
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::particles::BURST_SIZE;
    use crate::protocol::GenerationPayload;

    pub(crate) fn car(id: u32, x: f64, y: f64, alive: bool, crashed: bool) -> VehicleSnapshot {
        VehicleSnapshot {
            id,
            x,
            y,
            angle: 0.0,
            color: [0xFF, 0x00, 0x55],
            alive,
            crashed,
            sensors: Vec::new(),
        }
    }

    fn update(cars: Vec<VehicleSnapshot>) -> UpdatePayload {
        let alive = cars.iter().filter(|c| c.alive).count() as u32;
        UpdatePayload { cars, alive, steps: Some(1) }
    }

    fn viewer() -> Viewer {
        Viewer::with_particles(100, ParticleSystem::with_seed(11))
    }

    #[test]
    fn test_update_crash_spawns_burst_and_trails_alive() {
        let mut v = viewer();
        v.on_update(update(vec![
            car(0, 450.0, 150.0, true, false),
            car(1, 300.0, 120.0, false, true),
        ]));
        // spawned at the crash site, then advanced one tick
        assert_eq!(v.particles.len(), BURST_SIZE);
        for p in v.particles.particles() {
            assert!((p.x - p.vx - 300.0).abs() < 1e-9);
            assert!((p.y - p.vy - 120.0).abs() < 1e-9);
            assert_eq!(p.color, [0xFF, 0x00, 0x55]);
        }
        assert_eq!(v.trails.get(0).len(), 1);
        assert_eq!(v.trails.get(0)[0], TrailPoint { x: 450.0, y: 150.0 });
        assert!(v.trails.get(1).is_empty());
        assert_eq!(v.render.alive_count, 1);
        assert_eq!(v.render.cars.len(), 2);
    }

    #[test]
    fn test_update_replaces_car_list_wholesale() {
        let mut v = viewer();
        v.on_update(update(vec![car(0, 1.0, 1.0, true, false), car(1, 2.0, 2.0, true, false)]));
        v.on_update(update(vec![car(1, 3.0, 3.0, true, false)]));
        assert_eq!(v.render.cars.len(), 1);
        assert_eq!(v.render.cars[0].x, 3.0);
        assert_eq!(v.render.alive_count, 1);
    }

    #[test]
    fn test_reset_flushes_trails_and_particles_keeps_cars() {
        let mut v = viewer();
        v.on_update(update(vec![car(0, 1.0, 1.0, true, false), car(1, 2.0, 2.0, false, true)]));
        v.on_gen_log(TelemetryRow { generation: 2, distance: 10.0, epsilon: 0.5 });
        v.apply(ServerEvent::Reset(GenerationPayload { generation: 3 }));
        assert_eq!(v.render.generation, 3);
        assert!(v.trails.is_empty());
        assert!(v.particles.is_empty());
        assert_eq!(v.render.cars.len(), 2, "cars retained until next update");
        assert_eq!(v.telemetry.len(), 1, "plain reset keeps telemetry");
    }

    #[test]
    fn test_hard_reset_also_clears_telemetry() {
        let mut v = viewer();
        v.on_update(update(vec![car(0, 1.0, 1.0, true, false), car(1, 2.0, 2.0, false, true)]));
        v.on_gen_log(TelemetryRow { generation: 2, distance: 10.0, epsilon: 0.5 });
        v.apply(ServerEvent::HardReset(GenerationPayload { generation: 1 }));
        assert_eq!(v.render.generation, 1);
        assert!(v.trails.is_empty());
        assert!(v.particles.is_empty());
        assert!(v.telemetry.is_empty());
        assert!(v.telemetry.chart().is_empty());
    }

    #[test]
    fn test_pause_state_only_touches_flag() {
        let mut v = viewer();
        v.on_update(update(vec![car(0, 1.0, 1.0, true, false)]));
        let before = v.render.clone();
        v.on_pause_state(true);
        assert!(v.render.paused);
        assert_eq!(v.render.cars, before.cars);
        assert_eq!(v.trails.get(0).len(), 1);
        v.on_pause_state(false);
        assert!(!v.render.paused);
    }

    #[test]
    fn test_particles_advance_only_on_update() {
        let mut v = viewer();
        v.on_update(update(vec![car(0, 0.0, 0.0, false, true)]));
        let life = v.particles.particles()[0].life;
        v.on_pause_state(true);
        v.on_gen_log(TelemetryRow { generation: 2, distance: 1.0, epsilon: 1.0 });
        assert_eq!(v.particles.particles()[0].life, life);
        v.on_update(update(vec![car(0, 0.0, 0.0, false, false)]));
        assert!(v.particles.particles()[0].life < life);
    }

    #[test]
    fn test_steps_kept_when_absent() {
        let mut v = viewer();
        v.on_update(UpdatePayload { cars: vec![], alive: 0, steps: Some(5) });
        v.on_update(UpdatePayload { cars: vec![], alive: 0, steps: None });
        assert_eq!(v.render.steps, Some(5));
    }
}
