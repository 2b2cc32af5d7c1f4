use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Particles created per observed crash.
pub const BURST_SIZE: usize = 20;
/// Velocity components are drawn uniformly from [-MAX_SPEED, MAX_SPEED].
pub const MAX_SPEED: f64 = 4.0;
/// Life lost per tick.
pub const LIFE_DECAY: f64 = 0.05;
/// Drawn radius at full life.
pub const BASE_RADIUS: f64 = 4.0;

#[derive(Clone, Debug, PartialEq)]
pub struct Particle {
    pub x: f64,
    pub y: f64,
    pub vx: f64,
    pub vy: f64,
    /// Remaining life in (0, 1].
    pub life: f64,
    pub color: [u8; 3],
}

impl Particle {
    /// Shrink-and-fade radius.
    pub fn radius(&self) -> f64 {
        BASE_RADIUS * self.life
    }

    /// Translucency proportional to remaining life.
    pub fn alpha(&self) -> f64 {
        self.life.clamp(0.0, 1.0)
    }
}

/// Ephemeral explosion effects. Motion only advances through `tick`.
pub struct ParticleSystem {
    particles: Vec<Particle>,
    rng: StdRng,
}

impl ParticleSystem {
    pub fn new() -> Self {
        Self {
            particles: Vec::new(),
            rng: StdRng::from_entropy(),
        }
    }

    /// Deterministic velocities (tests).
    #[cfg(test)]
    pub fn with_seed(seed: u64) -> Self {
        Self {
            particles: Vec::new(),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Spawn `BURST_SIZE` particles at the crash site.
    pub fn spawn_burst(&mut self, x: f64, y: f64, color: [u8; 3]) {
        self.particles.reserve(BURST_SIZE);
        for _ in 0..BURST_SIZE {
            let vx = self.rng.gen_range(-MAX_SPEED..=MAX_SPEED);
            let vy = self.rng.gen_range(-MAX_SPEED..=MAX_SPEED);
            self.particles.push(Particle { x, y, vx, vy, life: 1.0, color });
        }
    }

    /// Integrate positions, decay life, drop dead particles.
    pub fn tick(&mut self) {
        for p in self.particles.iter_mut() {
            p.x += p.vx;
            p.y += p.vy;
            p.life -= LIFE_DECAY;
        }
        self.particles.retain(|p| p.life > 0.0);
    }

    pub fn clear(&mut self) {
        self.particles.clear();
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.particles.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }
}

impl Default for ParticleSystem {
    fn default() -> Self {
        Self::new()
    }
}
