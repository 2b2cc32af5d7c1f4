use std::collections::{HashMap, VecDeque};

/// Default number of positions kept per vehicle.
pub const TRAIL_CAPACITY: usize = 100;

/// A recorded vehicle position in scene coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrailPoint {
    pub x: f64,
    pub y: f64,
}

static EMPTY: VecDeque<TrailPoint> = VecDeque::new();

/// Bounded recent-position history per vehicle id, oldest first.
pub struct TrailBuffers {
    capacity: usize,
    trails: HashMap<u32, VecDeque<TrailPoint>>,
}

impl TrailBuffers {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            trails: HashMap::new(),
        }
    }

    /// Record a position for `id`. Dead vehicles keep their trail untouched,
    /// but their id is still registered so a later `clear` covers it.
    pub fn append(&mut self, id: u32, point: TrailPoint, alive: bool) {
        let trail = self
            .trails
            .entry(id)
            .or_insert_with(|| VecDeque::with_capacity(self.capacity));
        if !alive {
            return;
        }
        trail.push_back(point);
        while trail.len() > self.capacity {
            trail.pop_front();
        }
    }

    /// Empty every trail. Ids stay registered.
    pub fn clear(&mut self) {
        for trail in self.trails.values_mut() {
            trail.clear();
        }
    }

    /// Current trail for `id`, empty for unknown ids.
    pub fn get(&self, id: u32) -> &VecDeque<TrailPoint> {
        self.trails.get(&id).unwrap_or(&EMPTY)
    }

    /// Number of ids seen this session.
    #[cfg(test)]
    pub fn tracked(&self) -> usize {
        self.trails.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.trails.values().all(VecDeque::is_empty)
    }
}

impl Default for TrailBuffers {
    fn default() -> Self {
        Self::new(TRAIL_CAPACITY)
    }
}
