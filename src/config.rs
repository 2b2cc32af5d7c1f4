use std::path::Path;

use serde::Deserialize;
use tracing::warn;

use crate::renderer::track::TrackGeometry;

const DEFAULT_PATH: &str = "raceview.yaml";

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub display: DisplayConfig,
    pub track: TrackGeometry,
    /// Points kept per car trail.
    pub trail_capacity: usize,
    pub speed: SpeedConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub url: String,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub width: usize,
    pub height: usize,
    pub target_fps: usize,
}

/// Bounds of the speed multiplier slider.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SpeedConfig {
    pub min: u32,
    pub max: u32,
    pub initial: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            display: DisplayConfig::default(),
            track: TrackGeometry::default(),
            trail_capacity: crate::trails::TRAIL_CAPACITY,
            speed: SpeedConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            url: "ws://127.0.0.1:5001/ws".to_string(),
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            width: 1020,
            height: 600,
            target_fps: 60,
        }
    }
}

impl Default for SpeedConfig {
    fn default() -> Self {
        Self { min: 1, max: 10, initial: 1 }
    }
}

/// Load `path`, or `raceview.yaml` from the working directory when `None`.
/// A missing default file is silent; anything unreadable falls back to
/// defaults with a warning.
pub fn load(path: Option<&Path>) -> Config {
    let (path, explicit) = match path {
        Some(p) => (p, true),
        None => (Path::new(DEFAULT_PATH), false),
    };
    if !explicit && !path.exists() {
        return Config::default();
    }
    match std::fs::read_to_string(path) {
        Ok(contents) => match serde_yaml::from_str(&contents) {
            Ok(cfg) => cfg,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to parse config; using defaults");
                Config::default()
            }
        },
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to read config; using defaults");
            Config::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let cfg = Config::default();
        assert_eq!(cfg.server.url, "ws://127.0.0.1:5001/ws");
        assert_eq!(cfg.display.width, 1020);
        assert_eq!(cfg.display.height, 600);
        assert_eq!(cfg.display.target_fps, 60);
        assert_eq!(cfg.trail_capacity, 100);
        assert_eq!(cfg.speed.min, 1);
        assert_eq!(cfg.speed.max, 10);
        assert_eq!(cfg.speed.initial, 1);
        assert_eq!(cfg.track.wall_height, 12);
        assert_eq!(cfg.track.car_height, 6);
        assert_eq!(cfg.track.outer_radius, 200.0);
    }

    #[test]
    fn test_partial_yaml() {
        let yaml = "server:\n  url: ws://race.local:9000/ws\ntrack:\n  wall_height: 8\n";
        let cfg: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(cfg.server.url, "ws://race.local:9000/ws");
        assert_eq!(cfg.track.wall_height, 8);
        assert_eq!(cfg.track.inner_radius, 100.0); // default
        assert_eq!(cfg.trail_capacity, 100); // default
        assert_eq!(cfg.display.width, 1020); // default
    }

    #[test]
    fn test_full_yaml() {
        let yaml = r#"
server:
  url: ws://10.0.0.2:5001/ws
display:
  width: 1280
  height: 720
  target_fps: 30
track:
  wall_height: 10
  car_height: 4
  center_left: [250.0, 300.0]
  center_right: [550.0, 300.0]
  outer_radius: 180.0
  inner_radius: 90.0
  lane_radius: 135.0
trail_capacity: 50
speed:
  min: 1
  max: 20
  initial: 5
"#;
        let cfg: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(cfg.server.url, "ws://10.0.0.2:5001/ws");
        assert_eq!(cfg.display.width, 1280);
        assert_eq!(cfg.display.height, 720);
        assert_eq!(cfg.display.target_fps, 30);
        assert_eq!(cfg.track.wall_height, 10);
        assert_eq!(cfg.track.car_height, 4);
        assert_eq!(cfg.track.center_left, (250.0, 300.0));
        assert_eq!(cfg.track.center_right, (550.0, 300.0));
        assert_eq!(cfg.track.outer_radius, 180.0);
        assert_eq!(cfg.track.inner_radius, 90.0);
        assert_eq!(cfg.track.lane_radius, 135.0);
        assert_eq!(cfg.trail_capacity, 50);
        assert_eq!(cfg.speed.max, 20);
        assert_eq!(cfg.speed.initial, 5);
    }

    #[test]
    fn test_load_missing_file() {
        let cfg = load(Some(Path::new("/nonexistent/raceview.yaml")));
        assert_eq!(cfg.server.url, "ws://127.0.0.1:5001/ws");
        assert_eq!(cfg.trail_capacity, 100);
    }

    #[test]
    fn test_load_invalid_yaml_falls_back() {
        let path = std::env::temp_dir().join(format!("raceview-bad-{}.yaml", std::process::id()));
        std::fs::write(&path, "trail_capacity: [not, a, number]\n").unwrap();
        let cfg = load(Some(&path));
        let _ = std::fs::remove_file(&path);
        assert_eq!(cfg.trail_capacity, 100);
    }
}
