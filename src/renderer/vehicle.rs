use super::canvas::{Canvas, Point, Transform};
use super::color::{self, ASPHALT, BLACK, WHITE};
use crate::protocol::VehicleSnapshot;

/// Ray length that counts as "nothing hit".
pub const SENSOR_RANGE: f64 = 200.0;
/// Rays shorter than `SENSOR_RANGE - HIT_MARGIN` get a hit marker.
const HIT_MARGIN: f64 = 5.0;
const RAY_WIDTH: f64 = 1.5;
const RAY_ALPHA_NEAR: f64 = 0.1;
const RAY_ALPHA_FAR: f64 = 0.8;
const MARKER_RING_RADIUS: f64 = 3.0;
const MARKER_DOT_RADIUS: f64 = 1.5;
const MARKER_GLOW_RADIUS: f64 = 10.0;

const SHADOW: [Point; 3] = [(12.0, 0.0), (-10.0, 8.0), (-10.0, -8.0)];
const SHADOW_ALPHA: f64 = 0.2;
const BODY: [Point; 3] = [(14.0, 0.0), (-6.0, 8.0), (-6.0, -8.0)];
/// Per-layer shrink of the body.
const TAPER: f64 = 0.03;
const SIDE_BRIGHTNESS: f64 = 0.7;
const TOP_BRIGHTNESS: f64 = 1.1;
const COCKPIT: [Point; 3] = [(4.0, 0.0), (-2.0, 3.0), (-2.0, -3.0)];

/// Ray hue in degrees: red when touching a wall, green at full range.
pub fn sensor_hue(distance: f64) -> f64 {
    (distance / SENSOR_RANGE).clamp(0.0, 1.0) * 120.0
}

/// Sensor fan, drop shadow, layered body and cockpit, all in the car's
/// local frame. Dead cars draw nothing.
pub fn draw_vehicle(canvas: &mut Canvas, car: &VehicleSnapshot, car_height: u32) {
    if !car.alive {
        return;
    }
    let base = canvas.transform;
    let local = base.translate(car.x, car.y).rotate(car.angle);

    canvas.transform = local;
    for &(distance, angle) in &car.sensors {
        draw_sensor(canvas, distance, angle);
    }

    canvas.fill_polygon(&SHADOW, BLACK, SHADOW_ALPHA);
    for h in 0..car_height {
        let top = h + 1 == car_height;
        canvas.transform = layer_transform(local, h);
        let shade = if top { TOP_BRIGHTNESS } else { SIDE_BRIGHTNESS };
        canvas.fill_polygon(&BODY, color::brightness(car.color, shade), 1.0);
    }
    canvas.transform = local.translate(0.0, -(car_height as f64));
    canvas.fill_polygon(&COCKPIT, ASPHALT, 1.0);

    canvas.transform = base;
}

/// Body layer `h`: lifted along local -y, then tapered.
fn layer_transform(local: Transform, h: u32) -> Transform {
    local.translate(0.0, -(h as f64)).scale(1.0 - TAPER * h as f64)
}

fn draw_sensor(canvas: &mut Canvas, distance: f64, angle: f64) {
    let end = (angle.cos() * distance, angle.sin() * distance);
    let ray = color::hsl_to_rgb(sensor_hue(distance), 1.0, 0.5);
    canvas.stroke_gradient((0.0, 0.0), end, RAY_WIDTH, ray, RAY_ALPHA_NEAR, RAY_ALPHA_FAR);
    if distance < SENSOR_RANGE - HIT_MARGIN {
        canvas.glow(end, MARKER_GLOW_RADIUS, ray, RAY_ALPHA_FAR);
        canvas.stroke_circle(end, MARKER_RING_RADIUS, 1.0, ray, RAY_ALPHA_FAR);
        canvas.fill_circle(end, MARKER_DOT_RADIUS, WHITE, 1.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::canvas::Clip;

    const W: usize = 120;
    const H: usize = 80;

    fn px(buf: &[u8], x: usize, y: usize) -> [u8; 3] {
        let off = (y * W + x) * 4;
        [buf[off], buf[off + 1], buf[off + 2]]
    }

    fn car(alive: bool, sensors: Vec<(f64, f64)>) -> VehicleSnapshot {
        VehicleSnapshot {
            id: 0,
            x: 40.0,
            y: 40.0,
            angle: 0.0,
            color: [0xFF, 0x00, 0x55],
            alive,
            crashed: false,
            sensors,
        }
    }

    fn render(car: &VehicleSnapshot) -> Vec<u8> {
        let mut buf = vec![0u8; W * H * 4];
        let mut c = Canvas::new(&mut buf, W, Clip::new(0, 0, W, H), Transform::IDENTITY);
        c.clear(ASPHALT);
        draw_vehicle(&mut c, car, 6);
        assert_eq!(c.transform, Transform::IDENTITY, "transform must be restored");
        drop(c);
        buf
    }

    #[test]
    fn test_sensor_hue() {
        assert_eq!(sensor_hue(0.0), 0.0);
        assert_eq!(sensor_hue(200.0), 120.0);
        assert_eq!(sensor_hue(300.0), 120.0);
        assert_eq!(sensor_hue(-10.0), 0.0);
        assert_eq!(sensor_hue(100.0), 60.0);
    }

    #[test]
    fn test_dead_vehicle_draws_nothing() {
        let buf = render(&car(false, vec![(50.0, 0.0)]));
        for y in 0..H {
            for x in 0..W {
                assert_eq!(px(&buf, x, y), ASPHALT);
            }
        }
    }

    #[test]
    fn test_top_layer_is_brightened_body_color() {
        let buf = render(&car(true, vec![]));
        // local (-4.5, -4.5): inside the top layer, behind the cockpit
        assert_eq!(px(&buf, 35, 35), [0xFF, 0x00, 0x5D]);
    }

    #[test]
    fn test_cockpit_is_dark() {
        let buf = render(&car(true, vec![]));
        // local (1.5, -5.5) is inside the cockpit lifted by the car height
        assert_eq!(px(&buf, 41, 34), ASPHALT);
    }

    #[test]
    fn test_layer_transform_lifts_in_local_frame() {
        let local = Transform::IDENTITY.translate(10.0, 10.0).rotate(std::f64::consts::FRAC_PI_2);
        let t = layer_transform(local, 2);
        let (x, y) = t.apply((0.0, 0.0));
        // local -y maps to screen +x after a quarter turn
        assert!((x - 12.0).abs() < 1e-9 && (y - 10.0).abs() < 1e-9, "got ({x}, {y})");
        assert!((t.scale_factor() - 0.94).abs() < 1e-9);
    }

    #[test]
    fn test_short_ray_gets_hit_marker() {
        let buf = render(&car(true, vec![(60.0, 0.0)]));
        // white dot at the ray end
        let dot = px(&buf, 100, 40);
        assert!(dot[0] > 200 && dot[1] > 200 && dot[2] > 200, "expected white marker, got {dot:?}");
    }

    #[test]
    fn test_full_range_ray_has_no_marker() {
        let mut long = car(true, vec![(200.0, 0.0)]);
        long.x = -100.0;
        let buf = render(&long);
        // ray ends at x = 100; no dot, only the bright green tail of the gradient
        let end = px(&buf, 99, 40);
        assert!(end[1] > end[0], "tail should be green, got {end:?}");
        assert!(end[2] < 200, "no white marker expected, got {end:?}");
    }
}
