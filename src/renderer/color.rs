/// Page background, also used to cut out the infield.
pub const BACKGROUND: [u8; 3] = [0xE0, 0xE5, 0xEC];
/// Track surface and cockpit.
pub const ASPHALT: [u8; 3] = [0x2D, 0x34, 0x36];
/// Topmost wall layer.
pub const WALL_TOP: [u8; 3] = [0xB2, 0xBE, 0xC3];
pub const WHITE: [u8; 3] = [0xFF, 0xFF, 0xFF];
pub const BLACK: [u8; 3] = [0x00, 0x00, 0x00];

/// Telemetry chart series.
pub const DISTANCE_SERIES: [u8; 3] = [0xFF, 0x76, 0x75];
pub const EPSILON_SERIES: [u8; 3] = [0x74, 0xB9, 0xFF];

/// Parse `#RRGGBB` or `#RGB` (leading `#` optional).
pub fn parse_hex(s: &str) -> Option<[u8; 3]> {
    let hex = s.trim().strip_prefix('#').unwrap_or(s.trim());
    // from_str_radix alone would take a sign
    if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    match hex.len() {
        6 => {
            let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
            let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
            let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
            Some([r, g, b])
        }
        3 => {
            let mut out = [0u8; 3];
            for (i, c) in hex.chars().enumerate() {
                let v = c.to_digit(16)? as u8;
                out[i] = v * 17;
            }
            Some(out)
        }
        _ => None,
    }
}

/// HSL to RGB. `h` in degrees, `s` and `l` in [0, 1].
pub fn hsl_to_rgb(h: f64, s: f64, l: f64) -> [u8; 3] {
    let h = h.rem_euclid(360.0) / 60.0;
    let s = s.clamp(0.0, 1.0);
    let l = l.clamp(0.0, 1.0);
    let c = (1.0 - (2.0 * l - 1.0).abs()) * s;
    let x = c * (1.0 - (h % 2.0 - 1.0).abs());
    let (r, g, b) = match h as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    let m = l - c / 2.0;
    [
        ((r + m) * 255.0).round() as u8,
        ((g + m) * 255.0).round() as u8,
        ((b + m) * 255.0).round() as u8,
    ]
}

/// Scale every channel by `factor`, saturating at 255.
pub fn brightness(c: [u8; 3], factor: f64) -> [u8; 3] {
    [
        (c[0] as f64 * factor).clamp(0.0, 255.0) as u8,
        (c[1] as f64 * factor).clamp(0.0, 255.0) as u8,
        (c[2] as f64 * factor).clamp(0.0, 255.0) as u8,
    ]
}

/// Grey for wall layer `h`: light on top, darker shades rising with height below.
pub fn wall_shade(h: u32, wall_height: u32) -> [u8; 3] {
    if h + 1 >= wall_height {
        WALL_TOP
    } else {
        let v = (100 + 5 * h).min(255) as u8;
        [v, v, v]
    }
}
