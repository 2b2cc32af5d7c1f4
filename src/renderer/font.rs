pub(crate) const FONT_WIDTH: usize = 5;
pub(crate) const FONT_HEIGHT: usize = 7;

/// 5x7 glyphs for the characters the HUD prints, sorted by byte.
/// Rows top to bottom, bit 4 is the leftmost column.
const GLYPHS: [(u8, [u8; FONT_HEIGHT]); 38] = [
    (b' ', [0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00]),
    (b'-', [0x00, 0x00, 0x00, 0x1F, 0x00, 0x00, 0x00]),
    (b'.', [0x00, 0x00, 0x00, 0x00, 0x00, 0x04, 0x00]),
    (b'0', [0x0E, 0x11, 0x13, 0x15, 0x19, 0x11, 0x0E]),
    (b'1', [0x04, 0x0C, 0x04, 0x04, 0x04, 0x04, 0x0E]),
    (b'2', [0x0E, 0x11, 0x01, 0x02, 0x04, 0x08, 0x1F]),
    (b'3', [0x0E, 0x11, 0x01, 0x06, 0x01, 0x11, 0x0E]),
    (b'4', [0x02, 0x06, 0x0A, 0x12, 0x1F, 0x02, 0x02]),
    (b'5', [0x1F, 0x10, 0x1E, 0x01, 0x01, 0x11, 0x0E]),
    (b'6', [0x06, 0x08, 0x10, 0x1E, 0x11, 0x11, 0x0E]),
    (b'7', [0x1F, 0x01, 0x02, 0x04, 0x08, 0x08, 0x08]),
    (b'8', [0x0E, 0x11, 0x11, 0x0E, 0x11, 0x11, 0x0E]),
    (b'9', [0x0E, 0x11, 0x11, 0x0F, 0x01, 0x02, 0x0C]),
    (b'=', [0x00, 0x00, 0x1F, 0x00, 0x1F, 0x00, 0x00]),
    (b'?', [0x0E, 0x11, 0x01, 0x02, 0x04, 0x00, 0x04]),
    (b'a', [0x00, 0x00, 0x0E, 0x01, 0x0F, 0x11, 0x0F]),
    (b'b', [0x10, 0x10, 0x16, 0x19, 0x11, 0x11, 0x1E]),
    (b'c', [0x00, 0x00, 0x0E, 0x10, 0x10, 0x11, 0x0E]),
    (b'd', [0x01, 0x01, 0x0D, 0x13, 0x11, 0x11, 0x0F]),
    (b'e', [0x00, 0x00, 0x0E, 0x11, 0x1F, 0x10, 0x0E]),
    (b'f', [0x06, 0x09, 0x08, 0x1C, 0x08, 0x08, 0x08]),
    (b'g', [0x00, 0x00, 0x0F, 0x11, 0x0F, 0x01, 0x0E]),
    (b'h', [0x10, 0x10, 0x16, 0x19, 0x11, 0x11, 0x11]),
    (b'i', [0x04, 0x00, 0x0C, 0x04, 0x04, 0x04, 0x0E]),
    (b'l', [0x0C, 0x04, 0x04, 0x04, 0x04, 0x04, 0x0E]),
    (b'm', [0x00, 0x00, 0x1A, 0x15, 0x15, 0x11, 0x11]),
    (b'n', [0x00, 0x00, 0x16, 0x19, 0x11, 0x11, 0x11]),
    (b'o', [0x00, 0x00, 0x0E, 0x11, 0x11, 0x11, 0x0E]),
    (b'p', [0x00, 0x00, 0x1E, 0x11, 0x1E, 0x10, 0x10]),
    (b'r', [0x00, 0x00, 0x16, 0x19, 0x10, 0x10, 0x10]),
    (b's', [0x00, 0x00, 0x0E, 0x10, 0x0E, 0x01, 0x1E]),
    (b't', [0x08, 0x08, 0x1C, 0x08, 0x08, 0x09, 0x06]),
    (b'u', [0x00, 0x00, 0x11, 0x11, 0x11, 0x13, 0x0D]),
    (b'v', [0x00, 0x00, 0x11, 0x11, 0x11, 0x0A, 0x04]),
    (b'w', [0x00, 0x00, 0x11, 0x11, 0x15, 0x15, 0x0A]),
    (b'x', [0x00, 0x00, 0x11, 0x0A, 0x04, 0x0A, 0x11]),
    (b'y', [0x00, 0x00, 0x11, 0x11, 0x0F, 0x01, 0x0E]),
    (b'|', [0x04, 0x04, 0x04, 0x04, 0x04, 0x04, 0x04]),
];

/// Unknown bytes render as blanks.
fn glyph(ch: u8) -> [u8; FONT_HEIGHT] {
    match GLYPHS.binary_search_by_key(&ch, |&(c, _)| c) {
        Ok(i) => GLYPHS[i].1,
        Err(_) => [0; FONT_HEIGHT],
    }
}

/// Glyph cell size in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct TextSize {
    pub w: usize,
    pub h: usize,
}

impl TextSize {
    pub const BASE: TextSize = TextSize { w: FONT_WIDTH, h: FONT_HEIGHT };

    /// Horizontal advance: glyph plus about a fifth of its width.
    pub fn advance(self) -> usize {
        self.w + self.w / 5 + 1
    }
}

/// Nearest-neighbour blit of one glyph. Pixels at or right of `right`
/// are dropped so text never wraps onto the next row.
fn blit(buf: &mut [u8], frame_width: usize, x: usize, y: usize, ch: u8, color: [u8; 3], size: TextSize, right: usize) {
    let rows = glyph(ch);
    let right = right.min(frame_width);
    for py in 0..size.h {
        let bits = rows[py * FONT_HEIGHT / size.h];
        let row_off = (y + py) * frame_width;
        for px in 0..size.w {
            let x = x + px;
            if x >= right {
                break;
            }
            if bits & (0x10 >> (px * FONT_WIDTH / size.w)) == 0 {
                continue;
            }
            let off = (row_off + x) * 4;
            if let Some(p) = buf.get_mut(off..off + 4) {
                p.copy_from_slice(&[color[0], color[1], color[2], 255]);
            }
        }
    }
}

/// Text at `size`, clipped at `right`. Returns the pen position after the
/// last character.
pub(crate) fn draw_text_clipped(buf: &mut [u8], frame_width: usize, x: usize, y: usize, text: &str, color: [u8; 3], size: TextSize, right: usize) -> usize {
    let mut pen = x;
    for &ch in text.as_bytes() {
        if pen >= right.min(frame_width) {
            break;
        }
        blit(buf, frame_width, pen, y, ch, color, size, right);
        pen += size.advance();
    }
    pen
}

pub(crate) fn draw_text_sized(buf: &mut [u8], frame_width: usize, x: usize, y: usize, text: &str, color: [u8; 3], size: TextSize) -> usize {
    draw_text_clipped(buf, frame_width, x, y, text, color, size, frame_width)
}

pub(crate) fn draw_text(buf: &mut [u8], frame_width: usize, x: usize, y: usize, text: &str, color: [u8; 3]) -> usize {
    draw_text_sized(buf, frame_width, x, y, text, color, TextSize::BASE)
}
