//! iTerm2 inline-image output for `--headless`.
//!
//! Frames go out as uncompressed RGB PNGs (stored deflate blocks), which
//! keeps per-frame CPU low enough for a live viewer.

use std::io::{self, Write};

use base64::Engine;

const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
const STORED_BLOCK_MAX: usize = 65535;
/// 8-bit truecolor, no alpha. The renderer always writes opaque pixels.
const COLOR_TYPE_RGB: u8 = 2;

const fn make_crc_table() -> [u32; 256] {
    let mut table = [0u32; 256];
    let mut n = 0;
    while n < 256 {
        let mut c = n as u32;
        let mut k = 0;
        while k < 8 {
            c = if c & 1 != 0 { 0xEDB88320 ^ (c >> 1) } else { c >> 1 };
            k += 1;
        }
        table[n] = c;
        n += 1;
    }
    table
}

static CRC_TABLE: [u32; 256] = make_crc_table();

fn crc32(data: &[u8]) -> u32 {
    !data
        .iter()
        .fold(0xFFFF_FFFFu32, |crc, &b| CRC_TABLE[((crc ^ b as u32) & 0xFF) as usize] ^ (crc >> 8))
}

fn adler32(data: &[u8]) -> u32 {
    const MOD: u32 = 65521;
    // largest run before `b` can overflow
    const NMAX: usize = 5552;
    let (mut a, mut b) = (1u32, 0u32);
    for chunk in data.chunks(NMAX) {
        for &byte in chunk {
            a += byte as u32;
            b += a;
        }
        a %= MOD;
        b %= MOD;
    }
    (b << 16) | a
}

fn chunk(out: &mut Vec<u8>, kind: &[u8; 4], data: &[u8]) {
    out.extend_from_slice(&(data.len() as u32).to_be_bytes());
    let start = out.len();
    out.extend_from_slice(kind);
    out.extend_from_slice(data);
    let crc = crc32(&out[start..]);
    out.extend_from_slice(&crc.to_be_bytes());
}

/// Reusable buffers for turning RGBA frames into escape sequences.
#[derive(Default)]
pub struct Iterm2Encoder {
    scanlines: Vec<u8>,
    zlib: Vec<u8>,
    png: Vec<u8>,
    b64: String,
    seq: Vec<u8>,
}

impl Iterm2Encoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Filtered scanlines: a `None` filter byte then RGB per row.
    fn fill_scanlines(&mut self, rgba: &[u8], width: usize, height: usize) {
        self.scanlines.clear();
        self.scanlines.reserve(height * (1 + width * 3));
        for row in rgba.chunks_exact(width * 4).take(height) {
            self.scanlines.push(0);
            for px in row.chunks_exact(4) {
                self.scanlines.extend_from_slice(&px[..3]);
            }
        }
    }

    /// zlib stream made of stored deflate blocks.
    fn fill_zlib(&mut self) {
        self.zlib.clear();
        self.zlib.extend_from_slice(&[0x78, 0x01]);
        let mut blocks = self.scanlines.chunks(STORED_BLOCK_MAX).peekable();
        while let Some(block) = blocks.next() {
            let last = blocks.peek().is_none();
            let len = block.len() as u16;
            self.zlib.push(u8::from(last));
            self.zlib.extend_from_slice(&len.to_le_bytes());
            self.zlib.extend_from_slice(&(!len).to_le_bytes());
            self.zlib.extend_from_slice(block);
        }
        self.zlib.extend_from_slice(&adler32(&self.scanlines).to_be_bytes());
    }

    fn fill_png(&mut self, width: usize, height: usize) {
        let mut ihdr = [0u8; 13];
        ihdr[0..4].copy_from_slice(&(width as u32).to_be_bytes());
        ihdr[4..8].copy_from_slice(&(height as u32).to_be_bytes());
        ihdr[8] = 8;
        ihdr[9] = COLOR_TYPE_RGB;

        self.png.clear();
        self.png.extend_from_slice(&PNG_SIGNATURE);
        chunk(&mut self.png, b"IHDR", &ihdr);
        chunk(&mut self.png, b"IDAT", &self.zlib);
        chunk(&mut self.png, b"IEND", &[]);
    }

    /// Encode one frame. `width`/`height` are the buffer dimensions;
    /// `disp_w`/`disp_h` are the on-screen pixel size the terminal scales to.
    pub fn encode(&mut self, rgba: &[u8], width: usize, height: usize, disp_w: usize, disp_h: usize) -> io::Result<&[u8]> {
        if width == 0 || height == 0 || rgba.len() < width * height * 4 {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "frame buffer does not match dimensions"));
        }
        self.fill_scanlines(rgba, width, height);
        self.fill_zlib();
        self.fill_png(width, height);

        self.b64.clear();
        base64::engine::general_purpose::STANDARD.encode_string(&self.png, &mut self.b64);

        self.seq.clear();
        write!(
            self.seq,
            "\x1b]1337;File=inline=1;size={};width={}px;height={}px;preserveAspectRatio=0:{}\x07",
            self.png.len(),
            disp_w,
            disp_h,
            self.b64,
        )?;
        Ok(&self.seq)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(width: usize, height: usize) -> Vec<u8> {
        let mut rgba = vec![255u8; width * height * 4];
        for y in 0..height {
            for x in 0..width {
                let i = (y * width + x) * 4;
                rgba[i] = (x * 255 / width.max(1)) as u8;
                rgba[i + 1] = (y * 255 / height.max(1)) as u8;
                rgba[i + 2] = 0x55;
            }
        }
        rgba
    }

    fn payload(seq: &[u8]) -> Vec<u8> {
        let s = std::str::from_utf8(seq).unwrap();
        let colon = s.rfind(':').unwrap();
        base64::engine::general_purpose::STANDARD
            .decode(&s[colon + 1..s.len() - 1])
            .unwrap()
    }

    #[test]
    fn test_escape_sequence_framing() {
        let mut enc = Iterm2Encoder::new();
        let seq = enc.encode(&gradient(32, 16), 32, 16, 640, 320).unwrap();
        assert!(seq.starts_with(b"\x1b]1337;File=inline=1;"));
        assert_eq!(seq.last(), Some(&0x07));
        let s = std::str::from_utf8(seq).unwrap();
        assert!(s.contains("width=640px") && s.contains("height=320px"));
        assert!(!s.contains("width=32px"), "display size, not buffer size");
    }

    #[test]
    fn test_png_decodes_to_same_rgb() {
        let (w, h) = (40, 30);
        let rgba = gradient(w, h);
        let mut enc = Iterm2Encoder::new();
        let png_bytes = payload(enc.encode(&rgba, w, h, w, h).unwrap());

        let decoder = png::Decoder::new(std::io::Cursor::new(&png_bytes));
        let mut reader = decoder.read_info().unwrap();
        assert_eq!(reader.info().width, w as u32);
        assert_eq!(reader.info().height, h as u32);
        assert_eq!(reader.info().color_type, png::ColorType::Rgb);
        let mut out = vec![0u8; reader.output_buffer_size()];
        reader.next_frame(&mut out).unwrap();
        for i in 0..w * h {
            assert_eq!(out[i * 3..i * 3 + 3], rgba[i * 4..i * 4 + 3], "pixel {i}");
        }
    }

    #[test]
    fn test_multi_block_frame_decodes() {
        // > 65535 bytes of scanlines forces several stored blocks
        let (w, h) = (200, 150);
        let rgba = gradient(w, h);
        let mut enc = Iterm2Encoder::new();
        let png_bytes = payload(enc.encode(&rgba, w, h, w, h).unwrap());
        let mut reader = png::Decoder::new(std::io::Cursor::new(&png_bytes)).read_info().unwrap();
        let mut out = vec![0u8; reader.output_buffer_size()];
        reader.next_frame(&mut out).unwrap();
        let last = w * h - 1;
        assert_eq!(out[last * 3..last * 3 + 3], rgba[last * 4..last * 4 + 3]);
    }

    #[test]
    fn test_buffers_reused_across_sizes() {
        let mut enc = Iterm2Encoder::new();
        let small = enc.encode(&gradient(8, 6), 8, 6, 8, 6).unwrap().len();
        let large = enc.encode(&gradient(16, 12), 16, 12, 16, 12).unwrap().len();
        assert!(large > small);
    }

    #[test]
    fn test_short_buffer_rejected() {
        let mut enc = Iterm2Encoder::new();
        assert!(enc.encode(&[0u8; 16], 4, 4, 4, 4).is_err());
        assert!(enc.encode(&[], 0, 0, 4, 4).is_err());
    }

    #[test]
    fn test_checksums() {
        assert_eq!(crc32(&[]), 0);
        assert_eq!(crc32(b"123456789"), 0xCBF43926);
        assert_eq!(adler32(&[]), 1);
        assert_eq!(adler32(b"Wikipedia"), 0x11E60398);
    }
}
