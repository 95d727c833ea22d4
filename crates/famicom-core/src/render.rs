//! Background tile decoder
//!
//! Converts a name table, its attribute bytes and a pattern table into RGBA pixels.
//! Only the static background is drawn: no sprites, no scrolling.

use crate::ppu::Ppu;

/// Output width in pixels
pub const FRAME_WIDTH: usize = 256;
/// Output height in pixels
pub const FRAME_HEIGHT: usize = 240;
/// Pixels per frame
pub const FRAME_PIXELS: usize = FRAME_WIDTH * FRAME_HEIGHT;

/// Offset of the attribute bytes inside a name table
const ATTRIBUTE_OFFSET: usize = 0x3C0;

/// 2C02 output colors as 0xRRGGBB
#[rustfmt::skip]
pub const HARDWARE_PALETTE: [u32; 64] = [
    0x666666, 0x002A88, 0x1412A7, 0x3B00A4, 0x5C007E, 0x6E0040, 0x6C0600, 0x561D00,
    0x333500, 0x0B4800, 0x005200, 0x004F08, 0x00404D, 0x000000, 0x000000, 0x000000,
    0xADADAD, 0x155FD9, 0x4240FF, 0x7527FE, 0xA01ACC, 0xB71E7B, 0xB53120, 0x994E00,
    0x6B6D00, 0x388700, 0x0C9300, 0x008F32, 0x007C8D, 0x000000, 0x000000, 0x000000,
    0xFFFEFF, 0x64B0FF, 0x9290FF, 0xC676FF, 0xF36AFF, 0xFE6ECC, 0xFE8170, 0xEA9E22,
    0xBCBE00, 0x88D800, 0x5CE430, 0x45E082, 0x48CDDE, 0x4F4F4F, 0x000000, 0x000000,
    0xFFFEFF, 0xC0DFFF, 0xD3D2FF, 0xE8C8FF, 0xFBC2FF, 0xFEC4EA, 0xFECCC5, 0xF7D8A5,
    0xE4E594, 0xCFEF96, 0xBDF4AB, 0xB3F3CC, 0xB5EBF2, 0xB8B8B8, 0x000000, 0x000000,
];

/// Hardware palette entry as packed 0xRRGGBBAA
pub fn rgba(index: u8) -> u32 {
    (HARDWARE_PALETTE[usize::from(index & 0x3F)] << 8) | 0xFF
}

/// Background palette resolved to RGBA, taken once per frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FramePalette([u32; 16]);

impl FramePalette {
    /// Resolve the first 16 palette index entries. Entries 4, 8 and C show the
    /// universal background color.
    pub fn snapshot(indexes: &[u8]) -> Self {
        let mut colors = [0; 16];
        for (color, &index) in colors.iter_mut().zip(indexes) {
            *color = rgba(index);
        }
        for entry in [4, 8, 12] {
            colors[entry] = colors[0];
        }
        Self(colors)
    }

    pub fn color(&self, index: u8) -> u32 {
        self.0[usize::from(index & 0x0F)]
    }
}

/// 4-bit background color index at (`x`, `y`)
pub fn color_index(x: usize, y: usize, nametable: &[u8], pattern_table: &[u8]) -> u8 {
    let tile = usize::from(nametable[(x >> 3) + (y >> 3) * 32]);
    let row = tile * 16 + (y & 7);
    let shift = 7 - (x & 7);
    let plane0 = (pattern_table[row] >> shift) & 1;
    let plane1 = (pattern_table[row + 8] >> shift) & 1;

    let attribute = nametable[ATTRIBUTE_OFFSET + (x >> 5) + (y >> 5) * 8];
    let quadrant = ((x & 0x10) >> 3) | ((y & 0x10) >> 2);
    let high = (attribute >> quadrant) & 3;

    (high << 2) | (plane1 << 1) | plane0
}

/// Final color of the background pixel at (`x`, `y`)
pub fn pixel_color(
    x: usize,
    y: usize,
    nametable: &[u8],
    pattern_table: &[u8],
    palette: &FramePalette,
) -> u32 {
    palette.color(color_index(x, y, nametable, pattern_table))
}

/// Decode the first name table into `frame` (256x240, row-major)
pub fn render_background(ppu: &Ppu, frame: &mut [u32]) {
    let palette = FramePalette::snapshot(ppu.palette());
    let nametable = ppu.nametable(0);
    let pattern_table = ppu.background_pattern_table();

    for (y, row) in frame.chunks_exact_mut(FRAME_WIDTH).take(FRAME_HEIGHT).enumerate() {
        for (x, pixel) in row.iter_mut().enumerate() {
            *pixel = pixel_color(x, y, nametable, pattern_table, &palette);
        }
    }
}
