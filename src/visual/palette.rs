use std::sync::OnceLock;

/// Number of entries in every palette lookup table.
pub const LUT_SIZE: usize = 1024;

pub type Rgb = [u8; 3];

/// Named color ramp expressed as ordered control points.
#[derive(Debug, Clone, Copy)]
pub struct PaletteDef {
    pub name: &'static str,
    pub stops: &'static [Rgb],
}

const fn hex(rgb: u32) -> Rgb {
    [(rgb >> 16) as u8, (rgb >> 8) as u8, rgb as u8]
}

// Cool-toned ramp from pale seafoam to deep midnight blue.
const TEAL_NAVY: [Rgb; 12] = [
    hex(0xdcecc9),
    hex(0xb3ddcc),
    hex(0x8acdce),
    hex(0x62bed2),
    hex(0x46aace),
    hex(0x3d91be),
    hex(0x3577ae),
    hex(0x2d5e9e),
    hex(0x24448e),
    hex(0x1c2b7f),
    hex(0x162065),
    hex(0x11174b),
];

// Mako-like: icy mint through cyan to deep indigo.
const MINT_INDIGO: [Rgb; 12] = [
    hex(0xdef5e5),
    hex(0xade3c0),
    hex(0x6cd3ad),
    hex(0x43bbad),
    hex(0x35a1ab),
    hex(0x3487a6),
    hex(0x366da0),
    hex(0x3d5296),
    hex(0x403a75),
    hex(0x35264c),
    hex(0x231526),
    hex(0x0b0405),
];

// Viridis-like: lime yellow to deep purple.
const LIME_PURPLE: [Rgb; 12] = [
    hex(0xfde725),
    hex(0xdce319),
    hex(0xb8de29),
    hex(0x95d840),
    hex(0x73d055),
    hex(0x55c667),
    hex(0x3cbb75),
    hex(0x29af7f),
    hex(0x20a387),
    hex(0x287d8e),
    hex(0x33638d),
    hex(0x440154),
];

const ROSE_VIOLET: [Rgb; 12] = [
    hex(0xf9cdac),
    hex(0xf3aca2),
    hex(0xee8b97),
    hex(0xe96a8d),
    hex(0xdb5087),
    hex(0xb8428c),
    hex(0x973490),
    hex(0x742796),
    hex(0x5e1f88),
    hex(0x4d1a70),
    hex(0x3d1459),
    hex(0x2d0f41),
];

// Rocket-like: soft peach/rose to charcoal red-black.
const PEACH_CHARCOAL: [Rgb; 12] = [
    hex(0xf3e3e8),
    hex(0xeac5c7),
    hex(0xdfa3a6),
    hex(0xd47e87),
    hex(0xc55a68),
    hex(0xb03b4e),
    hex(0x962238),
    hex(0x780e27),
    hex(0x59061c),
    hex(0x3b0515),
    hex(0x21060f),
    hex(0x03051a),
];

// Magma-like: pale yellow through orange/red to near black.
const GOLD_NOIR: [Rgb; 12] = [
    hex(0xfcfdbf),
    hex(0xf7feae),
    hex(0xfdc980),
    hex(0xfd9a6a),
    hex(0xf6765b),
    hex(0xe6554d),
    hex(0xc43c4e),
    hex(0x9c2e5a),
    hex(0x741f59),
    hex(0x4c1452),
    hex(0x260c38),
    hex(0x0b0405),
];

const AMBER_BROWN: [Rgb; 12] = [
    hex(0xfded86),
    hex(0xfde86e),
    hex(0xf9d063),
    hex(0xf5b857),
    hex(0xf0a04b),
    hex(0xeb8a40),
    hex(0xe77235),
    hex(0xe35b2c),
    hex(0xc74e29),
    hex(0x9d4429),
    hex(0x753c2c),
    hex(0x4c3430),
];

/// Built-in palettes, cool to warm. Index 0 is the fallback for unknown indices.
pub const PALETTES: [PaletteDef; 7] = [
    PaletteDef { name: "Teal Navy", stops: &TEAL_NAVY },
    PaletteDef { name: "Mint Indigo", stops: &MINT_INDIGO },
    PaletteDef { name: "Lime Purple", stops: &LIME_PURPLE },
    PaletteDef { name: "Rose Violet", stops: &ROSE_VIOLET },
    PaletteDef { name: "Peach Charcoal", stops: &PEACH_CHARCOAL },
    PaletteDef { name: "Gold Noir", stops: &GOLD_NOIR },
    PaletteDef { name: "Amber Brown", stops: &AMBER_BROWN },
];

pub const PALETTE_COUNT: usize = PALETTES.len();

/// Piecewise-linear sample of `stops` at `t` in [0,1], rounded per channel.
pub fn palette_color(stops: &[Rgb], t: f64) -> Rgb {
    let Some(&last) = stops.last() else {
        return [0, 0, 0];
    };
    let n = stops.len();
    if n == 1 {
        return last;
    }

    let scaled = t.clamp(0.0, 1.0) * (n - 1) as f64;
    let lower = (scaled.floor() as usize).min(n - 1);
    let upper = (lower + 1).min(n - 1);
    let frac = scaled - lower as f64;

    lerp_rgb(stops[lower], stops[upper], frac)
}

fn lerp_rgb(a: Rgb, b: Rgb, t: f64) -> Rgb {
    let ch = |x: u8, y: u8| {
        let v = x as f64 + (y as f64 - x as f64) * t;
        v.round().clamp(0.0, 255.0) as u8
    };
    [ch(a[0], b[0]), ch(a[1], b[1]), ch(a[2], b[2])]
}

/// Expand control points into a `LUT_SIZE` table sampled at `t = i / (LUT_SIZE - 1)`.
pub fn build_lut(stops: &[Rgb]) -> Vec<Rgb> {
    let denom = (LUT_SIZE - 1) as f64;
    (0..LUT_SIZE)
        .map(|i| palette_color(stops, i as f64 / denom))
        .collect()
}

#[derive(Debug, Clone)]
pub struct PaletteLut {
    name: &'static str,
    entries: Vec<Rgb>,
}

impl PaletteLut {
    pub fn from_def(def: &PaletteDef) -> Self {
        Self {
            name: def.name,
            entries: build_lut(def.stops),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn entries(&self) -> &[Rgb] {
        &self.entries
    }

    #[inline]
    pub fn color(&self, index: usize) -> Rgb {
        self.entries[index.min(LUT_SIZE - 1)]
    }

    /// RGBA8 rows for texture upload (alpha fixed at 255).
    pub fn to_rgba(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.entries.len() * 4);
        for c in &self.entries {
            out.extend_from_slice(&[c[0], c[1], c[2], 255]);
        }
        out
    }
}

/// All built-in lookup tables, computed once and shared read-only by every backend.
#[derive(Debug)]
pub struct PaletteSet {
    luts: Vec<PaletteLut>,
}

impl PaletteSet {
    /// An empty `defs` falls back to the built-in palettes so index 0 always exists.
    pub fn from_defs(defs: &[PaletteDef]) -> Self {
        let defs = if defs.is_empty() { &PALETTES[..] } else { defs };
        Self {
            luts: defs.iter().map(PaletteLut::from_def).collect(),
        }
    }

    pub fn builtin() -> &'static PaletteSet {
        static SET: OnceLock<PaletteSet> = OnceLock::new();
        SET.get_or_init(|| PaletteSet::from_defs(&PALETTES))
    }

    pub fn len(&self) -> usize {
        self.luts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.luts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PaletteLut> {
        self.luts.iter()
    }

    /// Selected table, or table 0 when `index` is out of range.
    pub fn get_or_default(&self, index: usize) -> &PaletteLut {
        self.luts.get(index).unwrap_or(&self.luts[0])
    }
}

pub fn palette_name(index: usize) -> &'static str {
    PALETTES.get(index).unwrap_or(&PALETTES[0]).name
}
