use super::palette::PaletteSet;
use super::pattern::{lut_index, pattern, progress_table};
use super::{FrameParams, stretch_nearest};

/// Pixel count above which the CPU path renders at reduced resolution.
pub const DEFAULT_PIXEL_BUDGET: usize = 1_000_000;

/// Integer downsample factor for a `w`x`h` grid: 1 at or under `budget`,
/// otherwise `ceil(sqrt(pixels / budget))`.
pub fn downsample_scale(w: usize, h: usize, budget: usize) -> usize {
    let total = w.saturating_mul(h);
    let budget = budget.max(1);
    if total <= budget {
        return 1;
    }
    ((total as f64 / budget as f64).sqrt().ceil() as usize).max(1)
}

/// Dimensions actually rendered for a grid at `scale`, each at least 1.
pub fn draw_size(w: usize, h: usize, scale: usize) -> (usize, usize) {
    let scale = scale.max(1);
    ((w / scale).max(1), (h / scale).max(1))
}

/// Per-size arena: radial progress table plus the pixel buffer it feeds.
/// Replaced wholesale whenever the draw size changes.
struct ProgressCache {
    key: (usize, usize),
    progress: Vec<f32>,
    pixels: Vec<u8>,
    generation: u64,
}

impl ProgressCache {
    fn empty() -> Self {
        Self {
            key: (0, 0),
            progress: Vec::new(),
            pixels: Vec::new(),
            generation: 0,
        }
    }

    fn ensure(&mut self, w: usize, h: usize) {
        if self.key == (w, h) {
            return;
        }
        self.progress = progress_table(w, h);
        self.pixels = vec![0u8; w * h * 4];
        self.key = (w, h);
        self.generation += 1;
    }
}

pub struct CpuBackend {
    palettes: &'static PaletteSet,
    pixel_budget: usize,
    cache: ProgressCache,
    scale: usize,
    out: Vec<u8>,
    out_w: usize,
    out_h: usize,
}

impl CpuBackend {
    pub fn new(pixel_budget: usize) -> Self {
        Self {
            palettes: PaletteSet::builtin(),
            pixel_budget: pixel_budget.max(1),
            cache: ProgressCache::empty(),
            scale: 1,
            out: Vec::new(),
            out_w: 0,
            out_h: 0,
        }
    }

    pub fn pixel_budget(&self) -> usize {
        self.pixel_budget
    }

    /// Downsample factor used by the most recent frame.
    pub fn scale(&self) -> usize {
        self.scale
    }

    /// Size of the internal render buffer (post-downsample).
    pub fn draw_size(&self) -> (usize, usize) {
        self.cache.key
    }

    /// Bumps each time the progress/pixel buffers are reallocated.
    pub fn cache_generation(&self) -> u64 {
        self.cache.generation
    }

    pub fn progress_table(&self) -> &[f32] {
        &self.cache.progress
    }

    pub fn render_frame(&mut self, params: &FrameParams) -> Option<&[u8]> {
        let (cols, rows) = (params.columns, params.rows);
        if cols == 0 || rows == 0 {
            return None;
        }

        self.scale = downsample_scale(cols, rows, self.pixel_budget);
        let (dw, dh) = draw_size(cols, rows, self.scale);
        self.cache.ensure(dw, dh);

        let palettes = self.palettes;
        let lut = palettes.get_or_default(params.palette);
        let frequency = params.frequency_scalar;
        let phase = params.phase;
        for (px, &p) in self
            .cache
            .pixels
            .chunks_exact_mut(4)
            .zip(self.cache.progress.iter())
        {
            let c = lut.color(lut_index(pattern(p, frequency, phase)));
            px[0] = c[0];
            px[1] = c[1];
            px[2] = c[2];
            px[3] = 255;
        }

        if dw == cols && dh == rows {
            return Some(self.cache.pixels.as_slice());
        }

        if self.out_w != cols || self.out_h != rows {
            self.out.resize(cols * rows * 4, 0);
            self.out_w = cols;
            self.out_h = rows;
        }
        stretch_nearest(&self.cache.pixels, dw, dh, &mut self.out, cols, rows);
        Some(self.out.as_slice())
    }

    pub fn teardown(&mut self) {
        let generation = self.cache.generation;
        self.cache = ProgressCache::empty();
        self.cache.generation = generation;
        self.out = Vec::new();
        self.out_w = 0;
        self.out_h = 0;
    }
}
