//! Converts normalized (0..1) controls into the quantities the renderer consumes.

/// Bounds for every control mapping. These are tunables, not invariants.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MappingRanges {
    pub cell_min: f32,
    pub cell_max: f32,
    pub frequency_base: f64,
    pub speed_min: f32,
    pub speed_max: f32,
}

impl Default for MappingRanges {
    fn default() -> Self {
        Self {
            cell_min: 1.0,
            cell_max: 12.0,
            frequency_base: 2f64.powi(20),
            speed_min: 0.0,
            speed_max: 0.05,
        }
    }
}

impl MappingRanges {
    fn cell_range(&self) -> f32 {
        (self.cell_max - self.cell_min).max(f32::EPSILON)
    }
}

// Inputs above this are compressed onto [FREQ_KNEE, FREQ_CEIL] to keep the
// top of the slider from aliasing against the pixel grid.
const FREQ_KNEE: f64 = 0.95;
const FREQ_CEIL: f64 = 0.99;

fn unit(v: f32) -> f32 {
    if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) }
}

/// Higher resolution values give smaller cells.
pub fn resolution_value_to_cell_size(value: f32, ranges: &MappingRanges) -> f32 {
    let v = unit(value);
    (ranges.cell_max - v * ranges.cell_range()).clamp(ranges.cell_min, ranges.cell_max)
}

pub fn cell_size_to_resolution_value(cell_size: f32, ranges: &MappingRanges) -> f32 {
    let cell = cell_size.clamp(ranges.cell_min, ranges.cell_max);
    unit((ranges.cell_max - cell) / ranges.cell_range())
}

/// Exponential frequency: `base^f - 1`, with the top 5% of the input squeezed.
pub fn frequency_scalar(value: f32, ranges: &MappingRanges) -> f64 {
    let mut f = unit(value) as f64;
    if f == 0.0 {
        return 0.0;
    }
    if f > FREQ_KNEE {
        let overage = (f - FREQ_KNEE) / (1.0 - FREQ_KNEE);
        f = FREQ_KNEE + overage * (FREQ_CEIL - FREQ_KNEE);
    }
    ranges.frequency_base.powf(f) - 1.0
}

/// Phase units advanced per animation tick.
pub fn speed_scalar(value: f32, ranges: &MappingRanges) -> f32 {
    ranges.speed_min + unit(value) * (ranges.speed_max - ranges.speed_min)
}

/// Columns and rows of the pattern grid covering a surface with square cells.
pub fn grid_size(surface_w: usize, surface_h: usize, cell_size: f32) -> (usize, usize) {
    if surface_w == 0 || surface_h == 0 {
        return (0, 0);
    }
    let cell = cell_size.max(f32::EPSILON) as f64;
    let cols = (surface_w as f64 / cell).ceil() as usize;
    let rows = (surface_h as f64 / cell).ceil() as usize;
    (cols.max(1), rows.max(1))
}
