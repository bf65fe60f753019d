//! Glue between controls, the animation driver and the active backend.
//!
//! Controls flow one way: a [`ControlMsg`] produces a new [`ControlState`]
//! snapshot, and each frame reads controls and phase together into a
//! [`FrameParams`] before the backend runs.

use crate::animation::AnimationDriver;
use crate::controls::{BreakpointTier, ControlMsg, ControlState};
use crate::mapping::{
    MappingRanges, frequency_scalar, grid_size, resolution_value_to_cell_size, speed_scalar,
};
use crate::visual::{Backend, FrameParams};

/// Receives the one-shot "first frame is on screen" signal.
pub trait ReadySink {
    fn report_ready(&mut self, ready: bool);
}

impl<F: FnMut(bool)> ReadySink for F {
    fn report_ready(&mut self, ready: bool) {
        self(ready)
    }
}

pub struct Session {
    controls: ControlState,
    ranges: MappingRanges,
    driver: AnimationDriver,
    surface: (usize, usize),
    tier: Option<BreakpointTier>,
    seed_from_breakpoint: bool,
    ready: bool,
}

impl Session {
    pub fn new(controls: ControlState, ranges: MappingRanges) -> Self {
        Self {
            controls,
            ranges,
            driver: AnimationDriver::new(),
            surface: (0, 0),
            tier: None,
            seed_from_breakpoint: true,
            ready: false,
        }
    }

    /// Keep the given controls instead of seeding them from the first
    /// observed surface width.
    #[must_use]
    pub fn with_pinned_controls(mut self) -> Self {
        self.seed_from_breakpoint = false;
        self
    }

    pub fn controls(&self) -> ControlState {
        self.controls
    }

    pub fn ranges(&self) -> &MappingRanges {
        &self.ranges
    }

    pub fn driver(&self) -> &AnimationDriver {
        &self.driver
    }

    pub fn driver_mut(&mut self) -> &mut AnimationDriver {
        &mut self.driver
    }

    pub fn phase(&self) -> f64 {
        self.driver.phase()
    }

    pub fn surface(&self) -> (usize, usize) {
        self.surface
    }

    pub fn tier(&self) -> Option<BreakpointTier> {
        self.tier
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn dispatch(&mut self, msg: ControlMsg) {
        self.controls = self.controls.apply(msg);
        if msg.resets_phase() {
            self.driver.reset_phase();
        }
    }

    /// Record the current surface size. The first positive width seeds
    /// resolution and frequency from its breakpoint tier.
    pub fn observe_surface(&mut self, w: usize, h: usize) {
        self.surface = (w, h);
        if w == 0 {
            return;
        }
        let tier = BreakpointTier::from_width(w);
        if self.tier.is_none() && self.seed_from_breakpoint {
            let seed = tier.defaults();
            self.controls = self
                .controls
                .with_resolution(seed.resolution)
                .with_frequency(seed.frequency);
            log::info!(
                "seeded controls from {} breakpoint (width {w})",
                tier.label()
            );
        }
        self.tier = Some(tier);
    }

    pub fn cell_size(&self) -> f32 {
        resolution_value_to_cell_size(self.controls.resolution, &self.ranges)
    }

    pub fn frequency_scalar(&self) -> f64 {
        frequency_scalar(self.controls.frequency, &self.ranges)
    }

    pub fn speed_scalar(&self) -> f32 {
        speed_scalar(self.controls.speed, &self.ranges)
    }

    /// Snapshot for the next frame, or `None` while the surface is degenerate.
    pub fn frame_params(&self) -> Option<FrameParams> {
        let (w, h) = self.surface;
        if w == 0 || h == 0 {
            return None;
        }
        let (columns, rows) = grid_size(w, h, self.cell_size());
        Some(FrameParams {
            frequency_scalar: self.frequency_scalar() as f32,
            phase: self.driver.phase() as f32,
            palette: self.controls.palette,
            columns,
            rows,
        })
    }

    /// Render one frame. Reports ready exactly once, on the first frame that
    /// produced pixels.
    pub fn render_frame<'b>(
        &mut self,
        backend: &'b mut Backend,
        sink: &mut dyn ReadySink,
    ) -> Option<(FrameParams, &'b [u8])> {
        let params = self.frame_params()?;
        let pixels = backend.render_frame(&params)?;
        if !self.ready {
            self.ready = true;
            sink.report_ready(true);
        }
        Some((params, pixels))
    }

    /// Advance the phase by one tick at the current mapped speed.
    pub fn advance(&mut self) -> f64 {
        let speed = self.speed_scalar();
        self.driver.tick(speed)
    }
}
