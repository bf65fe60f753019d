use crate::visual::palette::PALETTE_COUNT;

/// User-facing control values. Immutable snapshot; mutate through [`ControlState::apply`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlState {
    pub resolution: f32,
    pub frequency: f32,
    pub speed: f32,
    pub palette: usize,
}

impl Default for ControlState {
    fn default() -> Self {
        let seed = BreakpointTier::Xl.defaults();
        Self {
            resolution: seed.resolution,
            frequency: seed.frequency,
            speed: 0.2,
            palette: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControlMsg {
    SetResolution(f32),
    SetFrequency(f32),
    SetSpeed(f32),
    SetPalette(usize),
    NudgeResolution(f32),
    NudgeFrequency(f32),
    NudgeSpeed(f32),
    CyclePalette(i32),
}

impl ControlMsg {
    /// Frequency changes restart the phase so a large accumulated phase
    /// doesn't jump visibly against the new base frequency.
    pub fn resets_phase(self) -> bool {
        matches!(self, Self::SetFrequency(_) | Self::NudgeFrequency(_))
    }
}

fn clamp_unit(v: f32) -> f32 {
    if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) }
}

fn clamp_palette(index: usize) -> usize {
    if index < PALETTE_COUNT { index } else { 0 }
}

impl ControlState {
    pub fn new(resolution: f32, frequency: f32, speed: f32, palette: usize) -> Self {
        Self {
            resolution: clamp_unit(resolution),
            frequency: clamp_unit(frequency),
            speed: clamp_unit(speed),
            palette: clamp_palette(palette),
        }
    }

    #[must_use]
    pub fn apply(self, msg: ControlMsg) -> Self {
        match msg {
            ControlMsg::SetResolution(v) => self.with_resolution(v),
            ControlMsg::SetFrequency(v) => self.with_frequency(v),
            ControlMsg::SetSpeed(v) => self.with_speed(v),
            ControlMsg::SetPalette(i) => self.with_palette(i),
            ControlMsg::NudgeResolution(d) => self.with_resolution(self.resolution + d),
            ControlMsg::NudgeFrequency(d) => self.with_frequency(self.frequency + d),
            ControlMsg::NudgeSpeed(d) => self.with_speed(self.speed + d),
            ControlMsg::CyclePalette(step) => {
                let n = PALETTE_COUNT as i64;
                let next = (self.palette as i64 + step as i64).rem_euclid(n);
                self.with_palette(next as usize)
            }
        }
    }

    #[must_use]
    pub fn with_resolution(self, v: f32) -> Self {
        Self { resolution: clamp_unit(v), ..self }
    }

    #[must_use]
    pub fn with_frequency(self, v: f32) -> Self {
        Self { frequency: clamp_unit(v), ..self }
    }

    #[must_use]
    pub fn with_speed(self, v: f32) -> Self {
        Self { speed: clamp_unit(v), ..self }
    }

    #[must_use]
    pub fn with_palette(self, index: usize) -> Self {
        Self { palette: clamp_palette(index), ..self }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakpointTier {
    Xs,
    Sm,
    Md,
    Lg,
    Xl,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TierDefaults {
    pub resolution: f32,
    pub frequency: f32,
}

impl BreakpointTier {
    pub fn from_width(width: usize) -> Self {
        match width {
            0..640 => Self::Xs,
            640..768 => Self::Sm,
            768..1024 => Self::Md,
            1024..1920 => Self::Lg,
            _ => Self::Xl,
        }
    }

    pub fn defaults(self) -> TierDefaults {
        let (resolution, frequency) = match self {
            Self::Xs => (0.92, 0.70),
            Self::Sm => (0.90, 0.73),
            Self::Md => (0.88, 0.75),
            Self::Lg => (0.85, 0.78),
            Self::Xl => (0.83, 0.80),
        };
        TierDefaults { resolution, frequency }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Xs => "xs",
            Self::Sm => "sm",
            Self::Md => "md",
            Self::Lg => "lg",
            Self::Xl => "xl",
        }
    }
}
