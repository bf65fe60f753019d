use std::time::{Duration, Instant};

/// Decimal places kept on the phase accumulator.
const PHASE_SCALE: f64 = 10_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    Stopped,
    Running,
}

/// Something that hands out animation ticks. `false` ends the run.
pub trait TickSource {
    fn next_tick(&mut self) -> bool;
}

/// Real-time ticks paced toward a target rate. Missed deadlines are not
/// made up; the next tick simply fires late.
pub struct FrameClock {
    target: Duration,
    last: Option<Instant>,
}

impl FrameClock {
    pub fn new(fps: u32) -> Self {
        Self {
            target: Duration::from_secs_f32(1.0 / fps.max(1) as f32),
            last: None,
        }
    }

    pub fn target(&self) -> Duration {
        self.target
    }
}

impl TickSource for FrameClock {
    fn next_tick(&mut self) -> bool {
        if let Some(last) = self.last {
            let elapsed = last.elapsed();
            if elapsed < self.target {
                std::thread::sleep(self.target - elapsed);
            }
        }
        self.last = Some(Instant::now());
        true
    }
}

/// Exactly `n` ticks, no waiting.
#[derive(Debug, Clone, Copy)]
pub struct FixedTicks {
    remaining: u64,
}

impl FixedTicks {
    pub fn new(n: u64) -> Self {
        Self { remaining: n }
    }
}

impl TickSource for FixedTicks {
    fn next_tick(&mut self) -> bool {
        if self.remaining == 0 {
            return false;
        }
        self.remaining -= 1;
        true
    }
}

/// Owns the animation phase and advances it once per tick while running.
#[derive(Debug, Clone)]
pub struct AnimationDriver {
    state: DriverState,
    phase: f64,
    ticks: u64,
}

impl Default for AnimationDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl AnimationDriver {
    pub fn new() -> Self {
        Self {
            state: DriverState::Stopped,
            phase: 0.0,
            ticks: 0,
        }
    }

    pub fn start(&mut self) {
        self.state = DriverState::Running;
    }

    pub fn stop(&mut self) {
        self.state = DriverState::Stopped;
    }

    pub fn toggle(&mut self) {
        match self.state {
            DriverState::Running => self.stop(),
            DriverState::Stopped => self.start(),
        }
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == DriverState::Running
    }

    pub fn phase(&self) -> f64 {
        self.phase
    }

    /// Ticks applied since construction (stopped ticks don't count).
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn reset_phase(&mut self) {
        self.phase = 0.0;
    }

    /// One display-refresh step. `speed` is in phase units per tick.
    pub fn tick(&mut self, speed: f32) -> f64 {
        if self.state == DriverState::Stopped {
            return self.phase;
        }
        self.phase = round_phase(self.phase + speed as f64);
        self.ticks += 1;
        self.phase
    }

    /// Drive ticks from `source` until it runs dry or the driver stops.
    /// `speed` is re-read every tick; `on_tick` sees each new phase.
    pub fn run<S, F, G>(&mut self, source: &mut S, mut speed: F, mut on_tick: G)
    where
        S: TickSource,
        F: FnMut() -> f32,
        G: FnMut(&mut Self),
    {
        while self.is_running() && source.next_tick() {
            self.tick(speed());
            on_tick(self);
        }
    }
}

pub fn round_phase(v: f64) -> f64 {
    (v * PHASE_SCALE).round() / PHASE_SCALE
}
