//! Amplitude envelope and vibrato value types, plus the hardware
//! envelope-rate approximations used by console scanners.

/// Curve applied to an envelope segment.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EnvelopeTransform {
    #[default]
    Linear,
    Convex,
}

/// ADSR envelope. Times are in seconds.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Envelope {
    pub attack: f64,
    pub hold: f64,
    pub decay: f64,
    /// Sustain amplitude as a fraction of full scale, `None` = unset
    pub sustain_level: Option<f64>,
    pub release: f64,
    pub attack_transform: EnvelopeTransform,
    pub release_transform: EnvelopeTransform,
}

impl Envelope {
    /// Sustain level, treating an unset level as full scale.
    pub fn sustain_or_full(&self) -> f64 {
        self.sustain_level.unwrap_or(1.0).clamp(0.0, 1.0)
    }
}

/// Pitch LFO settings of a region.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Vibrato {
    pub frequency_hz: f64,
    pub depth_cents: f64,
    pub delay_seconds: f64,
}

impl Vibrato {
    /// A vibrato is only emitted when both depth and frequency are positive.
    pub fn is_active(&self) -> bool {
        self.depth_cents > 0.0 && self.frequency_hz > 0.0
    }
}

// --- Hardware envelope approximations ---
//
// Models the envelope counter of the SNES S-DSP: an 11-bit envelope that
// steps once every `COUNTER_RATES[rate]` output samples at 32 kHz.

/// Output rate of the modelled DSP in Hz.
pub const DSP_SAMPLE_RATE: f64 = 32000.0;

const ENVELOPE_MAX: i32 = 0x7FF;

/// Samples between envelope steps, indexed by rate. Rate 0 never steps.
const COUNTER_RATES: [u32; 32] = [
    0, 2048, 1536, 1280, 1024, 768, 640, 512, 384, 320, 256, 192, 160, 128, 96, 80, 64, 48, 40,
    32, 24, 20, 16, 12, 10, 8, 6, 5, 4, 3, 2, 1,
];

fn steps_to_seconds(steps: u32, period: u32) -> f64 {
    steps as f64 * period as f64 / DSP_SAMPLE_RATE
}

fn exponential_step(env: i32) -> i32 {
    env - (((env - 1) >> 8) + 1)
}

/// Time for a linear attack (rate 0..=15) to reach full scale.
pub fn attack_rate_to_seconds(ar: u8) -> f64 {
    let ar = ar & 0x0F;
    if ar == 0x0F {
        // +1024 every sample
        return 2.0 / DSP_SAMPLE_RATE;
    }
    let period = COUNTER_RATES[(ar as usize) * 2 + 1];
    let steps = (ENVELOPE_MAX as u32).div_ceil(32);
    steps_to_seconds(steps, period)
}

/// Time for the exponential decay (rate 0..=7) to fall from full scale
/// to sustain level `sl` (0..=7, where 7 is full scale).
pub fn decay_rate_to_seconds(dr: u8, sl: u8) -> f64 {
    let period = COUNTER_RATES[((dr & 0x07) as usize) * 2 + 16];
    let sl = (sl & 0x07) as i32;
    let mut env = ENVELOPE_MAX;
    let mut steps = 0u32;
    while (env >> 8) > sl {
        env = exponential_step(env);
        steps += 1;
    }
    steps_to_seconds(steps, period)
}

/// Time for the exponential sustain/release decrease (rate 0..=31) to fall
/// from full scale to silence. Rate 0 never decays.
pub fn sustain_rate_to_seconds(sr: u8) -> f64 {
    let period = COUNTER_RATES[(sr & 0x1F) as usize];
    if period == 0 {
        return f64::INFINITY;
    }
    let mut env = ENVELOPE_MAX;
    let mut steps = 0u32;
    while env > 0 {
        env = exponential_step(env);
        steps += 1;
    }
    steps_to_seconds(steps, period)
}

/// Sustain level register (0..=7) as an amplitude fraction.
pub fn sustain_level_fraction(sl: u8) -> f64 {
    ((sl & 0x07) as f64 + 1.0) / 8.0
}
