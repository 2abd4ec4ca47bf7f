//! Numeric conversions between the model's natural units (seconds,
//! amplitude fractions, decibels) and the native units of DLS and SF2.

/// Reference frequency of absolute-cents 0 (MIDI note 0), in Hz.
pub const ABS_CENTS_REF_HZ: f64 = 8.176;

/// DLS scale value meaning "instantaneous" for time destinations.
pub const DLS_INSTANT: i32 = i32::MIN;

/// SF2 generator value meaning "instantaneous" for time generators.
pub const SF2_INSTANT: i16 = i16::MIN;

/// Largest attenuation representable in the DLS sustain level, in dB.
pub const DLS_MAX_ATTENUATION_DB: f64 = 96.0;

/// Largest SF2 attenuation, in centibels.
pub const SF2_MAX_CENTIBELS: i16 = 1440;

/// `1200 × log2(seconds)`.
pub fn seconds_to_timecents(seconds: f64) -> f64 {
    1200.0 * libm::log2(seconds)
}

/// Attenuation in dB for an amplitude fraction: `20 × log10(1/frac)`.
///
/// Silence maps to infinity; fractions above 1 clamp to 0 dB.
pub fn amplitude_to_attenuation_db(fraction: f64) -> f64 {
    if fraction <= 0.0 {
        return f64::INFINITY;
    }
    (20.0 * libm::log10(1.0 / fraction)).max(0.0)
}

/// Fractional pan (0 = left, 0.5 = center, 1 = right) to tenths of a
/// percent, center 0, range -500..=500.
pub fn percent_to_pan_units(pan: f64) -> i16 {
    libm::round((pan - 0.5) * 1000.0).clamp(-500.0, 500.0) as i16
}

/// Absolute pitch cents of an LFO frequency.
pub fn lfo_frequency_to_cents(hz: f64) -> f64 {
    1200.0 * libm::log2(hz / ABS_CENTS_REF_HZ)
}

fn to_fixed_16_16(value: f64) -> i32 {
    (libm::round(value).clamp(-32767.0, 32767.0) as i32) << 16
}

// --- DLS ---

/// Envelope time as 16.16 fixed-point timecents.
pub fn dls_time(seconds: f64) -> i32 {
    if seconds <= 0.0 {
        return DLS_INSTANT;
    }
    to_fixed_16_16(seconds_to_timecents(seconds))
}

/// Sustain level as 16.16 tenths of a percent of full scale, over a 96 dB
/// range.
pub fn dls_sustain_level(fraction: f64) -> i32 {
    let db = amplitude_to_attenuation_db(fraction).min(DLS_MAX_ATTENUATION_DB);
    let permille = (1.0 - db / DLS_MAX_ATTENUATION_DB) * 1000.0;
    to_fixed_16_16(permille)
}

/// Pan as 16.16 tenths of a percent.
pub fn dls_pan(pan: f64) -> i32 {
    (percent_to_pan_units(pan) as i32) << 16
}

/// Sample attenuation as negative 16.16 centibels.
pub fn dls_attenuation(db: f64) -> i32 {
    -to_fixed_16_16((db * 10.0).max(0.0))
}

/// Cents as 16.16 fixed point.
pub fn dls_cents(cents: f64) -> i32 {
    to_fixed_16_16(cents)
}

// --- SF2 ---

/// Envelope time in timecents, clamped to the generator range.
pub fn sf2_time(seconds: f64) -> i16 {
    if seconds <= 0.0 {
        return SF2_INSTANT;
    }
    libm::round(seconds_to_timecents(seconds)).clamp(-12000.0, 8000.0) as i16
}

/// Sustain level as centibels of attenuation, at most 144 dB.
pub fn sf2_sustain_level(fraction: f64) -> i16 {
    let cb = amplitude_to_attenuation_db(fraction) * 10.0;
    libm::round(cb.min(SF2_MAX_CENTIBELS as f64)) as i16
}

/// Initial attenuation in centibels.
pub fn sf2_attenuation(db: f64) -> i16 {
    libm::round(db * 10.0).clamp(0.0, SF2_MAX_CENTIBELS as f64) as i16
}

/// Cents rounded into a generator amount.
pub fn sf2_cents(cents: f64) -> i16 {
    libm::round(cents).clamp(i16::MIN as f64 + 1.0, i16::MAX as f64) as i16
}
