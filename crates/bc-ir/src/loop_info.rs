//! Loop value type shared by samples and regions.

/// Whether a loop is defined, and if so whether it is active.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LoopStatus {
    /// Not specified; inherit from the sample.
    #[default]
    Unset,
    /// Explicitly one-shot.
    Off,
    /// Forward loop.
    On,
}

/// Unit that loop start/length values are measured in.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LoopMeasure {
    /// Bytes of the original (possibly compressed) encoding
    #[default]
    Bytes,
    /// Decoded sample frames
    Samples,
}

/// Loop points of a sample or region.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Loop {
    pub status: LoopStatus,
    pub start: u32,
    pub length: u32,
    pub start_measure: LoopMeasure,
    pub length_measure: LoopMeasure,
}

impl Loop {
    /// An active loop measured in bytes of the source encoding.
    pub fn bytes(start: u32, length: u32) -> Self {
        Self {
            status: LoopStatus::On,
            start,
            length,
            ..Self::default()
        }
    }

    /// An active loop measured in decoded samples.
    pub fn samples(start: u32, length: u32) -> Self {
        Self {
            status: LoopStatus::On,
            start,
            length,
            start_measure: LoopMeasure::Samples,
            length_measure: LoopMeasure::Samples,
        }
    }

    /// A one-shot marker.
    pub fn off() -> Self {
        Self {
            status: LoopStatus::Off,
            ..Self::default()
        }
    }

    pub fn is_set(&self) -> bool {
        self.status != LoopStatus::Unset
    }

    pub fn is_looping(&self) -> bool {
        self.status == LoopStatus::On
    }

    /// True when both loop points are zero.
    pub fn is_empty(&self) -> bool {
        self.start == 0 && self.length == 0
    }
}

/// A loop converted to decoded sample frames.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ResolvedLoop {
    pub enabled: bool,
    pub start: u32,
    pub length: u32,
}

impl ResolvedLoop {
    /// One past the last looped frame, saturating at `u32::MAX`.
    pub fn end(&self) -> u32 {
        self.start.saturating_add(self.length)
    }
}
