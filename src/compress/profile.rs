use crate::compress::error::LadderError;

/// Ghostscript `-dPDFSETTINGS` presets used by the ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preset {
    Ebook,
    Screen,
}

impl Preset {
    pub fn as_str(&self) -> &'static str {
        match self {
            Preset::Ebook => "ebook",
            Preset::Screen => "screen",
        }
    }
}

/// One rung of the ladder. Rank 0 is the mildest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressionProfile {
    pub rank: usize,
    pub name: &'static str,
    pub preset: Preset,
    /// Target raster resolution (dpi) for downsampled images, if any.
    pub resolution: Option<u32>,
}

impl CompressionProfile {
    pub const fn new(
        rank: usize,
        name: &'static str,
        preset: Preset,
        resolution: Option<u32>,
    ) -> Self {
        Self {
            rank,
            name,
            preset,
            resolution,
        }
    }
}

/// The reference ladder: `/ebook`, `/screen`, then `/screen` downsampled to 72 dpi.
pub const DEFAULT_PROFILES: [CompressionProfile; 3] = [
    CompressionProfile::new(0, "mildest", Preset::Ebook, None),
    CompressionProfile::new(1, "mid", Preset::Screen, None),
    CompressionProfile::new(2, "aggressive", Preset::Screen, Some(72)),
];

/// Target-size thresholds (KB) that pick the starting rung.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeBands {
    /// Targets at or below this start on the most aggressive profile.
    pub aggressive_max_kb: u64,
    /// Targets at or below this (and above `aggressive_max_kb`) start on the mid profile.
    pub mid_max_kb: u64,
}

impl Default for SizeBands {
    fn default() -> Self {
        Self {
            aggressive_max_kb: 200,
            mid_max_kb: 300,
        }
    }
}

/// Non-empty list of profiles ordered from mildest to most aggressive.
#[derive(Debug, Clone)]
pub struct ProfileLadder {
    profiles: Vec<CompressionProfile>,
    bands: SizeBands,
}

impl Default for ProfileLadder {
    fn default() -> Self {
        Self {
            profiles: DEFAULT_PROFILES.to_vec(),
            bands: SizeBands::default(),
        }
    }
}

impl ProfileLadder {
    pub fn new(profiles: Vec<CompressionProfile>, bands: SizeBands) -> Result<Self, LadderError> {
        if profiles.is_empty() {
            return Err(LadderError::Empty);
        }
        for (expected, profile) in profiles.iter().enumerate() {
            if profile.rank != expected {
                return Err(LadderError::OutOfOrder {
                    name: profile.name,
                    rank: profile.rank,
                    expected,
                });
            }
        }
        if bands.aggressive_max_kb >= bands.mid_max_kb {
            return Err(LadderError::InvertedBands {
                aggressive_max_kb: bands.aggressive_max_kb,
                mid_max_kb: bands.mid_max_kb,
            });
        }
        Ok(Self { profiles, bands })
    }

    /// The reference profiles with custom thresholds.
    pub fn with_bands(bands: SizeBands) -> Result<Self, LadderError> {
        Self::new(DEFAULT_PROFILES.to_vec(), bands)
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    pub fn last_index(&self) -> usize {
        self.profiles.len() - 1
    }

    pub fn mid_index(&self) -> usize {
        self.last_index() / 2
    }

    /// # Panics
    ///
    /// Panics if `index` is past the end; indices come from this ladder.
    pub fn get(&self, index: usize) -> &CompressionProfile {
        &self.profiles[index]
    }

    /// Starting rung for a target. `None` and zero mean "no target" and start mildest.
    pub fn index_for(&self, target_kb: Option<u64>) -> usize {
        match target_kb {
            Some(t) if t > 0 && t <= self.bands.aggressive_max_kb => self.last_index(),
            Some(t) if t > 0 && t <= self.bands.mid_max_kb => self.mid_index(),
            _ => 0,
        }
    }

    /// The next, more aggressive rung, or `None` once the ladder is exhausted.
    pub fn next(&self, index: usize) -> Option<usize> {
        (index < self.last_index()).then_some(index + 1)
    }
}
