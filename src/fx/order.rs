use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

/// Number of real stage kinds, and therefore the length of every chain.
pub const STAGE_COUNT: usize = StageKind::EndOfList as usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StageKind {
    Phaser = 0,
    Chorus = 1,
    OverDrive = 2,
    LadderFilter = 3,
    GeneralFilter = 4,
    /// Out-of-band "unset" marker. Never a processing stage.
    EndOfList = 5,
}

impl StageKind {
    pub const ALL: [Self; STAGE_COUNT] = [
        Self::Phaser,
        Self::Chorus,
        Self::OverDrive,
        Self::LadderFilter,
        Self::GeneralFilter,
    ];

    pub const fn code(self) -> i32 {
        self as i32
    }

    /// Decode an integer stage code. Anything outside the known range is `EndOfList`.
    pub const fn from_code(code: i32) -> Self {
        match code {
            0 => Self::Phaser,
            1 => Self::Chorus,
            2 => Self::OverDrive,
            3 => Self::LadderFilter,
            4 => Self::GeneralFilter,
            _ => Self::EndOfList,
        }
    }

    pub const fn is_stage(self) -> bool {
        !matches!(self, Self::EndOfList)
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Phaser => "Phaser",
            Self::Chorus => "Chorus",
            Self::OverDrive => "OverDrive",
            Self::LadderFilter => "Ladder Filter",
            Self::GeneralFilter => "General Filter",
            Self::EndOfList => "None",
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for StageKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();

        match normalized.as_str() {
            "phaser" => Ok(Self::Phaser),
            "chorus" => Ok(Self::Chorus),
            "overdrive" | "drive" => Ok(Self::OverDrive),
            "ladder" | "ladderfilter" => Ok(Self::LadderFilter),
            "filter" | "generalfilter" | "iir" => Ok(Self::GeneralFilter),
            "none" | "endoflist" | "empty" => Ok(Self::EndOfList),
            _ => Err(anyhow::anyhow!("unknown stage kind: '{s}'")),
        }
    }
}

/// The serial execution order of the chain. Position 0 is processed first.
///
/// Uniqueness of kinds is not enforced: a repeated kind runs the same stage
/// instance once per occurrence, an omitted kind simply does not run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DspOrder([StageKind; STAGE_COUNT]);

impl Default for DspOrder {
    fn default() -> Self {
        Self(StageKind::ALL)
    }
}

impl DspOrder {
    pub const fn new(kinds: [StageKind; STAGE_COUNT]) -> Self {
        Self(kinds)
    }

    /// The all-sentinel pattern, read by the engine as "no change requested".
    pub const fn unset() -> Self {
        Self([StageKind::EndOfList; STAGE_COUNT])
    }

    pub fn is_unset(&self) -> bool {
        self.0.iter().all(|k| !k.is_stage())
    }

    /// True when every real stage kind appears exactly once.
    pub fn is_permutation(&self) -> bool {
        StageKind::ALL
            .iter()
            .all(|kind| self.0.iter().filter(|k| *k == kind).count() == 1)
    }

    pub const fn kinds(&self) -> &[StageKind; STAGE_COUNT] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = StageKind> + '_ {
        self.0.iter().copied()
    }

    /// Move the stage at `from` to `to`, shifting the ones in between.
    pub fn move_stage(&mut self, from: usize, to: usize) {
        if from >= STAGE_COUNT || to >= STAGE_COUNT || from == to {
            return;
        }

        let kind = self.0[from];
        if from < to {
            self.0.copy_within(from + 1..=to, from);
        } else {
            self.0.copy_within(to..from, to + 1);
        }
        self.0[to] = kind;
    }

    pub fn swap(&mut self, a: usize, b: usize) {
        if a < STAGE_COUNT && b < STAGE_COUNT {
            self.0.swap(a, b);
        }
    }

    pub fn to_codes(&self) -> [i32; STAGE_COUNT] {
        self.0.map(StageKind::code)
    }

    pub fn from_codes(codes: [i32; STAGE_COUNT]) -> Self {
        Self(codes.map(StageKind::from_code))
    }

    /// Pack into a single word, one byte per position.
    fn to_packed(self) -> u64 {
        self.0
            .iter()
            .enumerate()
            .fold(0u64, |acc, (i, k)| acc | (u64::from(k.code() as u8) << (i * 8)))
    }

    fn from_packed(packed: u64) -> Self {
        let mut kinds = [StageKind::EndOfList; STAGE_COUNT];
        for (i, kind) in kinds.iter_mut().enumerate() {
            *kind = StageKind::from_code(((packed >> (i * 8)) & 0xff) as i32);
        }
        Self(kinds)
    }
}

impl std::ops::Index<usize> for DspOrder {
    type Output = StageKind;

    fn index(&self, index: usize) -> &Self::Output {
        &self.0[index]
    }
}

impl fmt::Display for DspOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, kind) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, " -> ")?;
            }
            write!(f, "{kind}")?;
        }
        Ok(())
    }
}

/// Parses a comma-separated list, e.g. `chorus,phaser,ladder,overdrive,filter`.
/// Shorter lists are padded with `EndOfList`.
impl FromStr for DspOrder {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut kinds = [StageKind::EndOfList; STAGE_COUNT];
        let parts: Vec<&str> = s
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect();

        if parts.len() > STAGE_COUNT {
            anyhow::bail!(
                "order has {} entries, at most {STAGE_COUNT} allowed",
                parts.len()
            );
        }

        for (slot, part) in kinds.iter_mut().zip(parts) {
            *slot = part.parse()?;
        }

        Ok(Self(kinds))
    }
}

/// Wait-free mirror of the order currently in effect, written by the audio thread
/// and read by control threads.
#[derive(Debug)]
pub struct SharedOrder {
    packed: AtomicU64,
}

impl SharedOrder {
    pub fn new(order: DspOrder) -> Self {
        Self {
            packed: AtomicU64::new(order.to_packed()),
        }
    }

    pub fn load(&self) -> DspOrder {
        DspOrder::from_packed(self.packed.load(Ordering::Acquire))
    }

    pub fn store(&self, order: DspOrder) {
        self.packed.store(order.to_packed(), Ordering::Release);
    }
}

impl Default for SharedOrder {
    fn default() -> Self {
        Self::new(DspOrder::default())
    }
}
