//! Externally controlled parameters.
//!
//! Every parameter lives in its own atomic cell holding the value as `f32` bits.
//! Control threads write, the audio thread reads, both with relaxed ordering:
//! a block may observe a mix of old and new values across different parameters,
//! which only delays an update by one block. There is no cross-parameter
//! transaction.

pub mod smoother;

use crate::fx::order::StageKind;
use crate::fx::stages::general_filter::FilterMode;
use crate::fx::stages::ladder::LadderMode;
use anyhow::{Context, Result, bail};
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

pub use smoother::{Smoother, SmootherUpdateMode};

pub const PARAM_COUNT: usize = 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamId {
    PhaserRate,
    PhaserDepth,
    PhaserCentreFreq,
    PhaserFeedback,
    PhaserMix,
    PhaserBypass,
    ChorusRate,
    ChorusDepth,
    ChorusCentreDelay,
    ChorusFeedback,
    ChorusMix,
    ChorusBypass,
    OverdriveSaturation,
    OverdriveBypass,
    LadderMode,
    LadderCutoff,
    LadderResonance,
    LadderDrive,
    LadderBypass,
    GeneralFilterMode,
    GeneralFilterFreq,
    GeneralFilterQuality,
    GeneralFilterGain,
    GeneralFilterBypass,
}

const PHASER_PARAMS: [ParamId; 6] = [
    ParamId::PhaserRate,
    ParamId::PhaserCentreFreq,
    ParamId::PhaserDepth,
    ParamId::PhaserFeedback,
    ParamId::PhaserMix,
    ParamId::PhaserBypass,
];

const CHORUS_PARAMS: [ParamId; 6] = [
    ParamId::ChorusRate,
    ParamId::ChorusDepth,
    ParamId::ChorusCentreDelay,
    ParamId::ChorusFeedback,
    ParamId::ChorusMix,
    ParamId::ChorusBypass,
];

const OVERDRIVE_PARAMS: [ParamId; 2] = [ParamId::OverdriveSaturation, ParamId::OverdriveBypass];

const LADDER_PARAMS: [ParamId; 5] = [
    ParamId::LadderMode,
    ParamId::LadderCutoff,
    ParamId::LadderResonance,
    ParamId::LadderDrive,
    ParamId::LadderBypass,
];

const GENERAL_FILTER_PARAMS: [ParamId; 5] = [
    ParamId::GeneralFilterMode,
    ParamId::GeneralFilterFreq,
    ParamId::GeneralFilterQuality,
    ParamId::GeneralFilterGain,
    ParamId::GeneralFilterBypass,
];

impl ParamId {
    pub const ALL: [Self; PARAM_COUNT] = [
        Self::PhaserRate,
        Self::PhaserDepth,
        Self::PhaserCentreFreq,
        Self::PhaserFeedback,
        Self::PhaserMix,
        Self::PhaserBypass,
        Self::ChorusRate,
        Self::ChorusDepth,
        Self::ChorusCentreDelay,
        Self::ChorusFeedback,
        Self::ChorusMix,
        Self::ChorusBypass,
        Self::OverdriveSaturation,
        Self::OverdriveBypass,
        Self::LadderMode,
        Self::LadderCutoff,
        Self::LadderResonance,
        Self::LadderDrive,
        Self::LadderBypass,
        Self::GeneralFilterMode,
        Self::GeneralFilterFreq,
        Self::GeneralFilterQuality,
        Self::GeneralFilterGain,
        Self::GeneralFilterBypass,
    ];

    pub const fn index(self) -> usize {
        self as usize
    }

    /// Stable identifier used for persistence and automation.
    pub const fn name(self) -> &'static str {
        match self {
            Self::PhaserRate => "Phaser RateHz",
            Self::PhaserDepth => "Phaser Depth %",
            Self::PhaserCentreFreq => "Phaser Center FreqHz",
            Self::PhaserFeedback => "Phaser Feedback %",
            Self::PhaserMix => "Phaser Mix %",
            Self::PhaserBypass => "Phaser Bypass",
            Self::ChorusRate => "Chorus RateHz",
            Self::ChorusDepth => "Chorus Depth %",
            Self::ChorusCentreDelay => "Chorus Center Delay Ms",
            Self::ChorusFeedback => "Chorus Feedback %",
            Self::ChorusMix => "Chorus Mix %",
            Self::ChorusBypass => "Chorus Bypass",
            Self::OverdriveSaturation => "OverDrive Saturation",
            Self::OverdriveBypass => "OverDrive Bypass",
            Self::LadderMode => "Ladder Filter Mode",
            Self::LadderCutoff => "Ladder Filter Cutoff Hz",
            Self::LadderResonance => "Ladder Filter Resonance",
            Self::LadderDrive => "Ladder Filter Drive",
            Self::LadderBypass => "Ladder Filter Bypass",
            Self::GeneralFilterMode => "General Filter Mode",
            Self::GeneralFilterFreq => "General Filter Freq hz",
            Self::GeneralFilterQuality => "General Filter Quality",
            Self::GeneralFilterGain => "General Filter Gain",
            Self::GeneralFilterBypass => "General Filter Bypass",
        }
    }

    /// Name of the matching stage parameter, `None` for bypass flags.
    pub const fn stage_key(self) -> Option<&'static str> {
        match self {
            Self::PhaserRate | Self::ChorusRate => Some("rate"),
            Self::PhaserDepth | Self::ChorusDepth => Some("depth"),
            Self::PhaserCentreFreq => Some("center_freq"),
            Self::ChorusCentreDelay => Some("center_delay"),
            Self::PhaserFeedback | Self::ChorusFeedback => Some("feedback"),
            Self::PhaserMix | Self::ChorusMix => Some("mix"),
            Self::OverdriveSaturation => Some("saturation"),
            Self::LadderMode | Self::GeneralFilterMode => Some("mode"),
            Self::LadderCutoff => Some("cutoff"),
            Self::LadderResonance => Some("resonance"),
            Self::LadderDrive => Some("drive"),
            Self::GeneralFilterFreq => Some("freq"),
            Self::GeneralFilterQuality => Some("quality"),
            Self::GeneralFilterGain => Some("gain"),
            Self::PhaserBypass
            | Self::ChorusBypass
            | Self::OverdriveBypass
            | Self::LadderBypass
            | Self::GeneralFilterBypass => None,
        }
    }

    pub const fn kind(self) -> StageKind {
        match self {
            Self::PhaserRate
            | Self::PhaserDepth
            | Self::PhaserCentreFreq
            | Self::PhaserFeedback
            | Self::PhaserMix
            | Self::PhaserBypass => StageKind::Phaser,
            Self::ChorusRate
            | Self::ChorusDepth
            | Self::ChorusCentreDelay
            | Self::ChorusFeedback
            | Self::ChorusMix
            | Self::ChorusBypass => StageKind::Chorus,
            Self::OverdriveSaturation | Self::OverdriveBypass => StageKind::OverDrive,
            Self::LadderMode
            | Self::LadderCutoff
            | Self::LadderResonance
            | Self::LadderDrive
            | Self::LadderBypass => StageKind::LadderFilter,
            Self::GeneralFilterMode
            | Self::GeneralFilterFreq
            | Self::GeneralFilterQuality
            | Self::GeneralFilterGain
            | Self::GeneralFilterBypass => StageKind::GeneralFilter,
        }
    }

    pub fn spec(self) -> ParamSpec {
        match self {
            Self::PhaserRate => ParamSpec::float(0.01, 2.0, 0.01, 0.2, "Hz"),
            Self::PhaserDepth => ParamSpec::float(0.01, 1.0, 0.01, 0.05, "%"),
            Self::PhaserCentreFreq => ParamSpec::float(20.0, 20_000.0, 1.0, 1000.0, "Hz"),
            Self::PhaserFeedback => ParamSpec::float(-1.0, 1.0, 0.01, 0.0, "%"),
            Self::PhaserMix => ParamSpec::float(0.01, 1.0, 0.01, 0.05, "%"),
            Self::ChorusRate => ParamSpec::float(0.01, 100.0, 0.01, 0.2, "Hz"),
            Self::ChorusDepth => ParamSpec::float(0.01, 1.0, 0.01, 0.05, "%"),
            Self::ChorusCentreDelay => ParamSpec::float(1.0, 100.0, 0.1, 7.0, "ms"),
            Self::ChorusFeedback => ParamSpec::float(-1.0, 1.0, 0.01, 0.0, "%"),
            Self::ChorusMix => ParamSpec::float(0.01, 1.0, 0.01, 0.05, "%"),
            Self::OverdriveSaturation => ParamSpec::float(1.0, 100.0, 0.1, 1.0, ""),
            Self::LadderMode => ParamSpec::Choice {
                choices: &LadderMode::NAMES,
                default: 0,
            },
            Self::LadderCutoff => ParamSpec::float(20.0, 20_000.0, 0.1, 20_000.0, "Hz"),
            Self::LadderResonance => ParamSpec::float(0.0, 1.0, 0.01, 0.0, ""),
            Self::LadderDrive => ParamSpec::float(1.0, 100.0, 0.1, 1.0, ""),
            Self::GeneralFilterMode => ParamSpec::Choice {
                choices: &FilterMode::NAMES,
                default: 0,
            },
            Self::GeneralFilterFreq => ParamSpec::float(20.0, 20_000.0, 1.0, 750.0, "Hz"),
            Self::GeneralFilterQuality => ParamSpec::float(0.1, 10.0, 0.05, 1.0, ""),
            Self::GeneralFilterGain => ParamSpec::float(-24.0, 24.0, 0.5, 0.0, "dB"),
            Self::PhaserBypass
            | Self::ChorusBypass
            | Self::OverdriveBypass
            | Self::LadderBypass
            | Self::GeneralFilterBypass => ParamSpec::Bool { default: false },
        }
    }

    /// Ordered parameter ids for a stage kind, bypass last. Empty for `EndOfList`.
    pub const fn for_kind(kind: StageKind) -> &'static [Self] {
        match kind {
            StageKind::Phaser => &PHASER_PARAMS,
            StageKind::Chorus => &CHORUS_PARAMS,
            StageKind::OverDrive => &OVERDRIVE_PARAMS,
            StageKind::LadderFilter => &LADDER_PARAMS,
            StageKind::GeneralFilter => &GENERAL_FILTER_PARAMS,
            StageKind::EndOfList => &[],
        }
    }

    pub const fn bypass_for(kind: StageKind) -> Option<Self> {
        match kind {
            StageKind::Phaser => Some(Self::PhaserBypass),
            StageKind::Chorus => Some(Self::ChorusBypass),
            StageKind::OverDrive => Some(Self::OverdriveBypass),
            StageKind::LadderFilter => Some(Self::LadderBypass),
            StageKind::GeneralFilter => Some(Self::GeneralFilterBypass),
            StageKind::EndOfList => None,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|id| id.name() == name)
    }
}

impl fmt::Display for ParamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Value domain of a parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamSpec {
    Float {
        min: f32,
        max: f32,
        step: f32,
        default: f32,
        unit: &'static str,
    },
    Bool {
        default: bool,
    },
    Choice {
        choices: &'static [&'static str],
        default: usize,
    },
}

impl ParamSpec {
    const fn float(min: f32, max: f32, step: f32, default: f32, unit: &'static str) -> Self {
        Self::Float {
            min,
            max,
            step,
            default,
            unit,
        }
    }

    pub fn default_value(&self) -> ParamValue {
        match *self {
            Self::Float { default, .. } => ParamValue::Float(default),
            Self::Bool { default } => ParamValue::Bool(default),
            Self::Choice { default, .. } => ParamValue::Choice(default),
        }
    }

    /// Clamp a raw value into the domain. Non-finite input falls back to the default.
    pub fn sanitize(&self, raw: f32) -> f32 {
        if !raw.is_finite() {
            return self.default_value().to_raw();
        }

        match *self {
            Self::Float { min, max, .. } => raw.clamp(min, max),
            Self::Bool { .. } => {
                if raw >= 0.5 {
                    1.0
                } else {
                    0.0
                }
            }
            Self::Choice { choices, .. } => raw.round().clamp(0.0, (choices.len() - 1) as f32),
        }
    }

    pub const fn is_float(&self) -> bool {
        matches!(self, Self::Float { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamValue {
    Float(f32),
    Bool(bool),
    Choice(usize),
}

impl ParamValue {
    pub fn to_raw(self) -> f32 {
        match self {
            Self::Float(v) => v,
            Self::Bool(b) => f32::from(u8::from(b)),
            Self::Choice(i) => i as f32,
        }
    }
}

/// A single automatable value shared between threads.
#[derive(Debug)]
pub struct Parameter {
    id: ParamId,
    spec: ParamSpec,
    bits: AtomicU32,
}

impl Parameter {
    pub fn new(id: ParamId) -> Self {
        let spec = id.spec();
        Self {
            id,
            spec,
            bits: AtomicU32::new(spec.default_value().to_raw().to_bits()),
        }
    }

    pub const fn id(&self) -> ParamId {
        self.id
    }

    pub const fn spec(&self) -> &ParamSpec {
        &self.spec
    }

    pub const fn name(&self) -> &'static str {
        self.id.name()
    }

    /// Wait-free read of the raw value.
    #[inline]
    pub fn raw(&self) -> f32 {
        f32::from_bits(self.bits.load(Ordering::Relaxed))
    }

    pub fn set_raw(&self, raw: f32) {
        let value = self.spec.sanitize(raw);
        self.bits.store(value.to_bits(), Ordering::Relaxed);
    }

    pub fn get(&self) -> ParamValue {
        let raw = self.raw();
        match self.spec {
            ParamSpec::Float { .. } => ParamValue::Float(raw),
            ParamSpec::Bool { .. } => ParamValue::Bool(raw >= 0.5),
            ParamSpec::Choice { .. } => ParamValue::Choice(raw as usize),
        }
    }

    pub fn set(&self, value: ParamValue) {
        self.set_raw(value.to_raw());
    }

    #[inline]
    pub fn is_on(&self) -> bool {
        self.raw() >= 0.5
    }

    pub fn reset(&self) {
        self.set(self.spec.default_value());
    }

    /// Parse user text for this parameter: a number for floats, `on`/`off` for
    /// bools, a choice name or index for choices. The result is not yet clamped.
    pub fn parse_value(&self, text: &str) -> Result<f32> {
        let text = text.trim();
        match self.spec {
            ParamSpec::Float { .. } => text
                .parse::<f32>()
                .with_context(|| format!("'{text}' is not a number for '{}'", self.name())),
            ParamSpec::Bool { .. } => match text.to_ascii_lowercase().as_str() {
                "on" | "true" | "1" | "yes" => Ok(1.0),
                "off" | "false" | "0" | "no" => Ok(0.0),
                _ => bail!("'{text}' is not on/off for '{}'", self.name()),
            },
            ParamSpec::Choice { choices, .. } => choices
                .iter()
                .position(|c| c.eq_ignore_ascii_case(text))
                .or_else(|| text.parse::<usize>().ok().filter(|i| *i < choices.len()))
                .map(|i| i as f32)
                .with_context(|| {
                    format!(
                        "'{text}' is not one of [{}] for '{}'",
                        choices.join(", "),
                        self.name()
                    )
                }),
        }
    }

    pub fn display_value(&self) -> String {
        match (self.spec, self.get()) {
            (ParamSpec::Float { unit, .. }, ParamValue::Float(v)) if unit.is_empty() => {
                format!("{v:.2}")
            }
            (ParamSpec::Float { unit, .. }, ParamValue::Float(v)) => format!("{v:.2} {unit}"),
            (ParamSpec::Choice { choices, .. }, ParamValue::Choice(i)) => {
                choices.get(i).copied().unwrap_or("?").to_string()
            }
            (_, ParamValue::Bool(b)) => String::from(if b { "on" } else { "off" }),
            _ => String::new(),
        }
    }
}

/// The full parameter registry, created once and shared by `Arc`.
#[derive(Debug)]
pub struct ParameterSet {
    params: [Parameter; PARAM_COUNT],
}

impl Default for ParameterSet {
    fn default() -> Self {
        Self::new()
    }
}

impl ParameterSet {
    pub fn new() -> Self {
        Self {
            params: ParamId::ALL.map(Parameter::new),
        }
    }

    #[inline]
    pub fn get(&self, id: ParamId) -> &Parameter {
        &self.params[id.index()]
    }

    pub fn by_name(&self, name: &str) -> Option<&Parameter> {
        ParamId::from_name(name).map(|id| self.get(id))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Parameter> {
        self.params.iter()
    }

    /// Parameter handles for one stage, in display order.
    pub fn params_for_kind(&self, kind: StageKind) -> Vec<&Parameter> {
        ParamId::for_kind(kind)
            .iter()
            .map(|id| self.get(*id))
            .collect()
    }

    #[inline]
    pub fn is_bypassed(&self, kind: StageKind) -> bool {
        ParamId::bypass_for(kind).is_some_and(|id| self.get(id).is_on())
    }

    pub fn set_bypassed(&self, kind: StageKind, bypassed: bool) {
        if let Some(id) = ParamId::bypass_for(kind) {
            self.get(id).set(ParamValue::Bool(bypassed));
        }
    }

    pub fn reset_to_defaults(&self) {
        for param in &self.params {
            param.reset();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique_and_indexed() {
        for (i, id) in ParamId::ALL.iter().enumerate() {
            assert_eq!(id.index(), i);
            assert_eq!(ParamId::from_name(id.name()), Some(*id));
        }
        assert!(ParamId::from_name("Reverb Size").is_none());
    }

    #[test]
    fn every_kind_lists_its_own_params_with_bypass_last() {
        let mut total = 0;
        for kind in StageKind::ALL {
            let ids = ParamId::for_kind(kind);
            assert!(ids.iter().all(|id| id.kind() == kind));
            assert_eq!(ids.last().copied(), ParamId::bypass_for(kind));
            assert!(ids[..ids.len() - 1].iter().all(|id| id.stage_key().is_some()));
            total += ids.len();
        }
        assert_eq!(total, PARAM_COUNT);
        assert!(ParamId::for_kind(StageKind::EndOfList).is_empty());
    }

    #[test]
    fn defaults_match_spec() {
        let params = ParameterSet::new();
        assert_eq!(params.get(ParamId::PhaserRate).get(), ParamValue::Float(0.2));
        assert_eq!(params.get(ParamId::ChorusCentreDelay).get(), ParamValue::Float(7.0));
        assert_eq!(params.get(ParamId::LadderMode).get(), ParamValue::Choice(0));
        assert!(!params.is_bypassed(StageKind::Chorus));
        assert!(!params.is_bypassed(StageKind::EndOfList));
    }

    #[test]
    fn values_are_clamped_into_their_domain() {
        let params = ParameterSet::new();

        let rate = params.get(ParamId::PhaserRate);
        rate.set(ParamValue::Float(10.0));
        assert_eq!(rate.raw(), 2.0);
        rate.set_raw(f32::NAN);
        assert_eq!(rate.raw(), 0.2);

        let mode = params.get(ParamId::GeneralFilterMode);
        mode.set(ParamValue::Choice(9));
        assert_eq!(mode.get(), ParamValue::Choice(3));
        mode.set_raw(1.4);
        assert_eq!(mode.get(), ParamValue::Choice(1));

        let bypass = params.get(ParamId::OverdriveBypass);
        bypass.set_raw(0.7);
        assert_eq!(bypass.get(), ParamValue::Bool(true));
    }

    #[test]
    fn bypass_helpers_touch_only_their_stage() {
        let params = ParameterSet::new();
        params.set_bypassed(StageKind::LadderFilter, true);

        for kind in StageKind::ALL {
            assert_eq!(params.is_bypassed(kind), kind == StageKind::LadderFilter);
        }

        params.reset_to_defaults();
        assert!(!params.is_bypassed(StageKind::LadderFilter));
    }

    #[test]
    fn parses_user_text() {
        let params = ParameterSet::new();
        let gain = params.get(ParamId::GeneralFilterGain);
        assert_eq!(gain.parse_value(" -6.5 ").unwrap(), -6.5);
        assert!(gain.parse_value("loud").is_err());

        let bypass = params.get(ParamId::ChorusBypass);
        assert_eq!(bypass.parse_value("On").unwrap(), 1.0);
        assert!(bypass.parse_value("maybe").is_err());

        let mode = params.get(ParamId::LadderMode);
        assert_eq!(mode.parse_value("bpf24").unwrap(), 5.0);
        assert_eq!(mode.parse_value("2").unwrap(), 2.0);
        assert!(mode.parse_value("6").is_err());
    }

    #[test]
    fn params_for_kind_exposes_metadata() {
        let params = ParameterSet::new();
        let ladder = params.params_for_kind(StageKind::LadderFilter);
        assert_eq!(ladder.len(), 5);
        assert_eq!(ladder[0].name(), "Ladder Filter Mode");
        match ladder[0].spec() {
            ParamSpec::Choice { choices, .. } => assert_eq!(choices.len(), 6),
            other => panic!("expected a choice, got {other:?}"),
        }
        assert_eq!(ladder[0].display_value(), "LPF12");
        assert_eq!(ladder[1].display_value(), "20000.00 Hz");
        assert_eq!(ladder[4].display_value(), "off");
    }
}
