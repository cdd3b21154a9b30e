//! Configuration types. Serde-derivable so an external collaborator can
//! load them from file/env/CLI flags (spec.md §1 Non-goals: "CLI,
//! configuration loading... out of scope" for the core library — this
//! module only defines the shape, grounded on `bass-webrtc-ndi`'s
//! `NdiConfig` and the `babymotte-aes67-vsc-2` manifest's serde usage).

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::audio::{ChannelLayout, ChannelOrder, SampleFormat};

/// Payload-type -> sample-spec registry, supplemented from
/// `original_source`'s static RTP payload table (spec.md §6.1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncodingMap {
    pub entries: HashMap<u8, EncodingEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncodingEntry {
    pub sample_rate: u32,
    pub format: SampleFormat,
    pub channel_mask: u32,
    pub channel_layout: ChannelLayout,
    pub channel_order: ChannelOrder,
}

impl Default for EncodingMap {
    fn default() -> Self {
        let mut entries = HashMap::new();
        // L16/48000/2 (RTP payload type 96, dynamic range, assigned here
        // as this receiver's default audio payload type).
        entries.insert(
            96,
            EncodingEntry {
                sample_rate: 48_000,
                format: SampleFormat::I16,
                channel_mask: 0b11,
                channel_layout: ChannelLayout::Surround,
                channel_order: ChannelOrder::Smpte,
            },
        );
        Self { entries }
    }
}

impl Serialize for SampleFormat {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let s = match self {
            SampleFormat::I16 => "i16",
            SampleFormat::I24 => "i24",
            SampleFormat::I32 => "i32",
            SampleFormat::F32 => "f32",
        };
        serializer.serialize_str(s)
    }
}

impl<'de> Deserialize<'de> for SampleFormat {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        match s.as_str() {
            "i16" => Ok(SampleFormat::I16),
            "i24" => Ok(SampleFormat::I24),
            "i32" => Ok(SampleFormat::I32),
            "f32" => Ok(SampleFormat::F32),
            other => Err(serde::de::Error::unknown_variant(other, &["i16", "i24", "i32", "f32"])),
        }
    }
}

impl Serialize for ChannelLayout {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let s = match self {
            ChannelLayout::Invalid => "invalid",
            ChannelLayout::Mono => "mono",
            ChannelLayout::Surround => "surround",
            ChannelLayout::Multitrack => "multitrack",
        };
        serializer.serialize_str(s)
    }
}

impl<'de> Deserialize<'de> for ChannelLayout {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        match s.as_str() {
            "invalid" => Ok(ChannelLayout::Invalid),
            "mono" => Ok(ChannelLayout::Mono),
            "surround" => Ok(ChannelLayout::Surround),
            "multitrack" => Ok(ChannelLayout::Multitrack),
            other => Err(serde::de::Error::unknown_variant(other, &["invalid", "mono", "surround", "multitrack"])),
        }
    }
}

impl Serialize for ChannelOrder {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let s = match self {
            ChannelOrder::None => "none",
            ChannelOrder::Smpte => "smpte",
            ChannelOrder::Alsa => "alsa",
        };
        serializer.serialize_str(s)
    }
}

impl<'de> Deserialize<'de> for ChannelOrder {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        match s.as_str() {
            "none" => Ok(ChannelOrder::None),
            "smpte" => Ok(ChannelOrder::Smpte),
            "alsa" => Ok(ChannelOrder::Alsa),
            other => Err(serde::de::Error::unknown_variant(other, &["none", "smpte", "alsa"])),
        }
    }
}

/// Per-session DSP chain defaults, overridable per slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionDefaults {
    pub target_latency: Duration,
    pub no_playback_timeout: Duration,
    pub silence_timeout: Duration,
    pub gap_timeout: Duration,
    pub plc_horizon: Duration,
    pub max_seq_gap: i32,
    pub resampler_max_trim_ppm: f64,
    pub sorted_queue_capacity: usize,
    pub fec_block_window: usize,
}

impl Default for SessionDefaults {
    fn default() -> Self {
        Self {
            target_latency: Duration::from_millis(100),
            no_playback_timeout: Duration::from_secs(2),
            silence_timeout: Duration::from_secs(5),
            gap_timeout: Duration::from_secs(1),
            plc_horizon: Duration::from_millis(80),
            max_seq_gap: 100,
            resampler_max_trim_ppm: 20.0,
            sorted_queue_capacity: 256,
            fec_block_window: 4,
        }
    }
}

/// Configuration for one endpoint's inbound queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    pub queue_capacity: usize,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self { queue_capacity: 1024 }
    }
}

/// Configuration for one slot: output spec, session defaults, and the
/// address allowlist policy (if any) for session creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SlotConfig {
    pub output_sample_rate: u32,
    pub output_channel_mask: u32,
    pub session_defaults: SessionDefaults,
    pub endpoint: EndpointConfig,
    pub address_allowlist: Vec<String>,
}

impl Default for SlotConfig {
    fn default() -> Self {
        Self {
            output_sample_rate: 48_000,
            output_channel_mask: 0b11,
            session_defaults: SessionDefaults::default(),
            endpoint: EndpointConfig::default(),
            address_allowlist: Vec::new(),
        }
    }
}
