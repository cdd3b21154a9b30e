//! Audio DSP chain: channel identity, mapping, concealment, resampling,
//! depacketizing, validation, and mixing (spec.md §3-4).

pub mod channel_mapper;
pub mod channel_mapper_matrix;
pub mod channel_mapper_table;
pub mod channel_mapper_writer;
pub mod channel_set;
pub mod depacketizer;
pub mod frame;
pub mod mixer;
pub mod plc;
pub mod resampler;
pub mod sample_spec;
pub mod validator;

pub use channel_mapper::ChannelMapper;
pub use channel_set::{ChannelLayout, ChannelOrder, ChannelSet};
pub use frame::{Frame, FrameFlags, FrameWriter};
pub use sample_spec::{SampleFormat, SampleSpec};
