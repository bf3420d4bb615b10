// Music box plucker control
//
// Provides:
// - Channel table of push/pull pulse widths, loaded from a text file
// - Hole pattern decoding
// - Push / pull / tap gestures over sets of channels

mod actuator;
pub mod table;

pub use actuator::{MusicBoxActuator, Phase, decode_hole_pattern};
pub use table::{ChannelTable, LoadReport};
