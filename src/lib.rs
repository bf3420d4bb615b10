pub mod config;
pub mod error;
pub mod music_box;
pub mod request;
pub mod servo;

pub use error::{Result, ServoError};
