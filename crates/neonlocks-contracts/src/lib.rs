pub mod commands;
pub mod encoded;
pub mod events;
pub mod session;
pub mod styles;

pub use encoded::EncodedImage;
