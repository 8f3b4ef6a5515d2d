mod compositor;
mod encode;

pub use compositor::{Overlay, composite};
pub use encode::{EncodePolicy, EncodedImage, encode_size_bounded};
