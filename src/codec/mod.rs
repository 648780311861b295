//! Frame-level encoding and decoding over async streams.
//!
//! The connection is split into halves, so reading and writing each get
//! their own type.

mod framed;

pub use framed::{FrameReader, FrameWriter};
