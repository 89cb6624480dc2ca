//! Local pixel-level matting algorithms
//!
//! All three matters are pure: they mutate the buffer in place, perform no
//! I/O, and never fail on a well-formed buffer. Remote matting lives in
//! [`crate::backends`]; selection and fallback in [`crate::dispatcher`].

pub mod chroma_key;
pub mod flood_fill;
pub mod threshold;

pub use chroma_key::ChromaKeyOptions;
pub use flood_fill::FloodFillOptions;
pub use threshold::ThresholdOptions;
