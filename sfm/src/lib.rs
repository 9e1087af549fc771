//! Two-view structure from motion.
//!
//! Every consecutive pair of frames goes through the same stages: Harris corners, normalized
//! patch descriptors, ratio-test matching, a RANSAC eight-point fundamental matrix, the
//! essential matrix and its four pose hypotheses, and finally triangulation with cheirality
//! voting. Accepted pairs add their color-tagged points and their translation to a
//! [`Reconstruction`], which can be exported with [`export_ply`].

mod export;
mod pipeline;
mod reconstruction;
mod settings;

pub use export::*;
pub use pipeline::*;
pub use reconstruction::*;
pub use settings::*;
