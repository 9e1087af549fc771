//! # Two-view SfM core
//!
//! Common types for the two-view structure-from-motion crates. Every crate in the workspace that
//! passes keypoints, matches, poses, or reconstructed points between stages depends on this crate,
//! so it is kept small and carries no algorithms beyond trivial projections.
//!
//! ## Coordinate conventions
//!
//! * Pixel coordinates put the origin in the top left of the image with `+x` to the right and
//!   `+y` down. A [`KeyPoint`] is always an integer pixel position.
//! * The first camera of a pair is the reference frame: its projection is `[I | 0]`. The second
//!   camera is described by a [`RelativePose`] `[R | t]` mapping a point `X` in the first camera's
//!   frame to `R·X + t` in the second camera's frame.
//! * Depth is the third homogeneous coordinate of `P·[X; 1]`. A point is in front of a camera when
//!   its depth is strictly positive.

mod keypoint;
mod matches;
mod point;
mod pose;

pub use keypoint::*;
pub use matches::*;
pub use nalgebra;
pub use point::*;
pub use pose::*;
pub use sample_consensus;
