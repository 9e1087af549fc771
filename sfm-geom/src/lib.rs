//! Computational geometry for two calibrated views.
//!
//! ## Triangulation
//!
//! In this problem we know the relative pose of the cameras and the normalized image
//! coordinates of the same feature observed in each camera. We want to find the point of
//! intersection of the two rays.
//!
//! - `p` the point we are trying to triangulate
//! - `a` the normalized keypoint on camera A
//! - `b` the normalized keypoint on camera B
//! - `O` the optical center of a camera
//! - `@` the virtual image plane
//!
//! ```text
//!                        @
//!                        @
//!               p--------b--------O
//!              /         @
//!             /          @
//!            /           @
//!           /            @
//!   @@@@@@@a@@@@@
//!         /
//!        /
//!       /
//!      O
//! ```
//!
//! ## Cheirality
//!
//! The essential matrix leaves four candidate poses. Only the correct one puts the
//! triangulated points in front of both cameras, which [`PoseSelector`] checks with a majority vote
//! per camera.

mod cheirality;
mod triangulation;

pub use cheirality::*;
pub use triangulation::*;
