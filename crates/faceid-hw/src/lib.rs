//! faceid-hw — Frame sources and camera acquisition.
//!
//! The camera itself is an external capability: hosts implement
//! [`CameraProvider`] and [`FrameSource`] on top of whatever video stack
//! they own. This crate only fixes the shapes that the session consumes.

pub mod camera;
pub mod frame;

pub use camera::{CameraError, CameraProvider, FrameSource};
pub use frame::{Dimensions, Frame};
