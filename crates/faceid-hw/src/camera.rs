//! Camera acquisition capability.
//!
//! A [`CameraProvider`] is asked once per session for a live
//! [`FrameSource`]. Permission prompts, device selection and stream
//! negotiation all happen behind it.

use crate::frame::{Dimensions, Frame};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CameraError {
    #[error("camera capture is not supported on this device")]
    Unsupported,
    #[error("camera permission denied: {0}")]
    PermissionDenied(String),
    #[error("device not found: {0}")]
    DeviceNotFound(String),
    #[error("device busy")]
    DeviceBusy,
    #[error("capture failed: {0}")]
    CaptureFailed(String),
}

impl CameraError {
    /// True when the environment has no camera capability at all, as
    /// opposed to a camera that exists but could not be opened.
    pub fn is_unsupported(&self) -> bool {
        matches!(self, CameraError::Unsupported)
    }
}

/// A live video frame provider with known pixel dimensions.
pub trait FrameSource: Send + Sync {
    /// Native pixel dimensions of captured frames.
    fn dimensions(&self) -> Dimensions;

    /// Whether the stream is still delivering frames.
    fn is_live(&self) -> bool {
        true
    }

    /// Grab the most recent frame.
    fn capture_frame(&self) -> Result<Frame, CameraError>;
}

/// Opens a frame source, typically behind a permission grant.
#[async_trait]
pub trait CameraProvider: Send + Sync {
    async fn open(&self) -> Result<Arc<dyn FrameSource>, CameraError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Blank {
        dims: Dimensions,
    }

    impl FrameSource for Blank {
        fn dimensions(&self) -> Dimensions {
            self.dims
        }

        fn capture_frame(&self) -> Result<Frame, CameraError> {
            let len = (self.dims.width * self.dims.height) as usize;
            Ok(Frame::new(vec![0u8; len], self.dims.width, self.dims.height, 0))
        }
    }

    struct Denied;

    #[async_trait]
    impl CameraProvider for Denied {
        async fn open(&self) -> Result<Arc<dyn FrameSource>, CameraError> {
            Err(CameraError::PermissionDenied("user dismissed prompt".into()))
        }
    }

    #[test]
    fn test_frame_source_defaults_to_live() {
        let src = Blank { dims: Dimensions::new(8, 6) };
        assert!(src.is_live());
        let frame = src.capture_frame().unwrap();
        assert_eq!(frame.data.len(), 48);
        assert_eq!(frame.dimensions(), src.dimensions());
    }

    #[test]
    fn test_is_unsupported() {
        assert!(CameraError::Unsupported.is_unsupported());
        assert!(!CameraError::DeviceBusy.is_unsupported());
        assert!(!CameraError::PermissionDenied("x".into()).is_unsupported());
    }

    #[tokio::test]
    async fn test_provider_error_propagates() {
        let err = Denied.open().await.err().unwrap();
        assert!(matches!(err, CameraError::PermissionDenied(_)));
        assert_eq!(err.to_string(), "camera permission denied: user dismissed prompt");
    }
}
