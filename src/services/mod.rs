pub mod artifact_store;
pub mod capture_loop;
pub mod digest;
pub mod pdf_writer;
pub mod screen_capture;
pub mod virtual_device;
pub mod window_focus;

pub use artifact_store::{ArtifactStore, JpegArtifactStore};
pub use capture_loop::{CaptureLoop, RunConfig, RunResult, StopReason};
pub use screen_capture::{FrameSource, XcapCapturer};
pub use virtual_device::{SignalSender, VirtualDevice};
pub use window_focus::WindowFocus;
