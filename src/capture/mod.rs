pub mod screenshot;
pub mod traits;
pub mod types;

pub use screenshot::{encode_png, XcapCapture};
pub use traits::ScreenCapture;
pub use types::{CapturedFrame, ScreenContext};
