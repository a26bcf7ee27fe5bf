pub mod image;
pub mod scan;
pub mod state;

pub use image::{is_image_name, EncodedImage, ImageKind, IMAGE_EXTENSIONS};
pub use scan::{
    IdentityProfile, MatchVerdict, RunProgress, ScanCandidate, ScanResult, ScanSnapshot,
    SENTINEL_DESCRIPTION,
};
pub use state::{RunState, TransitionContext};
