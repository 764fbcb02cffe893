pub mod blur;
pub mod brush;
pub mod scene;
pub mod stamp;
pub mod surface;

pub use scene::{FrameParams, SceneRenderer};
pub use stamp::StampAssets;
pub use surface::{BlendMode, Surface};
