pub mod camera;
pub mod time;
pub mod transform;

pub use camera::Camera;
pub use time::Time;
pub use transform::Transform;
