pub mod asset_server;
pub mod assets;
pub mod error;
pub mod geometry;
pub mod primitives;
pub mod texture;

pub use asset_server::{AssetEvent, AssetServer};
pub use assets::Handle;
pub use error::{AssetError, Result};
pub use geometry::{DrawMode, Geometry, IndexBuffer, IndexWidth, create_index_buffer};
pub use texture::{TextureData, TextureFormat};
