pub mod gateway;
pub mod image;
pub mod tokens;

pub use gateway::HttpGateway;
pub use image::JpegNormalizer;
pub use tokens::FileTokenStore;
