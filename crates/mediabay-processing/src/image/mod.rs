//! Still-image thumbnailing

pub mod orientation;
pub mod resize;
pub mod thumbnail;

pub use orientation::ImageOrientation;
pub use resize::ImageResize;
pub use thumbnail::{jpeg_destination, RenderedThumbnail, ThumbnailEngine};
