pub mod thumbnail;

pub use thumbnail::{generate_thumbnail, get_image_size, Size};
