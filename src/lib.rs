pub mod anchored;
pub mod area;
pub mod base_image;
pub mod block;
pub mod canvas;
pub mod channel_displacement;
pub mod geometry;
pub mod host;
pub mod noise;
pub mod page;
pub mod post_process;
pub mod sample;
pub mod scene;
pub mod schema;
pub mod source;
