pub mod camera;
pub mod geometry;
pub mod input;
pub mod logging;
pub mod minimap;
pub mod motion;
pub mod orientation;
pub mod registry;
pub mod scene;
pub mod sensor_feed;
pub mod serde_duration;
pub mod settings;
pub mod triggers;
