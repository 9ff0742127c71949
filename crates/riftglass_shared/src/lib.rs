pub mod camera;
pub mod clip;
pub mod layers;
pub mod pose;
pub mod settings;
pub mod sync;
