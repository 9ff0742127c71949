pub mod events;
pub mod host;
pub mod placement;
pub mod portal;
pub mod scene;
pub mod transition;
pub mod traversal;
