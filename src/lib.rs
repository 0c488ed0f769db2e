pub mod compositor;
pub mod config;
pub mod error;
pub mod events;
pub mod export;
pub mod selection;
pub mod session;
pub mod processing {
    pub mod color;
    pub mod filters;
    pub mod geometry;
    pub mod layout;
    pub mod resize;
}
pub mod tasks {
    pub mod loader;
    pub mod renderer;
}
