mod app;
mod channel;
mod decoder;
mod editor;
mod net;
mod overlay;
mod viewport;

pub use app::Viewer;
