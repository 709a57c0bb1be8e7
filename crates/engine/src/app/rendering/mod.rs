pub mod draw;
mod renderer;

pub use renderer::Renderer;
