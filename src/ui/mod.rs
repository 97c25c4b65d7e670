//! Terminal output: markup rendering, semantic messages and prompts.

pub mod markup;
mod prompt;
mod renderer;
mod style;

pub use prompt::{ReadArgs, Validator};
pub use renderer::{
    MessageKind, Renderer, RendererConfig, Status, TaskArgs, TaskOutcome, WriteArgs,
};
pub use style::Style;
