pub mod lmstudio;
pub mod openrouter;
mod responses;
mod sse;

pub use lmstudio::LmStudioProvider;
pub use openrouter::OpenRouterProvider;
