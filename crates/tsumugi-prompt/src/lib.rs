pub mod builder;
pub mod context;
pub mod service;

#[cfg(test)]
mod testing;

pub use builder::PromptBuilder;
pub use context::ContextCollector;
pub use service::ResponseService;
