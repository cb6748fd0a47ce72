pub mod completion;
pub mod decomposition;
pub mod executor;
pub mod skill;

pub use completion::CompletionError;
pub use decomposition::DecompositionError;
pub use executor::ExecutorError;
pub use skill::SkillError;
