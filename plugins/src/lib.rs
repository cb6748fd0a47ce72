pub mod completion;
pub mod executor;
pub mod factory;
