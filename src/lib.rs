pub mod error;
pub mod scanner;
mod stack;
pub mod treewalk;

pub use treewalk::environment::Environment;
pub use treewalk::{execute, ExecutionResult, Interpreter};
