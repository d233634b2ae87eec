mod expr;
mod interpreter;
mod parser;
mod resolver;
mod stmt;

pub mod environment;

pub use expr::{print_ast, Expr, ExprId, LiteralValue};
pub use interpreter::{Flow, Interpreter};
pub use resolver::{resolve, Resolutions};
pub use stmt::{print_program, FunctionDeclaration, Stmt};

use crate::error::KestrelResult;
use crate::scanner;

pub type ExecutionResult = KestrelResult<()>;

/// Scan, parse, resolve and run `code` against the interpreter's global scope.
pub fn execute(code: &str, interpreter: &mut Interpreter) -> ExecutionResult {
    let tokens = scanner::scan_tokens(code)?;
    let statements = interpreter.parse(&tokens)?;
    if tracing::enabled!(tracing::Level::TRACE) {
        tracing::trace!(ast = %print_program(&statements), "parsed program");
    }
    interpreter.resolve(&statements)?;
    interpreter.interpret(&statements)?;
    Ok(())
}
