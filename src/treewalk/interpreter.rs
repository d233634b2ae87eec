use std::io::Write;
use std::mem;
use std::rc::Rc;
use std::result;

use crate::error::{ResolutionError, RuntimeError, RuntimeErrorKind, SyntaxError};
use crate::scanner::Token;
use crate::scanner::TokenType;
use crate::stack::ensure_sufficient_stack;

use super::environment::Environment;
use super::environment::KestrelFunction;
use super::environment::KestrelValue;
use super::expr::{Expr, ExprId, ExprIdAllocator, LiteralValue};
use super::parser;
use super::resolver::{self, Resolutions};
use super::stmt::{FunctionDeclaration, Stmt};

type ValueResult = result::Result<KestrelValue, RuntimeError>;
type StatementResult = result::Result<Flow, RuntimeError>;

/// Deepest chain of active function calls before a program is stopped.
const MAX_CALL_DEPTH: usize = 4096;

/// How control leaves a statement. `Return` unwinds every enclosing block and
/// loop until the function call that is currently running consumes it.
#[derive(Debug, Clone, PartialEq)]
pub enum Flow {
    Normal,
    Return(KestrelValue),
}

/// Owns the global scope and the binding distances of every program it has
/// resolved, so one instance can run a sequence of REPL submissions.
///
/// Distances are kept for the lifetime of the interpreter. Functions declared
/// in one submission can run in any later one and still need the distances of
/// their bodies, so the table grows by one entry per local reference ever
/// submitted.
pub struct Interpreter<'a> {
    globals: Environment,
    environment: Environment,
    locals: Resolutions,
    ids: ExprIdAllocator,
    call_depth: usize,
    output_writer: &'a mut dyn Write,
}

impl<'a> Interpreter<'a> {
    pub fn new(output_writer: &'a mut dyn Write) -> Interpreter<'a> {
        let globals = Environment::new_global();
        Interpreter {
            environment: globals.clone(),
            globals,
            locals: Resolutions::default(),
            ids: ExprIdAllocator::default(),
            call_depth: 0,
            output_writer,
        }
    }

    pub fn globals(&self) -> &Environment {
        &self.globals
    }

    pub fn parse(&mut self, tokens: &[Token]) -> result::Result<Vec<Stmt>, SyntaxError> {
        parser::parse(tokens, &mut self.ids)
    }

    /// Record binding distances for `statements`. Nothing is kept if resolution fails.
    pub fn resolve(&mut self, statements: &[Stmt]) -> result::Result<(), ResolutionError> {
        let resolutions = resolver::resolve(statements)?;
        self.locals.extend(resolutions);
        Ok(())
    }

    /// Execute statements in order, stopping at the first runtime error.
    ///
    /// `statements` must have gone through [`Interpreter::resolve`] on this
    /// interpreter first. References without a recorded distance are looked up
    /// in the global scope, so an unresolved program reads globals where it
    /// meant locals.
    pub fn interpret(&mut self, statements: &[Stmt]) -> result::Result<(), RuntimeError> {
        for statement in statements {
            if let Flow::Return(_) = self.execute_statement(statement)? {
                // only reachable when the resolver was skipped
                break;
            }
        }
        Ok(())
    }

    fn execute_statement(&mut self, statement: &Stmt) -> StatementResult {
        ensure_sufficient_stack(|| self.execute_statement_inner(statement))
    }

    fn execute_statement_inner(&mut self, statement: &Stmt) -> StatementResult {
        match statement {
            Stmt::Block { statements } => {
                let environment = Environment::new_enclosed(&self.environment);
                self.execute_block(statements, environment)
            }
            Stmt::Expression { expression } => {
                self.evaluate(expression)?;
                Ok(Flow::Normal)
            }
            Stmt::Function { declaration } => self.function_statement(declaration),
            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => self.if_statement(condition, then_branch, else_branch.as_deref()),
            Stmt::Print { line, expression } => self.print_statement(*line, expression),
            Stmt::Return { value, .. } => self.return_statement(value.as_ref()),
            Stmt::Var { name, initializer } => self.var_statement(name, initializer.as_ref()),
            Stmt::While { condition, body } => self.while_statement(condition, body),
        }
    }

    fn execute_block(&mut self, statements: &[Stmt], environment: Environment) -> StatementResult {
        let previous = mem::replace(&mut self.environment, environment);

        let mut result = Ok(Flow::Normal);
        for statement in statements {
            result = self.execute_statement(statement);
            if !matches!(result, Ok(Flow::Normal)) {
                break;
            }
        }

        // make sure to restore the scope even after an error or an early return
        self.environment = previous;
        result
    }

    fn function_statement(&mut self, declaration: &Rc<FunctionDeclaration>) -> StatementResult {
        let function = KestrelFunction {
            declaration: Rc::clone(declaration),
            closure: self.environment.clone(),
        };
        self.environment
            .define(&declaration.name.lexeme, KestrelValue::Function(Rc::new(function)));
        Ok(Flow::Normal)
    }

    fn if_statement(&mut self, condition: &Expr, then_branch: &Stmt, else_branch: Option<&Stmt>) -> StatementResult {
        if self.evaluate(condition)?.is_truthy() {
            self.execute_statement(then_branch)
        } else if let Some(else_statement) = else_branch {
            self.execute_statement(else_statement)
        } else {
            Ok(Flow::Normal)
        }
    }

    fn print_statement(&mut self, line: u32, expression: &Expr) -> StatementResult {
        let result = self.evaluate(expression)?;
        writeln!(self.output_writer, "{result}").map_err(|error| {
            RuntimeError::new(
                RuntimeErrorKind::Output,
                line,
                &format!("Could not write program output: {error}"),
            )
        })?;
        Ok(Flow::Normal)
    }

    fn return_statement(&mut self, value: Option<&Expr>) -> StatementResult {
        let return_value = match value {
            Some(expression) => self.evaluate(expression)?,
            None => KestrelValue::NIL,
        };
        Ok(Flow::Return(return_value))
    }

    fn var_statement(&mut self, name: &Token, initializer: Option<&Expr>) -> StatementResult {
        // uninitialized variables default to nil
        let value = match initializer {
            Some(initializer) => self.evaluate(initializer)?,
            None => KestrelValue::NIL,
        };
        self.environment.define(&name.lexeme, value);
        Ok(Flow::Normal)
    }

    fn while_statement(&mut self, condition: &Expr, body: &Stmt) -> StatementResult {
        while self.evaluate(condition)?.is_truthy() {
            if let Flow::Return(value) = self.execute_statement(body)? {
                return Ok(Flow::Return(value));
            }
        }
        Ok(Flow::Normal)
    }

    fn evaluate(&mut self, expression: &Expr) -> ValueResult {
        ensure_sufficient_stack(|| self.evaluate_inner(expression))
    }

    fn evaluate_inner(&mut self, expression: &Expr) -> ValueResult {
        match expression {
            Expr::Assign { id, name, value } => self.evaluate_assign(*id, name, value),
            Expr::Binary { left, operator, right } => self.evaluate_binary(left, operator, right),
            Expr::Call {
                callee,
                paren,
                arguments,
            } => self.evaluate_call(callee, paren, arguments),
            Expr::Grouping { expression } => self.evaluate(expression),
            Expr::Literal { value } => Ok(KestrelValue::from(value.clone())),
            Expr::Logical { left, operator, right } => self.evaluate_logical(left, operator, right),
            Expr::Unary { operator, right } => self.evaluate_unary(operator, right),
            Expr::Variable { id, name } => self.look_up_variable(*id, name),
        }
    }

    fn evaluate_assign(&mut self, id: ExprId, name: &Token, value: &Expr) -> ValueResult {
        let result = self.evaluate(value)?;
        let assigned = match self.locals.get(&id) {
            Some(distance) => self.environment.assign_at(*distance, &name.lexeme, result.clone()),
            None => self.globals.assign(&name.lexeme, result.clone()),
        };
        assigned.map_err(|error| error.at_line(name.line))?;
        Ok(result)
    }

    fn evaluate_binary(&mut self, left: &Expr, operator: &Token, right: &Expr) -> ValueResult {
        let left_evaluated = self.evaluate(left)?;
        let right_evaluated = self.evaluate(right)?;

        let evaluated = match operator.token_type {
            TokenType::EqualEqual => LiteralValue::Boolean(left_evaluated == right_evaluated),
            TokenType::BangEqual => LiteralValue::Boolean(left_evaluated != right_evaluated),
            TokenType::Plus => match (&left_evaluated, &right_evaluated) {
                (KestrelValue::Literal(LiteralValue::String(left)), KestrelValue::Literal(LiteralValue::String(right))) => {
                    LiteralValue::String(format!("{left}{right}"))
                }
                _ => {
                    let (left_number, right_number) = number_operands(&left_evaluated, &right_evaluated)
                        .ok_or_else(|| {
                            RuntimeError::type_error(operator.line, "Operands of '+' must be two numbers or two strings.")
                        })?;
                    LiteralValue::Number(left_number + right_number)
                }
            },
            _ => {
                let (left_number, right_number) =
                    number_operands(&left_evaluated, &right_evaluated).ok_or_else(|| {
                        RuntimeError::type_error(
                            operator.line,
                            &format!("Operands of '{}' must be numbers.", operator.lexeme),
                        )
                    })?;

                match operator.token_type {
                    TokenType::Minus => LiteralValue::Number(left_number - right_number),
                    TokenType::Slash => LiteralValue::Number(left_number / right_number),
                    TokenType::Star => LiteralValue::Number(left_number * right_number),
                    TokenType::Greater => LiteralValue::Boolean(left_number > right_number),
                    TokenType::GreaterEqual => LiteralValue::Boolean(left_number >= right_number),
                    TokenType::Less => LiteralValue::Boolean(left_number < right_number),
                    TokenType::LessEqual => LiteralValue::Boolean(left_number <= right_number),
                    // unhandled case here indicates a bug in the parser
                    _ => unreachable!("Unhandled binary operation type: {:?}", operator.token_type),
                }
            }
        };
        Ok(KestrelValue::from(evaluated))
    }

    fn evaluate_call(&mut self, callee: &Expr, paren: &Token, arguments: &[Expr]) -> ValueResult {
        let callee = self.evaluate(callee)?;

        let mut evaluated_args = Vec::with_capacity(arguments.len());
        for argument in arguments {
            evaluated_args.push(self.evaluate(argument)?);
        }

        match callee {
            KestrelValue::Function(function) => self.call_function(&function, evaluated_args, paren.line),
            other => Err(RuntimeError::new(
                RuntimeErrorKind::NotCallable,
                paren.line,
                &format!("Can only call functions, not ({other})."),
            )),
        }
    }

    fn call_function(&mut self, function: &KestrelFunction, arguments: Vec<KestrelValue>, line: u32) -> ValueResult {
        if arguments.len() != function.arity() {
            return Err(RuntimeError::new(
                RuntimeErrorKind::Arity {
                    expected: function.arity(),
                    actual: arguments.len(),
                },
                line,
                &format!(
                    "Function ({}) expected {} arguments but got {}.",
                    function.name(),
                    function.arity(),
                    arguments.len()
                ),
            ));
        }

        if self.call_depth == MAX_CALL_DEPTH {
            return Err(RuntimeError::new(
                RuntimeErrorKind::StackOverflow,
                line,
                &format!("Stack overflow calling ({}).", function.name()),
            ));
        }

        tracing::trace!(function = function.name(), line, depth = self.call_depth, "calling function");

        // the call scope hangs off the closure, never off the caller's scope
        let environment = Environment::new_enclosed(&function.closure);
        for (param, argument) in function.declaration.params.iter().zip(arguments) {
            environment.define(&param.lexeme, argument);
        }

        self.call_depth += 1;
        let result = self.execute_block(&function.declaration.body, environment);
        self.call_depth -= 1;

        match result? {
            Flow::Return(value) => Ok(value),
            Flow::Normal => Ok(KestrelValue::NIL),
        }
    }

    fn evaluate_logical(&mut self, left: &Expr, operator: &Token, right: &Expr) -> ValueResult {
        let left_evaluated = self.evaluate(left)?;

        // short circuit if possible
        let short_circuit = match operator.token_type {
            TokenType::Or => left_evaluated.is_truthy(),
            TokenType::And => !left_evaluated.is_truthy(),
            // unhandled case here indicates a bug in the parser
            _ => unreachable!("Unhandled logical operator: {:?}", operator.token_type),
        };
        if short_circuit {
            return Ok(left_evaluated);
        }

        self.evaluate(right)
    }

    fn evaluate_unary(&mut self, operator: &Token, right: &Expr) -> ValueResult {
        let operand = self.evaluate(right)?;
        let evaluated = match operator.token_type {
            TokenType::Bang => LiteralValue::Boolean(!operand.is_truthy()),
            TokenType::Minus => {
                let original = operand
                    .as_number()
                    .ok_or_else(|| RuntimeError::type_error(operator.line, "Operand of '-' must be a number."))?;
                LiteralValue::Number(-original)
            }
            // unhandled case here indicates a bug in the parser
            _ => unreachable!("Unary expression not implemented in interpreter: {:?}", operator),
        };
        Ok(KestrelValue::from(evaluated))
    }

    fn look_up_variable(&self, id: ExprId, name: &Token) -> ValueResult {
        let value = match self.locals.get(&id) {
            Some(distance) => self.environment.get_at(*distance, &name.lexeme),
            None => self.globals.get(&name.lexeme),
        };
        value.map_err(|error| error.at_line(name.line))
    }
}

fn number_operands(left: &KestrelValue, right: &KestrelValue) -> Option<(f64, f64)> {
    Some((left.as_number()?, right.as_number()?))
}
