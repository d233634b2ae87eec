use std::result;

use rustc_hash::FxHashMap;

use crate::error::ResolutionError;
use crate::scanner::Token;

use super::expr::Expr;
use super::expr::ExprId;
use super::stmt::FunctionDeclaration;
use super::stmt::Stmt;

/// Binding distance for every local variable reference. References missing
/// from the table are globals and get looked up by name at run time.
pub type Resolutions = FxHashMap<ExprId, usize>;

type UnitResult = result::Result<(), ResolutionError>;

#[derive(Debug, Clone, Copy, PartialEq)]
enum FunctionContext {
    None,
    Function,
}

struct VarScopes {
    // false = declared, true = defined and readable
    stack: Vec<FxHashMap<String, bool>>,
    resolutions: Resolutions,
    function_context: FunctionContext,
}

impl VarScopes {
    fn new() -> VarScopes {
        VarScopes {
            stack: Vec::new(),
            resolutions: Resolutions::default(),
            function_context: FunctionContext::None,
        }
    }

    fn push(&mut self) {
        self.stack.push(FxHashMap::default());
    }

    fn pop(&mut self) {
        self.stack.pop();
    }

    // Global scope is not tracked, so both of these are no-ops at the top level
    fn declare(&mut self, name: &Token) {
        if let Some(frame) = self.stack.last_mut() {
            frame.insert(name.lexeme.clone(), false);
        }
    }

    fn define(&mut self, name: &Token) {
        if let Some(frame) = self.stack.last_mut() {
            frame.insert(name.lexeme.clone(), true);
        }
    }

    fn is_declared_but_undefined(&self, name: &str) -> bool {
        self.stack
            .last()
            .and_then(|frame| frame.get(name))
            .is_some_and(|defined| !defined)
    }

    fn resolve_local(&mut self, id: ExprId, name: &Token) {
        for (index, frame) in self.stack.iter().enumerate().rev() {
            if frame.contains_key(&name.lexeme) {
                let distance = self.stack.len() - 1 - index;
                tracing::trace!(name = %name.lexeme, line = name.line, distance, "resolved local");
                self.resolutions.insert(id, distance);
                return;
            }
        }
        tracing::trace!(name = %name.lexeme, line = name.line, "resolved global");
    }
}

pub fn resolve(statements: &[Stmt]) -> result::Result<Resolutions, ResolutionError> {
    let mut scope = VarScopes::new();
    for statement in statements {
        resolve_statement(statement, &mut scope)?;
    }
    tracing::debug!(locals = scope.resolutions.len(), "resolved program");
    Ok(scope.resolutions)
}

fn resolve_statement(statement: &Stmt, scope: &mut VarScopes) -> UnitResult {
    match statement {
        Stmt::Block { statements } => block_statement(statements, scope),
        Stmt::Expression { expression } => resolve_expr(expression, scope),
        Stmt::Function { declaration } => function_statement(declaration, scope),
        Stmt::If {
            condition,
            then_branch,
            else_branch,
        } => if_statement(condition, then_branch, else_branch.as_deref(), scope),
        Stmt::Print { expression, .. } => resolve_expr(expression, scope),
        Stmt::Return { keyword, value } => return_statement(keyword, value.as_ref(), scope),
        Stmt::Var { name, initializer } => var_statement(name, initializer.as_ref(), scope),
        Stmt::While { condition, body } => while_statement(condition, body, scope),
    }
}

fn block_statement(statements: &[Stmt], scope: &mut VarScopes) -> UnitResult {
    scope.push();
    // resolution bails out completely on error, so the stack is not restored in that case
    for statement in statements {
        resolve_statement(statement, scope)?;
    }
    scope.pop();
    Ok(())
}

fn function_statement(declaration: &FunctionDeclaration, scope: &mut VarScopes) -> UnitResult {
    // defined before the body is resolved so the function can call itself
    scope.declare(&declaration.name);
    scope.define(&declaration.name);

    let enclosing_context = scope.function_context;
    scope.function_context = FunctionContext::Function;

    scope.push();
    for param in &declaration.params {
        scope.declare(param);
        scope.define(param);
    }
    for statement in &declaration.body {
        resolve_statement(statement, scope)?;
    }
    scope.pop();

    scope.function_context = enclosing_context;
    Ok(())
}

fn if_statement(
    condition: &Expr,
    then_branch: &Stmt,
    else_branch: Option<&Stmt>,
    scope: &mut VarScopes,
) -> UnitResult {
    resolve_expr(condition, scope)?;
    resolve_statement(then_branch, scope)?;
    if let Some(else_statement) = else_branch {
        resolve_statement(else_statement, scope)?;
    }
    Ok(())
}

fn return_statement(keyword: &Token, value: Option<&Expr>, scope: &mut VarScopes) -> UnitResult {
    if scope.function_context == FunctionContext::None {
        return Err(build_error("Can't return from top-level code.", keyword.line));
    }
    match value {
        Some(value) => resolve_expr(value, scope),
        None => Ok(()),
    }
}

fn var_statement(name: &Token, initializer: Option<&Expr>, scope: &mut VarScopes) -> UnitResult {
    scope.declare(name);
    if let Some(initializer) = initializer {
        resolve_expr(initializer, scope)?;
    }
    scope.define(name);
    Ok(())
}

fn while_statement(condition: &Expr, body: &Stmt, scope: &mut VarScopes) -> UnitResult {
    resolve_expr(condition, scope)?;
    resolve_statement(body, scope)
}

fn resolve_expr(expression: &Expr, scope: &mut VarScopes) -> UnitResult {
    match expression {
        Expr::Assign { id, name, value } => {
            resolve_expr(value, scope)?;
            scope.resolve_local(*id, name);
            Ok(())
        }
        Expr::Binary { left, right, .. } | Expr::Logical { left, right, .. } => {
            resolve_expr(left, scope)?;
            resolve_expr(right, scope)
        }
        Expr::Call { callee, arguments, .. } => {
            resolve_expr(callee, scope)?;
            for argument in arguments {
                resolve_expr(argument, scope)?;
            }
            Ok(())
        }
        Expr::Grouping { expression } => resolve_expr(expression, scope),
        Expr::Literal { .. } => Ok(()),
        Expr::Unary { right, .. } => resolve_expr(right, scope),
        Expr::Variable { id, name } => resolve_variable(*id, name, scope),
    }
}

fn resolve_variable(id: ExprId, name: &Token, scope: &mut VarScopes) -> UnitResult {
    if scope.is_declared_but_undefined(&name.lexeme) {
        return Err(build_error(
            &format!("Can't read local variable ({}) in its own initializer.", name.lexeme),
            name.line,
        ));
    }
    scope.resolve_local(id, name);
    Ok(())
}

fn build_error(message: &str, line: u32) -> ResolutionError {
    ResolutionError {
        line,
        message: message.to_string(),
    }
}
