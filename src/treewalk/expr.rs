use std::fmt;

use crate::scanner::Token;
use crate::scanner::TokenType;

/// Identity of a variable reference site, assigned by the parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExprId(pub u32);

/// Hands out `ExprId`s. One allocator lives as long as the interpreter that
/// owns it, so ids stay unique across separately parsed programs.
#[derive(Debug, Default)]
pub struct ExprIdAllocator {
    next: u32,
}

impl ExprIdAllocator {
    pub fn next_id(&mut self) -> ExprId {
        let id = ExprId(self.next);
        self.next += 1;
        id
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Assign {
        id: ExprId,
        name: Token,
        value: Box<Expr>,
    },
    Binary {
        left: Box<Expr>,
        operator: Token,
        right: Box<Expr>,
    },
    Call {
        callee: Box<Expr>,
        paren: Token,
        arguments: Vec<Expr>,
    },
    Grouping {
        expression: Box<Expr>,
    },
    Literal {
        value: LiteralValue,
    },
    Logical {
        left: Box<Expr>,
        operator: Token,
        right: Box<Expr>,
    },
    Unary {
        operator: Token,
        right: Box<Expr>,
    },
    Variable {
        id: ExprId,
        name: Token,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    Boolean(bool),
    Nil,
    Number(f64),
    String(String),
}

impl fmt::Display for LiteralValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Boolean(value) => write!(f, "{value}"),
            Self::Nil => write!(f, "nil"),
            Self::Number(value) => write!(f, "{value}"),
            Self::String(value) => write!(f, "{value}"),
        }
    }
}

impl TryFrom<&Token> for LiteralValue {
    type Error = String;

    fn try_from(token: &Token) -> Result<LiteralValue, String> {
        match &token.token_type {
            TokenType::False => Ok(LiteralValue::Boolean(false)),
            TokenType::True => Ok(LiteralValue::Boolean(true)),
            TokenType::Nil => Ok(LiteralValue::Nil),
            TokenType::Number(value) => Ok(LiteralValue::Number(*value)),
            TokenType::String(value) => Ok(LiteralValue::String(value.clone())),
            _ => Err(format!("Cannot make literal value from token '{}'.", token.lexeme)),
        }
    }
}

pub fn print_ast(root: &Expr) -> String {
    let mut printed = String::new();
    format_expr(root, &mut printed);
    printed
}

pub(super) fn format_expr(expr: &Expr, output: &mut String) {
    match expr {
        Expr::Assign { name, value, .. } => {
            format_subexprs(&format!("= {}", name.lexeme), &[value.as_ref()], output);
        }
        Expr::Binary { left, operator, right } | Expr::Logical { left, operator, right } => {
            format_subexprs(&operator.lexeme, &[left.as_ref(), right.as_ref()], output);
        }
        Expr::Call { callee, arguments, .. } => {
            let mut parts: Vec<&Expr> = vec![callee.as_ref()];
            parts.extend(arguments.iter());
            format_subexprs("call", &parts, output);
        }
        Expr::Grouping { expression } => {
            format_subexprs("group", &[expression.as_ref()], output);
        }
        Expr::Literal { value } => match value {
            LiteralValue::String(text) => {
                output.push('"');
                output.push_str(text);
                output.push('"');
            }
            _ => output.push_str(&value.to_string()),
        },
        Expr::Unary { operator, right } => {
            format_subexprs(&operator.lexeme, &[right.as_ref()], output);
        }
        Expr::Variable { name, .. } => {
            output.push_str(&name.lexeme);
        }
    }
}

fn format_subexprs(name: &str, exprs: &[&Expr], output: &mut String) {
    output.push('(');
    output.push_str(name);
    for expr in exprs {
        output.push(' ');
        format_expr(expr, output);
    }
    output.push(')');
}
