use std::rc::Rc;

use crate::error::SyntaxError;
use crate::scanner::Token;
use crate::scanner::TokenType;
use crate::stack::ensure_sufficient_stack;

use super::expr::{Expr, ExprIdAllocator, LiteralValue};
use super::stmt::{FunctionDeclaration, Stmt};

type SyntaxResult<T> = Result<T, SyntaxError>;
type StmtResult = SyntaxResult<Stmt>;
type ExprResult = SyntaxResult<Expr>;

const MAX_ARGUMENTS: usize = 255;
// Statements and expressions nested inside one another, counted together
const MAX_NESTING: usize = 256;

static END_OF_INPUT: Token = Token {
    token_type: TokenType::EOF,
    lexeme: String::new(),
    line: 0,
};

/// Parse a whole program. Parsing stops at the first syntax error.
pub fn parse(tokens: &[Token], ids: &mut ExprIdAllocator) -> SyntaxResult<Vec<Stmt>> {
    let mut cursor = TokenCursor::new(tokens, ids);
    let mut statements = Vec::new();

    while !cursor.at_end() {
        statements.push(declaration(&mut cursor)?);
    }

    tracing::debug!(count = statements.len(), "parsed top-level statements");
    Ok(statements)
}

fn declaration(cursor: &mut TokenCursor) -> StmtResult {
    if cursor.advance_if_match(&TokenType::Var).is_some() {
        var_declaration(cursor)
    } else if cursor.advance_if_match(&TokenType::Fun).is_some() {
        function_declaration(cursor)
    } else if cursor.peek().token_type == TokenType::Class {
        Err(build_error("Classes are not supported.", cursor.peek()))
    } else {
        statement(cursor)
    }
}

fn var_declaration(cursor: &mut TokenCursor) -> StmtResult {
    let name = consume_identifier(cursor, "Expect variable name.")?;

    let initializer = if cursor.advance_if_match(&TokenType::Equal).is_some() {
        Some(expression(cursor)?)
    } else {
        None
    };

    cursor
        .advance_if_match(&TokenType::Semicolon)
        .ok_or_else(|| build_error("Expect ';' after variable declaration.", cursor.peek()))?;

    Ok(Stmt::Var { name, initializer })
}

fn function_declaration(cursor: &mut TokenCursor) -> StmtResult {
    nested(cursor, function_declaration_body)
}

fn function_declaration_body(cursor: &mut TokenCursor) -> StmtResult {
    let name = consume_identifier(cursor, "Expect function name.")?;
    cursor
        .advance_if_match(&TokenType::LeftParen)
        .ok_or_else(|| build_error("Expect '(' after function name.", cursor.peek()))?;

    let mut params = Vec::new();
    if cursor.peek().token_type != TokenType::RightParen {
        loop {
            if params.len() == MAX_ARGUMENTS {
                tracing::warn!(
                    line = cursor.peek().line,
                    function = %name.lexeme,
                    "function declares more than {MAX_ARGUMENTS} parameters"
                );
            }
            params.push(consume_identifier(cursor, "Expect parameter name.")?);
            if cursor.advance_if_match(&TokenType::Comma).is_none() {
                break;
            }
        }
    }
    cursor
        .advance_if_match(&TokenType::RightParen)
        .ok_or_else(|| build_error("Expect ')' after parameters.", cursor.peek()))?;

    cursor
        .advance_if_match(&TokenType::LeftBrace)
        .ok_or_else(|| build_error("Expect '{' before function body.", cursor.peek()))?;
    let body = block(cursor)?;

    Ok(Stmt::Function {
        declaration: Rc::new(FunctionDeclaration { name, params, body }),
    })
}

fn statement(cursor: &mut TokenCursor) -> StmtResult {
    nested(cursor, statement_body)
}

fn statement_body(cursor: &mut TokenCursor) -> StmtResult {
    if let Some(token) = cursor.advance_if_any_match(&[
        TokenType::If,
        TokenType::Print,
        TokenType::LeftBrace,
        TokenType::While,
        TokenType::For,
        TokenType::Return,
    ]) {
        match token.token_type {
            TokenType::If => if_statement(cursor),
            TokenType::Print => print_statement(token.line, cursor),
            TokenType::LeftBrace => Ok(Stmt::Block {
                statements: block(cursor)?,
            }),
            TokenType::While => while_statement(cursor),
            TokenType::For => for_statement(cursor),
            TokenType::Return => return_statement(token, cursor),
            _ => Err(build_error("Unexpected token type when parsing statement.", &token)),
        }
    } else {
        expression_statement(cursor)
    }
}

fn if_statement(cursor: &mut TokenCursor) -> StmtResult {
    cursor
        .advance_if_match(&TokenType::LeftParen)
        .ok_or_else(|| build_error("Expect '(' after 'if'.", cursor.peek()))?;
    let condition = expression(cursor)?;
    cursor
        .advance_if_match(&TokenType::RightParen)
        .ok_or_else(|| build_error("Expect ')' after if condition.", cursor.peek()))?;

    let then_branch = Box::new(statement(cursor)?);
    let else_branch = if cursor.advance_if_match(&TokenType::Else).is_some() {
        Some(Box::new(statement(cursor)?))
    } else {
        None
    };

    Ok(Stmt::If {
        condition,
        then_branch,
        else_branch,
    })
}

fn print_statement(line: u32, cursor: &mut TokenCursor) -> StmtResult {
    let expression = expression(cursor)?;
    cursor
        .advance_if_match(&TokenType::Semicolon)
        .ok_or_else(|| build_error("Expect ';' after value.", cursor.peek()))?;
    Ok(Stmt::Print { line, expression })
}

fn while_statement(cursor: &mut TokenCursor) -> StmtResult {
    cursor
        .advance_if_match(&TokenType::LeftParen)
        .ok_or_else(|| build_error("Expect '(' after 'while'.", cursor.peek()))?;
    let condition = expression(cursor)?;
    cursor
        .advance_if_match(&TokenType::RightParen)
        .ok_or_else(|| build_error("Expect ')' after condition.", cursor.peek()))?;
    let body = Box::new(statement(cursor)?);

    Ok(Stmt::While { condition, body })
}

// Desugars into `{ initializer; while (condition) { body; increment; } }`
fn for_statement(cursor: &mut TokenCursor) -> StmtResult {
    cursor
        .advance_if_match(&TokenType::LeftParen)
        .ok_or_else(|| build_error("Expect '(' after 'for'.", cursor.peek()))?;

    let initializer = if cursor.advance_if_match(&TokenType::Semicolon).is_some() {
        None
    } else if cursor.advance_if_match(&TokenType::Var).is_some() {
        Some(var_declaration(cursor)?)
    } else {
        Some(expression_statement(cursor)?)
    };

    let condition = if cursor.peek().token_type == TokenType::Semicolon {
        Expr::Literal {
            value: LiteralValue::Boolean(true),
        }
    } else {
        expression(cursor)?
    };
    cursor
        .advance_if_match(&TokenType::Semicolon)
        .ok_or_else(|| build_error("Expect ';' after loop condition.", cursor.peek()))?;

    let increment = if cursor.peek().token_type == TokenType::RightParen {
        None
    } else {
        Some(expression(cursor)?)
    };
    cursor
        .advance_if_match(&TokenType::RightParen)
        .ok_or_else(|| build_error("Expect ')' after for clauses.", cursor.peek()))?;

    let mut body = statement(cursor)?;
    if let Some(increment) = increment {
        body = Stmt::Block {
            statements: vec![body, Stmt::Expression { expression: increment }],
        };
    }

    let mut statements = Vec::with_capacity(2);
    if let Some(initializer) = initializer {
        statements.push(initializer);
    }
    statements.push(Stmt::While {
        condition,
        body: Box::new(body),
    });

    Ok(Stmt::Block { statements })
}

fn return_statement(keyword: Token, cursor: &mut TokenCursor) -> StmtResult {
    let value = if cursor.peek().token_type == TokenType::Semicolon {
        None
    } else {
        Some(expression(cursor)?)
    };
    cursor
        .advance_if_match(&TokenType::Semicolon)
        .ok_or_else(|| build_error("Expect ';' after return value.", cursor.peek()))?;

    Ok(Stmt::Return { keyword, value })
}

fn expression_statement(cursor: &mut TokenCursor) -> StmtResult {
    let expression = expression(cursor)?;
    cursor
        .advance_if_match(&TokenType::Semicolon)
        .ok_or_else(|| build_error("Expect ';' after expression.", cursor.peek()))?;
    Ok(Stmt::Expression { expression })
}

// Assumes the opening brace was already consumed
fn block(cursor: &mut TokenCursor) -> SyntaxResult<Vec<Stmt>> {
    let mut statements = Vec::new();
    while cursor.advance_if_match(&TokenType::RightBrace).is_none() {
        if cursor.at_end() {
            return Err(build_error("Expect '}' after block.", cursor.peek()));
        }
        statements.push(declaration(cursor)?);
    }
    Ok(statements)
}

fn expression(cursor: &mut TokenCursor) -> ExprResult {
    assignment(cursor)
}

fn assignment(cursor: &mut TokenCursor) -> ExprResult {
    let expr = logic_or(cursor)?;

    if let Some(equal) = cursor.advance_if_match(&TokenType::Equal) {
        let value = nested(cursor, assignment)?;

        return match expr {
            Expr::Variable { name, .. } => Ok(Expr::Assign {
                id: cursor.ids.next_id(),
                name,
                value: Box::new(value),
            }),
            _ => Err(build_error("Invalid assignment target.", &equal)),
        };
    }

    Ok(expr)
}

fn logic_or(cursor: &mut TokenCursor) -> ExprResult {
    logical_left_associative(cursor, logic_and, &TokenType::Or)
}

fn logic_and(cursor: &mut TokenCursor) -> ExprResult {
    logical_left_associative(cursor, equality, &TokenType::And)
}

fn logical_left_associative(
    cursor: &mut TokenCursor,
    higher_precedence: fn(&mut TokenCursor) -> ExprResult,
    token_type: &TokenType,
) -> ExprResult {
    let mut expr = higher_precedence(cursor)?;

    while let Some(operator) = cursor.advance_if_match(token_type) {
        let right = higher_precedence(cursor)?;
        expr = Expr::Logical {
            left: Box::new(expr),
            operator,
            right: Box::new(right),
        };
    }

    Ok(expr)
}

fn equality(cursor: &mut TokenCursor) -> ExprResult {
    binary_left_associative(cursor, comparison, &[TokenType::BangEqual, TokenType::EqualEqual])
}

fn comparison(cursor: &mut TokenCursor) -> ExprResult {
    binary_left_associative(
        cursor,
        term,
        &[
            TokenType::Greater,
            TokenType::GreaterEqual,
            TokenType::Less,
            TokenType::LessEqual,
        ],
    )
}

fn term(cursor: &mut TokenCursor) -> ExprResult {
    binary_left_associative(cursor, factor, &[TokenType::Minus, TokenType::Plus])
}

fn factor(cursor: &mut TokenCursor) -> ExprResult {
    binary_left_associative(cursor, unary, &[TokenType::Slash, TokenType::Star])
}

// Parse a binary left associative expression as long as the current token matches one of the given types
fn binary_left_associative(
    cursor: &mut TokenCursor,
    higher_precedence: fn(&mut TokenCursor) -> ExprResult,
    types: &[TokenType],
) -> ExprResult {
    let mut expr = higher_precedence(cursor)?;

    while let Some(operator) = cursor.advance_if_any_match(types) {
        let right = higher_precedence(cursor)?;
        expr = Expr::Binary {
            left: Box::new(expr),
            operator,
            right: Box::new(right),
        };
    }

    Ok(expr)
}

fn unary(cursor: &mut TokenCursor) -> ExprResult {
    nested(cursor, unary_body)
}

fn unary_body(cursor: &mut TokenCursor) -> ExprResult {
    if let Some(operator) = cursor.advance_if_any_match(&[TokenType::Bang, TokenType::Minus]) {
        let right = unary(cursor)?;
        return Ok(Expr::Unary {
            operator,
            right: Box::new(right),
        });
    }

    call(cursor)
}

fn call(cursor: &mut TokenCursor) -> ExprResult {
    let mut expr = primary(cursor)?;

    while cursor.advance_if_match(&TokenType::LeftParen).is_some() {
        expr = finish_call(expr, cursor)?;
    }

    Ok(expr)
}

fn finish_call(callee: Expr, cursor: &mut TokenCursor) -> ExprResult {
    let mut arguments = Vec::new();
    if cursor.peek().token_type != TokenType::RightParen {
        loop {
            if arguments.len() == MAX_ARGUMENTS {
                tracing::warn!(
                    line = cursor.peek().line,
                    "call passes more than {MAX_ARGUMENTS} arguments"
                );
            }
            arguments.push(expression(cursor)?);
            if cursor.advance_if_match(&TokenType::Comma).is_none() {
                break;
            }
        }
    }

    let paren = cursor
        .advance_if_match(&TokenType::RightParen)
        .ok_or_else(|| build_error("Expect ')' after arguments.", cursor.peek()))?;

    Ok(Expr::Call {
        callee: Box::new(callee),
        paren,
        arguments,
    })
}

fn primary(cursor: &mut TokenCursor) -> ExprResult {
    let current = cursor.peek().clone();

    match current.token_type {
        TokenType::False | TokenType::True | TokenType::Nil | TokenType::Number(_) | TokenType::String(_) => {
            let value = LiteralValue::try_from(&current).map_err(|message| build_error(&message, &current))?;
            cursor.advance();
            Ok(Expr::Literal { value })
        }
        TokenType::Identifier(_) => {
            cursor.advance();
            Ok(Expr::Variable {
                id: cursor.ids.next_id(),
                name: current,
            })
        }
        TokenType::LeftParen => {
            cursor.advance();
            let expr = expression(cursor)?;
            cursor
                .advance_if_match(&TokenType::RightParen)
                .ok_or_else(|| build_error("Expect ')' after expression.", cursor.peek()))?;
            Ok(Expr::Grouping {
                expression: Box::new(expr),
            })
        }
        _ => Err(build_error("Expect expression.", &current)),
    }
}

// Every recursive descent passes through here, which bounds how deep the
// later passes over the tree can recurse as well
fn nested<T>(cursor: &mut TokenCursor, parse: fn(&mut TokenCursor) -> SyntaxResult<T>) -> SyntaxResult<T> {
    if cursor.depth == MAX_NESTING {
        return Err(build_error("Too much nesting.", cursor.peek()));
    }

    cursor.depth += 1;
    let result = ensure_sufficient_stack(|| parse(cursor));
    cursor.depth -= 1;
    result
}

fn consume_identifier(cursor: &mut TokenCursor, message: &str) -> SyntaxResult<Token> {
    let current = cursor.peek();
    match current.token_type {
        TokenType::Identifier(_) => {
            let name = current.clone();
            cursor.advance();
            Ok(name)
        }
        _ => Err(build_error(message, current)),
    }
}

fn build_error(message: &str, token: &Token) -> SyntaxError {
    let location = match token.token_type {
        TokenType::EOF => "at end".to_string(),
        _ => format!("at '{}'", token.lexeme),
    };
    SyntaxError {
        line: token.line,
        message: format!("{message} ({location})"),
    }
}

struct TokenCursor<'a> {
    tokens: &'a [Token],
    index: usize,
    depth: usize,
    ids: &'a mut ExprIdAllocator,
}

impl<'a> TokenCursor<'a> {
    fn new(tokens: &'a [Token], ids: &'a mut ExprIdAllocator) -> TokenCursor<'a> {
        TokenCursor {
            tokens,
            index: 0,
            depth: 0,
            ids,
        }
    }

    // Token streams without a trailing EOF are treated as if they had one
    fn peek(&self) -> &Token {
        self.tokens.get(self.index).unwrap_or(&END_OF_INPUT)
    }

    fn advance(&mut self) {
        if !self.at_end() {
            self.index += 1;
        }
    }

    fn at_end(&self) -> bool {
        matches!(self.peek().token_type, TokenType::EOF)
    }

    fn advance_if_match(&mut self, token_type: &TokenType) -> Option<Token> {
        let token = self.peek();
        if token.token_type == *token_type {
            let cloned = token.clone();
            self.advance();
            Some(cloned)
        } else {
            None
        }
    }

    // Compares the full token type, so literal-carrying types never match here
    fn advance_if_any_match(&mut self, types: &[TokenType]) -> Option<Token> {
        let token = self.peek();
        if types.contains(&token.token_type) {
            let cloned = token.clone();
            self.advance();
            Some(cloned)
        } else {
            None
        }
    }
}
