use kestrel::error::ScanError;
use kestrel::scanner::{scan_tokens, TokenType};
use pretty_assertions::assert_eq;

fn token_types(code: &str) -> Result<Vec<TokenType>, ScanError> {
    Ok(scan_tokens(code)?.into_iter().map(|token| token.token_type).collect())
}

#[test]
fn operators_and_punctuation() -> Result<(), ScanError> {
    assert_eq!(
        vec![
            TokenType::LeftParen,
            TokenType::RightParen,
            TokenType::LeftBrace,
            TokenType::RightBrace,
            TokenType::Comma,
            TokenType::Dot,
            TokenType::Minus,
            TokenType::Plus,
            TokenType::Semicolon,
            TokenType::Slash,
            TokenType::Star,
            TokenType::BangEqual,
            TokenType::Bang,
            TokenType::EqualEqual,
            TokenType::Equal,
            TokenType::LessEqual,
            TokenType::Less,
            TokenType::GreaterEqual,
            TokenType::Greater,
            TokenType::EOF,
        ],
        token_types("(){},.-+;/* != ! == = <= < >= >")?
    );

    Ok(())
}

#[test]
fn literals_keywords_and_identifiers() -> Result<(), ScanError> {
    assert_eq!(
        vec![
            TokenType::Var,
            TokenType::Identifier("answer_2".to_string()),
            TokenType::Equal,
            TokenType::Number(42.5),
            TokenType::Or,
            TokenType::String("text".to_string()),
            TokenType::Semicolon,
            TokenType::EOF,
        ],
        token_types("var answer_2 = 42.5 or \"text\";")?
    );

    Ok(())
}

#[test]
fn trailing_dot_is_not_part_of_number() -> Result<(), ScanError> {
    assert_eq!(
        vec![TokenType::Number(12.0), TokenType::Dot, TokenType::EOF],
        token_types("12.")?
    );

    Ok(())
}

#[test]
fn comments_and_lines() -> Result<(), ScanError> {
    let tokens = scan_tokens("// leading comment\nprint 1; // trailing\n\n\"multi\nline\"")?;
    let lines: Vec<u32> = tokens.iter().map(|token| token.line).collect();
    assert_eq!(vec![2, 2, 2, 5, 5], lines);
    assert_eq!("\"multi\nline\"", tokens[3].lexeme);

    Ok(())
}

#[test]
fn unexpected_character() {
    let error = scan_tokens("var a = 1;\nvar b = @;").expect_err("'@' is not valid");
    assert_eq!(2, error.line);
    assert!(error.message.contains('@'));
}

#[test]
fn unterminated_string() {
    let error = scan_tokens("print \"never closed").expect_err("string is unterminated");
    assert_eq!(1, error.line);
    assert_eq!("Unterminated string.", error.message);
}

#[test]
fn every_reserved_word_is_a_keyword() -> Result<(), ScanError> {
    assert_eq!(
        vec![
            TokenType::And,
            TokenType::Class,
            TokenType::Else,
            TokenType::False,
            TokenType::For,
            TokenType::Fun,
            TokenType::If,
            TokenType::Nil,
            TokenType::Or,
            TokenType::Print,
            TokenType::Return,
            TokenType::Super,
            TokenType::This,
            TokenType::True,
            TokenType::Var,
            TokenType::While,
            TokenType::EOF,
        ],
        token_types("and class else false for fun if nil or print return super this true var while")?
    );

    Ok(())
}

#[test]
fn words_containing_keywords_are_identifiers() -> Result<(), ScanError> {
    assert_eq!(
        vec![
            TokenType::Identifier("orchid".to_string()),
            TokenType::Identifier("classy".to_string()),
            TokenType::Identifier("fund".to_string()),
            TokenType::Identifier("While".to_string()),
            TokenType::Identifier("_var".to_string()),
            TokenType::EOF,
        ],
        token_types("orchid classy fund While _var")?
    );

    Ok(())
}
