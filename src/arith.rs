use crate::error::TranslateError;
use crate::lexer;
use crate::runtime::{RuntimeHelper, RuntimeUsage, c_string};

const OPERATORS: [char; 6] = ['+', '-', '*', '/', '%', '^'];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Bare identifier, `$NAME` or `${NAME}`.
    Var(String),
    Status,
    BackgroundPid,
    Number(String),
    Operator(char),
    LParen,
    RParen,
}

pub fn tokenize(body: &str) -> Result<Vec<Token>, TranslateError> {
    let mut tokens = Vec::new();
    let mut chars = body.chars().peekable();

    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
        } else if c == '$' {
            chars.next();
            match chars.peek().copied() {
                Some('{') => {
                    chars.next();
                    let name: String = chars.by_ref().take_while(|&ch| ch != '}').collect();
                    if !lexer::is_identifier(&name) {
                        return Err(TranslateError::unsupported(format!("${{{}}} in arithmetic", name)));
                    }
                    tokens.push(Token::Var(name));
                }
                Some('?') => {
                    chars.next();
                    tokens.push(Token::Status);
                }
                Some('!') => {
                    chars.next();
                    tokens.push(Token::BackgroundPid);
                }
                Some(ch) if ch.is_ascii_alphabetic() || ch == '_' => {
                    tokens.push(Token::Var(take_word(&mut chars)));
                }
                _ => return Err(TranslateError::operator("$")),
            }
        } else if c.is_ascii_alphabetic() || c == '_' {
            tokens.push(Token::Var(take_word(&mut chars)));
        } else if c.is_ascii_digit() {
            tokens.push(Token::Number(take_word(&mut chars)));
        } else if c == '(' {
            chars.next();
            tokens.push(Token::LParen);
        } else if c == ')' {
            chars.next();
            tokens.push(Token::RParen);
        } else if OPERATORS.contains(&c) {
            chars.next();
            if c == '*' && chars.peek() == Some(&'*') {
                return Err(TranslateError::operator("**"));
            }
            tokens.push(Token::Operator(c));
        } else {
            let mut op = String::new();
            while let Some(&ch) = chars.peek() {
                if ch.is_whitespace() || ch.is_ascii_alphanumeric() || ch == '_' || ch == '$' || ch == '(' || ch == ')' {
                    break;
                }
                op.push(ch);
                chars.next();
            }
            return Err(TranslateError::operator(op));
        }
    }
    Ok(tokens)
}

fn take_word(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> String {
    let mut word = String::new();
    while let Some(&ch) = chars.peek() {
        if !(ch.is_ascii_alphanumeric() || ch == '_') {
            break;
        }
        word.push(ch);
        chars.next();
    }
    word
}

/// Translates the body of `$(( ... ))` into a parenthesized C `long`
/// expression. Operand coercion is the only rewrite; precedence and
/// parenthesis balance are left to the C compiler.
pub fn translate(body: &str, usage: &mut RuntimeUsage) -> Result<String, TranslateError> {
    let tokens = tokenize(body)?;
    if tokens.is_empty() {
        return Err(TranslateError::unsupported("empty arithmetic expression"));
    }

    let parts: Vec<String> = tokens
        .iter()
        .map(|tok| match tok {
            Token::Var(name) => {
                usage.require(RuntimeHelper::Var);
                usage.require(RuntimeHelper::Int);
                format!("sh_int(sh_var({}))", c_string(name))
            }
            Token::Status => "last_status".to_string(),
            Token::BackgroundPid => "last_bg_pid".to_string(),
            Token::Number(n) => n.clone(),
            Token::Operator(op) => op.to_string(),
            Token::LParen => "(".to_string(),
            Token::RParen => ")".to_string(),
        })
        .collect();
    Ok(format!("({})", parts.join(" ")))
}
