//! Statement classification.
//!
//! A statement is matched against an ordered rule table and the first rule
//! that accepts it decides its kind. Categories overlap (a pipeline may start
//! with `echo`, an assignment may hold `$((...))`), so the order of `RULES`
//! is part of the behaviour.

use crate::lexer;
use lazy_static::lazy_static;
use regex::{Captures, Regex};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Comment,
    Pipeline,
    Echo,
    ArithAssign,
    CaptureAssign,
    ArithPrint,
    Test,
    Cd,
    If,
    Elif,
    While,
    Then,
    Else,
    Fi,
    For,
    Done,
    Exit,
    Background,
    Assign,
    Informational,
    VarPrint,
    Unsupported,
}

impl Kind {
    pub fn name(self) -> &'static str {
        match self {
            Kind::Comment => "comment",
            Kind::Pipeline => "pipeline",
            Kind::Echo => "echo",
            Kind::ArithAssign => "arith-assign",
            Kind::CaptureAssign => "capture-assign",
            Kind::ArithPrint => "arith-print",
            Kind::Test => "test",
            Kind::Cd => "cd",
            Kind::If => "if",
            Kind::Elif => "elif",
            Kind::While => "while",
            Kind::Then => "then",
            Kind::Else => "else",
            Kind::Fi => "fi",
            Kind::For => "for",
            Kind::Done => "done",
            Kind::Exit => "exit",
            Kind::Background => "background",
            Kind::Assign => "assign",
            Kind::Informational => "informational",
            Kind::VarPrint => "var-print",
            Kind::Unsupported => "unsupported",
        }
    }
}

/// A classified statement and the pieces its rule captured.
#[derive(Debug)]
pub struct Classified<'t> {
    pub kind: Kind,
    pub text: &'t str,
    captures: Option<Captures<'t>>,
}

impl<'t> Classified<'t> {
    pub fn field(&self, name: &str) -> Option<&'t str> {
        self.captures.as_ref()?.name(name).map(|m| m.as_str())
    }
}

type Accept = fn(&str, &Captures<'_>) -> bool;

struct Rule {
    kind: Kind,
    pattern: Regex,
    accept: Option<Accept>,
}

fn rule(kind: Kind, pattern: &str, accept: Option<Accept>) -> Rule {
    Rule {
        kind,
        pattern: Regex::new(pattern).expect("classifier pattern is valid"),
        accept,
    }
}

const NAME: &str = "[A-Za-z_][A-Za-z0-9_]*";

lazy_static! {
    static ref TEST_FORMS: [Regex; 3] = [
        Regex::new(r"^\[\[\s+(?P<expr>.*?)\s+\]\]$").expect("test pattern is valid"),
        Regex::new(r"^\[\s+(?P<expr>.*?)\s+\]$").expect("test pattern is valid"),
        Regex::new(r"^test\s+(?P<expr>.+)$").expect("test pattern is valid"),
    ];

    static ref RULES: Vec<Rule> = vec![
        rule(Kind::Pipeline, r"\|", Some(is_pipeline)),
        rule(Kind::Echo, r"^echo(?:\s+(?P<args>.*))?$", Some(plain_echo)),
        rule(
            Kind::ArithAssign,
            &format!(r#"^(?P<name>{NAME})="?\$\(\((?P<expr>.*)\)\)"?$"#),
            None,
        ),
        rule(
            Kind::CaptureAssign,
            &format!(r#"^(?P<name>{NAME})="?\$\((?P<cmd>.*)\)"?$"#),
            None,
        ),
        rule(
            Kind::CaptureAssign,
            &format!(r#"^(?P<name>{NAME})="?`(?P<cmd>[^`]*)`"?$"#),
            None,
        ),
        rule(Kind::ArithPrint, r#"^echo\s+"?\$\(\((?P<expr>.*)\)\)"?$"#, None),
        rule(Kind::Test, r"^\[\[\s+(?P<expr>.*?)\s+\]\]$", None),
        rule(Kind::Test, r"^\[\s+(?P<expr>.*?)\s+\]$", None),
        rule(Kind::Test, r"^test\s+(?P<expr>.+)$", None),
        rule(Kind::Cd, r"^cd(?:\s+(?P<dir>.+))?$", None),
        rule(Kind::If, r"^if\s+(?P<cond>.+)$", None),
        rule(Kind::Elif, r"^elif\s+(?P<cond>.+)$", None),
        rule(Kind::While, r"^while\s+(?P<cond>.+)$", None),
        rule(Kind::Then, r"^(?:then|do)$", None),
        rule(Kind::Else, r"^else$", None),
        rule(Kind::Fi, r"^fi$", None),
        rule(
            Kind::For,
            &format!(r"^for\s+(?P<var>{NAME})(?:\s+in(?:\s+(?P<items>.*))?)?$"),
            None,
        ),
        rule(Kind::Done, r"^done$", None),
        rule(Kind::Exit, r"^exit(?:\s+(?P<code>\S+))?$", None),
        rule(Kind::Background, r"^(?P<cmd>.*[^&\s])\s*&$", None),
        rule(
            Kind::Assign,
            &format!(r"^(?P<name>{NAME})=(?P<value>.*)$"),
            Some(single_plain_word),
        ),
        rule(
            Kind::Informational,
            r"^(?P<cmd>pwd|true|false|:|date|whoami|hostname|uname|id)(?:\s+(?P<args>.*))?$",
            None,
        ),
        rule(Kind::VarPrint, r"\$(?:[A-Za-z_{]|[?!])", Some(lone_reference)),
    ];
}

fn is_pipeline(text: &str, _: &Captures<'_>) -> bool {
    lexer::split_pipeline(text).is_some()
}

/// Echo handled in place: no arithmetic expansion and not backgrounded.
fn plain_echo(text: &str, _: &Captures<'_>) -> bool {
    let backgrounded = lexer::scan(text).last().is_some_and(|sc| sc.bare && sc.ch == '&');
    !text.contains("$((") && !backgrounded
}

fn no_substitution(text: &str, _: &Captures<'_>) -> bool {
    !text.contains("$(") && !text.contains('`')
}

/// A bare reference statement: one command, no substitutions.
fn lone_reference(text: &str, caps: &Captures<'_>) -> bool {
    no_substitution(text, caps) && !lexer::has_list_operator(text)
}

fn single_plain_word(text: &str, caps: &Captures<'_>) -> bool {
    let value = caps.name("value").map_or("", |m| m.as_str());
    lexer::split_words(value).len() <= 1 && no_substitution(text, caps)
}

/// Strips one trailing `;` and surrounding whitespace.
pub fn trim_statement(text: &str) -> &str {
    let text = text.trim();
    text.strip_suffix(';').map_or(text, str::trim_end)
}

pub fn classify(text: &str) -> Classified<'_> {
    let text = trim_statement(text);
    if text.is_empty() || text.starts_with('#') {
        return Classified { kind: Kind::Comment, text, captures: None };
    }
    for rule in RULES.iter() {
        let Some(caps) = rule.pattern.captures(text) else { continue };
        if rule.accept.is_none_or(|accept| accept(text, &caps)) {
            log::debug!("classified `{}` as {}", text, rule.kind.name());
            return Classified { kind: rule.kind, text, captures: Some(caps) };
        }
    }
    log::debug!("no rule matches `{}`", text);
    Classified { kind: Kind::Unsupported, text, captures: None }
}

/// The expression inside `[ ... ]`, `[[ ... ]]` or `test ...`, if `text`
/// is written in one of those forms.
pub fn test_expression(text: &str) -> Option<&str> {
    TEST_FORMS
        .iter()
        .find_map(|re| re.captures(text).and_then(|c| c.name("expr")).map(|m| m.as_str()))
}
