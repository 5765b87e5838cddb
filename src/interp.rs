use lazy_static::lazy_static;
use regex::Regex;
use std::collections::VecDeque;

lazy_static! {
    static ref REFERENCE: Regex = Regex::new(
        r"\\(?P<esc>[\\$])|\$\{(?P<braced>[A-Za-z_][A-Za-z0-9_]*)\}|\$(?P<short>[A-Za-z_][A-Za-z0-9_]*)|\$(?P<special>[?!])"
    )
    .expect("reference pattern is valid");
}

/// A value substituted into a format string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Arg {
    Var(String),
    /// `$?`
    Status,
    /// `$!`
    BackgroundPid,
}

impl Arg {
    pub fn placeholder(&self) -> &'static str {
        match self {
            Arg::Var(_) => "%s",
            Arg::Status | Arg::BackgroundPid => "%d",
        }
    }
}

/// Result of resolving variable references inside a text fragment.
///
/// `Literal` text must never be handed to a formatting routine: it is raw
/// user text and may contain `%`. `Format` text has every literal `%`
/// doubled already.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Interpolated {
    Literal(String),
    Format { format: String, args: Vec<Arg> },
}

impl Interpolated {
    pub fn is_literal(&self) -> bool {
        matches!(self, Interpolated::Literal(_))
    }

    /// The argument when the whole fragment is exactly one reference.
    pub fn single_arg(&self) -> Option<&Arg> {
        match self {
            Interpolated::Format { format, args } if args.len() == 1 && format == args[0].placeholder() => {
                Some(&args[0])
            }
            _ => None,
        }
    }

    pub fn join(parts: Vec<Interpolated>, sep: &str) -> Interpolated {
        if parts.iter().all(Interpolated::is_literal) {
            let texts: Vec<String> = parts
                .into_iter()
                .map(|p| match p {
                    Interpolated::Literal(s) => s,
                    Interpolated::Format { format, .. } => format,
                })
                .collect();
            return Interpolated::Literal(texts.join(sep));
        }

        let mut format = String::new();
        let mut args = Vec::new();
        for (i, part) in parts.into_iter().enumerate() {
            if i > 0 {
                format.push_str(&escape_percent(sep));
            }
            match part {
                Interpolated::Literal(s) => format.push_str(&escape_percent(&s)),
                Interpolated::Format { format: f, args: a } => {
                    format.push_str(&f);
                    args.extend(a);
                }
            }
        }
        Interpolated::Format { format, args }
    }
}

pub fn escape_percent(s: &str) -> String {
    s.replace('%', "%%")
}

enum Piece {
    Text(String),
    Ref(Arg),
}

/// Resolves `$NAME`, `${NAME}`, `$?` and `$!` references in `text`.
///
/// One layer of surrounding quotes is removed first; single-quoted text is
/// returned literally. `\$` and `\\` stand for a literal `$` and backslash.
/// References are taken from the right end inwards and each resolved
/// argument is prepended, so the argument list ends up in left-to-right
/// source order.
pub fn interpolate(text: &str) -> Interpolated {
    if crate::lexer::is_single_quoted(text) {
        return Interpolated::Literal(text[1..text.len() - 1].to_string());
    }
    resolve(strip_double_quotes(text), Vars::Substitute)
}

/// Interpolates one shell word, honouring all of its quoting.
pub fn interpolate_word(raw: &str) -> Interpolated {
    resolve(&crate::lexer::normalize_word(raw), Vars::Substitute)
}

/// Interpolates command text that will be handed to `/bin/sh -c`.
///
/// Quoting and backslashes are kept verbatim for the command interpreter and
/// nothing inside single quotes is resolved. Named variables are written back
/// as `${NAME}`: they live in the environment, where the interpreter expands
/// them itself. Only `$?` and `$!` become format arguments.
pub fn interpolate_command(text: &str) -> Interpolated {
    let mut prepared = String::with_capacity(text.len() + 8);
    let mut chars = text.chars();
    let mut in_single = false;
    let mut in_double = false;

    while let Some(c) = chars.next() {
        match c {
            '\'' if !in_double => {
                in_single = !in_single;
                prepared.push(c);
            }
            '"' if !in_single => {
                in_double = !in_double;
                prepared.push(c);
            }
            '\\' if !in_single => {
                prepared.push_str("\\\\");
                if let Some(next) = chars.next() {
                    push_escaped(&mut prepared, next);
                }
            }
            '$' | '\\' if in_single => push_escaped(&mut prepared, c),
            _ => prepared.push(c),
        }
    }
    resolve(&prepared, Vars::Defer)
}

fn push_escaped(out: &mut String, c: char) {
    match c {
        '$' => out.push_str("\\$"),
        '\\' => out.push_str("\\\\"),
        _ => out.push(c),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Vars {
    Substitute,
    Defer,
}

fn resolve(text: &str, vars: Vars) -> Interpolated {
    let mut pieces: VecDeque<Piece> = VecDeque::new();
    let mut args: VecDeque<Arg> = VecDeque::new();
    let mut boundary = text.len();

    while let Some(caps) = REFERENCE.captures_iter(&text[..boundary]).last() {
        let Some(whole) = caps.get(0) else { break };
        pieces.push_front(Piece::Text(text[whole.end()..boundary].to_string()));

        if let Some(esc) = caps.name("esc") {
            pieces.push_front(Piece::Text(esc.as_str().to_string()));
        } else {
            let arg = if let Some(name) = caps.name("braced").or_else(|| caps.name("short")) {
                Arg::Var(name.as_str().to_string())
            } else if caps.name("special").is_some_and(|m| m.as_str() == "?") {
                Arg::Status
            } else {
                Arg::BackgroundPid
            };
            match arg {
                Arg::Var(name) if vars == Vars::Defer => {
                    pieces.push_front(Piece::Text(format!("${{{}}}", name)));
                }
                arg => {
                    pieces.push_front(Piece::Ref(arg.clone()));
                    args.push_front(arg);
                }
            }
        }
        boundary = whole.start();
    }
    pieces.push_front(Piece::Text(text[..boundary].to_string()));

    if args.is_empty() {
        let literal: String = pieces
            .into_iter()
            .filter_map(|p| match p {
                Piece::Text(t) => Some(t),
                Piece::Ref(_) => None,
            })
            .collect();
        return Interpolated::Literal(literal);
    }

    let mut format = String::new();
    for piece in pieces {
        match piece {
            Piece::Text(t) => format.push_str(&escape_percent(&t)),
            Piece::Ref(arg) => format.push_str(arg.placeholder()),
        }
    }
    Interpolated::Format { format, args: args.into() }
}

fn strip_double_quotes(text: &str) -> &str {
    if text.len() >= 2 && text.starts_with('"') && text.ends_with('"') {
        &text[1..text.len() - 1]
    } else {
        text
    }
}
