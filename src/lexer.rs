//! Quote-aware scanning shared by the segmenter, the classifier and the
//! emitters. Nothing here understands shell grammar beyond quoting and
//! substitution nesting.

/// One source character together with whether it sits outside every quote,
/// escape and substitution. Comment text is never bare.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScannedChar {
    pub pos: usize,
    pub ch: char,
    pub bare: bool,
    pub comment: bool,
}

impl ScannedChar {
    fn quoted(pos: usize, ch: char) -> Self {
        Self { pos, ch, bare: false, comment: false }
    }
}

pub fn scan(text: &str) -> Vec<ScannedChar> {
    let mut out = Vec::with_capacity(text.len());
    let mut chars = text.char_indices().peekable();
    let mut in_single = false;
    let mut in_double = false;
    let mut in_tick = false;
    let mut depth = 0usize;
    let mut word_start = true;

    while let Some((pos, ch)) = chars.next() {
        let at_word_start = word_start;
        word_start = false;
        if in_single {
            if ch == '\'' {
                in_single = false;
            }
            out.push(ScannedChar::quoted(pos, ch));
            continue;
        }
        match ch {
            '\\' => {
                out.push(ScannedChar::quoted(pos, ch));
                if let Some((p, c)) = chars.next() {
                    out.push(ScannedChar::quoted(p, c));
                }
            }
            '\'' if !in_double && !in_tick => {
                in_single = true;
                out.push(ScannedChar::quoted(pos, ch));
            }
            '"' if !in_tick => {
                in_double = !in_double;
                out.push(ScannedChar::quoted(pos, ch));
            }
            '`' => {
                in_tick = !in_tick;
                out.push(ScannedChar::quoted(pos, ch));
            }
            '$' if matches!(chars.peek(), Some((_, '('))) => {
                out.push(ScannedChar::quoted(pos, ch));
                if let Some((p, c)) = chars.next() {
                    out.push(ScannedChar::quoted(p, c));
                }
                depth += 1;
            }
            '(' if depth > 0 => {
                depth += 1;
                out.push(ScannedChar::quoted(pos, ch));
            }
            ')' if depth > 0 => {
                depth -= 1;
                out.push(ScannedChar::quoted(pos, ch));
            }
            '#' if at_word_start && !in_double && !in_tick && depth == 0 => {
                out.push(ScannedChar { pos, ch, bare: false, comment: true });
                while let Some((p, c)) = chars.next_if(|(_, c)| *c != '\n') {
                    out.push(ScannedChar { pos: p, ch: c, bare: false, comment: true });
                }
                word_start = true;
            }
            _ => {
                let bare = !in_double && !in_tick && depth == 0;
                word_start = bare && (ch.is_whitespace() || matches!(ch, ';' | '&' | '|' | '('));
                out.push(ScannedChar { pos, ch, bare, comment: false });
            }
        }
    }
    out
}

/// Splits on unquoted whitespace. Words keep their quotes.
pub fn split_words(text: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    for sc in scan(text) {
        if sc.bare && sc.ch.is_whitespace() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
        } else {
            current.push(sc.ch);
        }
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

/// Splits a statement into pipe stages. Returns `None` unless there are at
/// least two non-empty stages joined by single, unquoted `|`.
pub fn split_pipeline(text: &str) -> Option<Vec<String>> {
    let scanned = scan(text);
    let mut cuts = Vec::new();
    for (i, sc) in scanned.iter().enumerate() {
        if !(sc.bare && sc.ch == '|') {
            continue;
        }
        let prev_pipe = i > 0 && scanned[i - 1].bare && scanned[i - 1].ch == '|';
        let next_pipe = scanned.get(i + 1).is_some_and(|n| n.bare && n.ch == '|');
        if prev_pipe || next_pipe {
            return None;
        }
        cuts.push(sc.pos);
    }
    if cuts.is_empty() {
        return None;
    }

    let mut stages = Vec::with_capacity(cuts.len() + 1);
    let mut start = 0;
    for cut in cuts {
        stages.push(text[start..cut].trim().to_string());
        start = cut + 1;
    }
    stages.push(text[start..].trim().to_string());

    if stages.iter().any(|s| s.is_empty()) {
        return None;
    }
    Some(stages)
}

/// True when the text contains an unquoted `<` or `>`.
pub fn has_redirection(text: &str) -> bool {
    scan(text).iter().any(|sc| sc.bare && (sc.ch == '<' || sc.ch == '>'))
}

/// True when the text contains an unquoted `&&` or `||`.
pub fn has_list_operator(text: &str) -> bool {
    scan(text)
        .windows(2)
        .any(|w| w[0].bare && w[1].bare && w[0].ch == w[1].ch && matches!(w[0].ch, '&' | '|'))
}

pub fn is_single_quoted(raw: &str) -> bool {
    raw.len() >= 2 && raw.starts_with('\'') && raw.ends_with('\'')
}

/// Removes shell quoting from a word.
///
/// The result is in interpolation form: a literal `$` is written `\$` and a
/// literal backslash `\\`, so text that came from single quotes or escapes is
/// never mistaken for a variable reference.
pub fn normalize_word(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    let mut in_double = false;

    while let Some(c) = chars.next() {
        match c {
            '\'' if !in_double => {
                for s in chars.by_ref() {
                    if s == '\'' {
                        break;
                    }
                    push_literal(&mut out, s);
                }
            }
            '"' => in_double = !in_double,
            '\\' => match chars.next() {
                Some(n) if !in_double || matches!(n, '$' | '"' | '\\' | '`') => {
                    push_literal(&mut out, n)
                }
                Some(n) => {
                    out.push_str("\\\\");
                    push_literal(&mut out, n);
                }
                None => out.push_str("\\\\"),
            },
            _ => out.push(c),
        }
    }
    out
}

fn push_literal(out: &mut String, c: char) {
    match c {
        '$' => out.push_str("\\$"),
        '\\' => out.push_str("\\\\"),
        _ => out.push(c),
    }
}

pub fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn words_keep_quoted_runs_together() {
        assert_eq!(
            split_words(r#"echo "hello world"  'a b' c"#),
            vec!["echo", "\"hello world\"", "'a b'", "c"]
        );
    }

    #[test]
    fn words_keep_substitutions_together() {
        assert_eq!(split_words("x $(date +%s) y"), vec!["x", "$(date +%s)", "y"]);
        assert_eq!(split_words("a `ls -l` b"), vec!["a", "`ls -l`", "b"]);
    }

    #[test]
    fn pipeline_split_respects_quotes() {
        assert_eq!(
            split_pipeline("ls -l | grep x | wc -l"),
            Some(vec!["ls -l".to_string(), "grep x".to_string(), "wc -l".to_string()])
        );
        assert_eq!(split_pipeline("echo \"a|b\""), None);
        assert_eq!(split_pipeline("a || b"), None);
        assert_eq!(split_pipeline("a | "), None);
        assert_eq!(split_pipeline("echo $(ls | wc -l)"), None);
    }

    #[test]
    fn normalize_marks_literal_dollars() {
        assert_eq!(normalize_word("\"hi $x\""), "hi $x");
        assert_eq!(normalize_word("'hi $x'"), "hi \\$x");
        assert_eq!(normalize_word("\"cost \\$5\""), "cost \\$5");
        assert_eq!(normalize_word("a\\ b"), "a b");
        assert_eq!(normalize_word("\"a\\nb\""), "a\\\\nb");
        assert_eq!(normalize_word("pre\"$x\"'$y'"), "pre$x\\$y");
    }

    #[test]
    fn redirection_detection_ignores_quotes() {
        assert!(has_redirection("hi > out.txt"));
        assert!(!has_redirection("\"a > b\""));
    }

    #[test]
    fn list_operators_outside_quotes() {
        assert!(has_list_operator("a && b"));
        assert!(has_list_operator("a || b"));
        assert!(!has_list_operator("\"a && b\" 'c || d'"));
        assert!(!has_list_operator("a | b & c"));
        assert!(!has_list_operator("x $(a && b)"));
    }

    #[test]
    fn identifiers() {
        assert!(is_identifier("_x1"));
        assert!(!is_identifier("1x"));
        assert!(!is_identifier(""));
        assert!(!is_identifier("a-b"));
    }
}
