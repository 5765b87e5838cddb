use crate::lexer;

/// Block keywords that always get a record of their own when they lead a
/// statement. Longer spellings first so `done` is not read as `do`.
const ISOLATED_KEYWORDS: [&str; 5] = ["then", "else", "done", "do", "fi"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub text: String,
    /// 1-based line the statement starts on.
    pub line: usize,
}

/// Splits script text into one candidate statement per record.
///
/// Newlines and `;` separate statements, `&` ends one (and stays attached
/// to it), `#` comments become records of their own, and a backslash before
/// a newline joins the two lines. Separators inside quotes or command
/// substitutions are ignored.
pub fn segment(src: &str) -> Vec<Statement> {
    let scanned = lexer::scan(src);
    let mut out = Vec::new();
    let mut current = String::new();
    let mut line = 1;
    let mut start_line = 1;
    let mut in_comment = false;

    let mut i = 0;
    while i < scanned.len() {
        let sc = scanned[i];

        if sc.comment != in_comment {
            flush(&mut out, &mut current, start_line);
            in_comment = sc.comment;
        }

        if sc.ch == '\\' && !sc.comment {
            match scanned.get(i + 1) {
                Some(n) if n.ch == '\n' => {
                    line += 1;
                    i += 2;
                    continue;
                }
                Some(n) => {
                    if current.trim().is_empty() {
                        start_line = line;
                    }
                    current.push('\\');
                    current.push(n.ch);
                    i += 2;
                    continue;
                }
                None => {}
            }
        }

        let separator = sc.bare && matches!(sc.ch, '\n' | ';');
        if separator {
            flush(&mut out, &mut current, start_line);
        } else {
            if current.trim().is_empty() && !sc.ch.is_whitespace() {
                start_line = line;
            }
            current.push(sc.ch);
            if sc.bare && sc.ch == '&' && ends_statement(&scanned, i) {
                flush(&mut out, &mut current, start_line);
            }
        }

        if sc.ch == '\n' {
            line += 1;
        }
        i += 1;
    }
    flush(&mut out, &mut current, start_line);

    log::trace!("segmented {} statement(s)", out.len());
    out
}

/// `&` ends a statement unless it belongs to `&&`, `>&`, `<&` or `&>`.
fn ends_statement(scanned: &[lexer::ScannedChar], i: usize) -> bool {
    let prev = i.checked_sub(1).map(|p| scanned[p].ch);
    let next = scanned.get(i + 1).map(|n| n.ch);
    !matches!(prev, Some('&' | '>' | '<')) && !matches!(next, Some('&' | '>'))
}

fn flush(out: &mut Vec<Statement>, current: &mut String, line: usize) {
    let text = std::mem::take(current);
    let mut rest = text.trim();
    while !rest.is_empty() {
        match split_leading_keyword(rest) {
            Some((keyword, tail)) => {
                out.push(Statement { text: keyword.to_string(), line });
                rest = tail.trim_start();
            }
            None => {
                out.push(Statement { text: rest.to_string(), line });
                break;
            }
        }
    }
}

fn split_leading_keyword(text: &str) -> Option<(&str, &str)> {
    ISOLATED_KEYWORDS.iter().find_map(|kw| {
        let tail = text.strip_prefix(kw)?;
        tail.starts_with(char::is_whitespace).then_some((*kw, tail))
    })
}
