use crate::classify::{self, Kind};
use crate::diag::Diagnostics;
use crate::emit::{self, Context};
use crate::runtime::{PREAMBLE, RuntimeUsage};
use crate::segment::{self, Statement};

#[derive(Debug, Clone)]
pub struct TranslateOptions {
    /// Name shown in diagnostics and marker comments.
    pub file_name: String,
    /// One indentation unit of the generated C.
    pub indent: String,
}

impl Default for TranslateOptions {
    fn default() -> Self {
        Self {
            file_name: "<stdin>".to_string(),
            indent: "    ".to_string(),
        }
    }
}

#[derive(Debug)]
pub struct Translation {
    pub source: String,
    pub usage: RuntimeUsage,
    pub diagnostics: Diagnostics,
}

impl Translation {
    pub fn has_errors(&self) -> bool {
        self.diagnostics.has_errors()
    }
}

/// Translates a whole script into one C program.
///
/// Statements are handled strictly in source order in a single pass; the
/// runtime helpers they ask for are appended after `main` in their fixed
/// order.
pub fn translate(src: &str, options: &TranslateOptions) -> Translation {
    let mut ctx = Context::new(&options.file_name, &options.indent);
    for stmt in segment::segment(src) {
        let classified = classify::classify(&stmt.text);
        emit::emit_statement(&mut ctx, stmt.line, &classified);
    }
    let (body, usage, diagnostics) = ctx.finish();
    log::debug!(
        "translated {} with {} runtime helper(s)",
        options.file_name,
        usage.iter().count()
    );

    Translation { source: assemble(&body, &usage, &options.indent), usage, diagnostics }
}

fn assemble(body: &str, usage: &RuntimeUsage, indent: &str) -> String {
    let mut out = String::with_capacity(PREAMBLE.len() + body.len() + 1024);
    out.push_str(PREAMBLE);

    if !usage.is_empty() {
        out.push('\n');
        for helper in usage.iter() {
            out.push_str(helper.declaration());
            out.push('\n');
        }
    }

    out.push_str("\nint main(void)\n{\n");
    out.push_str(body);
    out.push_str(indent);
    out.push_str("return 0;\n}\n");

    for helper in usage.iter() {
        out.push('\n');
        out.push_str(helper.definition());
    }
    out
}

/// Segmented statements with the kind each one classifies as.
pub fn statements(src: &str) -> Vec<(Statement, Kind)> {
    segment::segment(src)
        .into_iter()
        .map(|stmt| {
            let kind = classify::classify(&stmt.text).kind;
            (stmt, kind)
        })
        .collect()
}
