//! Diagnostic sink shared by the emitters.

use log::Level;
use std::fmt;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub level: Level,
    /// 1-based source line, 0 when the diagnostic is not tied to a line.
    pub line: usize,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.line > 0 {
            write!(f, "line {}: {}", self.line, self.message)
        } else {
            f.write_str(&self.message)
        }
    }
}

/// Collects (level, message) reports for one translation and forwards each
/// one to the `log` facade as it arrives.
#[derive(Debug, Default, Clone)]
pub struct Diagnostics {
    file: String,
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new(file: impl Into<String>) -> Self {
        Self { file: file.into(), entries: Vec::new() }
    }

    pub fn report(&mut self, level: Level, line: usize, message: impl Into<String>) {
        let diagnostic = Diagnostic { level, line, message: message.into() };
        log::log!(level, "{}: {}", self.file, diagnostic);
        self.entries.push(diagnostic);
    }

    pub fn error(&mut self, line: usize, message: impl Into<String>) {
        self.report(Level::Error, line, message);
    }

    pub fn warn(&mut self, line: usize, message: impl Into<String>) {
        self.report(Level::Warn, line, message);
    }

    /// True once any error-level diagnostic has been reported.
    pub fn has_errors(&self) -> bool {
        self.entries.iter().any(|d| d.level == Level::Error)
    }

    pub fn error_count(&self) -> usize {
        self.entries.iter().filter(|d| d.level == Level::Error).count()
    }

    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }
}

/// Normalizes a script path for display in diagnostics and marker comments.
///
/// Relative paths are kept (with `/` separators). Absolute paths are made
/// relative to `base` when they live under it and otherwise shortened to the
/// file name, so generated sources carry no build-machine paths.
pub fn display_path(raw: &str, base: Option<&Path>) -> String {
    let path = Path::new(raw);

    let shown = if path.is_relative() {
        raw.to_string()
    } else {
        base.and_then(|b| path.strip_prefix(b).ok())
            .map(|rel| rel.to_string_lossy().into_owned())
            .unwrap_or_else(|| file_name_or_raw(path, raw))
    };
    shown.replace('\\', "/")
}

fn file_name_or_raw(path: &Path, raw: &str) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| raw.to_string())
}
