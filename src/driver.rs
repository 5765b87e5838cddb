use crate::codegen::{self, TranslateOptions};
use crate::diag;
use std::path::{Path, PathBuf};

pub const DEFAULT_OUT_PATH: &str = "output.c";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Translate and write the C file.
    Default,
    /// Translate and report, write nothing.
    Check,
    EmitStatements,
    /// Translate and return the C source instead of writing it.
    EmitC,
}

#[derive(Debug)]
pub struct CompileOptions {
    pub out_path: PathBuf,
    pub mode: Mode,
    pub indent: String,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            out_path: PathBuf::from(DEFAULT_OUT_PATH),
            mode: Mode::Default,
            indent: "    ".to_string(),
        }
    }
}

#[derive(Debug)]
pub struct DriverError {
    pub code: i32,
    pub msg: String,
}

impl DriverError {
    fn io(msg: String) -> Self {
        Self { code: 1, msg }
    }

    fn translate(errors: usize) -> Self {
        Self { code: 2, msg: format!("error: translation finished with {} error(s)", errors) }
    }
}

/// What a successful run produced. `errors` counts error diagnostics; the
/// caller turns a non-zero count into [`Compiled::status`].
#[derive(Debug)]
pub struct Compiled {
    /// Text for stdout: the C source, the statement dump, `OK`, or empty.
    pub text: String,
    pub errors: usize,
}

impl Compiled {
    pub fn status(&self) -> Result<(), DriverError> {
        if self.errors > 0 {
            Err(DriverError::translate(self.errors))
        } else {
            Ok(())
        }
    }
}

pub fn compile_file(path: &Path, options: &CompileOptions) -> Result<Compiled, DriverError> {
    let src = std::fs::read_to_string(path)
        .map_err(|e| DriverError::io(format!("error: unable to read {}: {}", path.display(), e)))?;

    if options.mode == Mode::EmitStatements {
        let mut text = String::new();
        for (stmt, kind) in codegen::statements(&src) {
            text.push_str(&format!("{:>4}  {:<15} {}\n", stmt.line, kind.name(), stmt.text));
        }
        return Ok(Compiled { text, errors: 0 });
    }

    let base = std::env::current_dir().ok();
    let file_name = diag::display_path(&path.to_string_lossy(), base.as_deref());
    log::debug!("translating {}", file_name);

    let translation = codegen::translate(
        &src,
        &TranslateOptions { file_name, indent: options.indent.clone() },
    );
    let errors = translation.diagnostics.error_count();

    let text = match options.mode {
        Mode::Check if errors == 0 => "OK".to_string(),
        Mode::Check => String::new(),
        Mode::EmitC => translation.source,
        _ => {
            std::fs::write(&options.out_path, &translation.source).map_err(|e| {
                DriverError::io(format!(
                    "error: failed to write {}: {}",
                    options.out_path.display(),
                    e
                ))
            })?;
            log::info!("wrote {}", options.out_path.display());
            String::new()
        }
    };
    Ok(Compiled { text, errors })
}
