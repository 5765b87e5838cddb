#![allow(dead_code)]

use lazy_static::lazy_static;
use shtoc::codegen::{self, TranslateOptions, Translation};
use shtoc::runtime::{PREAMBLE, RuntimeHelper, RuntimeUsage};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

lazy_static! {
    static ref C_COMPILER: Option<&'static str> = ["cc", "gcc", "clang"]
        .into_iter()
        .find(|cc| {
            Command::new(cc)
                .arg("--version")
                .output()
                .is_ok_and(|o| o.status.success())
        });
}

pub struct Run {
    pub stdout: String,
    pub stderr: String,
    pub code: i32,
}

pub fn translate(src: &str) -> Translation {
    codegen::translate(
        src,
        &TranslateOptions { file_name: "test.sh".to_string(), ..Default::default() },
    )
}

pub fn translate_fixture(name: &str) -> Translation {
    let path = format!("tests/fixtures/{}.sh", name);
    let src = fs::read_to_string(&path).expect("Failed to read fixture");
    translate(&src)
}

pub fn c_compiler() -> Option<&'static str> {
    *C_COMPILER
}

/// Compiles `c_source` into `dir`. Returns `None` when no C compiler is
/// installed, so callers can skip.
pub fn build(c_source: &str, dir: &Path) -> Option<PathBuf> {
    let Some(cc) = c_compiler() else {
        eprintln!("skipping: no C compiler available");
        return None;
    };
    let src_path = dir.join("prog.c");
    let bin_path = dir.join("prog");
    fs::write(&src_path, c_source).expect("Failed to write C source");

    let output = Command::new(cc)
        .args(["-std=c99", "-Wall", "-o"])
        .arg(&bin_path)
        .arg(&src_path)
        .output()
        .expect("Failed to run C compiler");
    assert!(
        output.status.success(),
        "C compilation failed:\n{}\n--- source ---\n{}",
        String::from_utf8_lossy(&output.stderr),
        c_source
    );
    Some(bin_path)
}

pub fn run(bin: &Path, dir: &Path) -> Run {
    let output = Command::new(bin)
        .current_dir(dir)
        .output()
        .expect("Failed to run compiled program");
    Run {
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        code: output.status.code().unwrap_or(-1),
    }
}

/// Translates, compiles and runs a script with `dir` as working directory.
pub fn run_script_in(src: &str, dir: &Path) -> Option<Run> {
    let translation = translate(src);
    let bin = build(&translation.source, dir)?;
    Some(run(&bin, dir))
}

pub fn run_script(src: &str) -> Option<Run> {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    run_script_in(src, dir.path())
}

/// A C program made of the preamble, the given helpers and a custom `main`
/// body, for exercising the runtime helpers directly.
pub fn harness(helpers: &[RuntimeHelper], main_body: &str) -> String {
    harness_with(&[], helpers, main_body)
}

/// Like [`harness`], with extra system headers included after the preamble.
pub fn harness_with(includes: &[&str], helpers: &[RuntimeHelper], main_body: &str) -> String {
    let mut usage = RuntimeUsage::default();
    for helper in helpers {
        usage.require(*helper);
    }

    let mut c = String::from(PREAMBLE);
    for header in includes {
        c.push_str(&format!("#include <{}>\n", header));
    }
    for helper in usage.iter() {
        c.push_str(helper.declaration());
        c.push('\n');
    }
    c.push_str("\nint main(void)\n{\n");
    c.push_str(main_body);
    c.push_str("    return 0;\n}\n");
    for helper in usage.iter() {
        c.push('\n');
        c.push_str(helper.definition());
    }
    c
}

pub fn run_harness(helpers: &[RuntimeHelper], main_body: &str, dir: &Path) -> Option<Run> {
    let bin = build(&harness(helpers, main_body), dir)?;
    Some(run(&bin, dir))
}

pub fn run_harness_with(
    includes: &[&str],
    helpers: &[RuntimeHelper],
    main_body: &str,
    dir: &Path,
) -> Option<Run> {
    let bin = build(&harness_with(includes, helpers, main_body), dir)?;
    Some(run(&bin, dir))
}
