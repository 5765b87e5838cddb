mod common;

use std::fs;

fn stdout_of(src: &str) -> Option<String> {
    common::run_script(src).map(|run| run.stdout)
}

#[test]
fn exec_arith_fixture_prints_sum() {
    let src = fs::read_to_string("tests/fixtures/arith.sh").unwrap();
    let Some(out) = stdout_of(&src) else { return };
    assert_eq!(out, "7\n");
}

#[test]
fn exec_file_test_against_existing_file() {
    let src = fs::read_to_string("tests/fixtures/if_file.sh").unwrap();
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("file.txt"), "x").unwrap();
    let Some(run) = common::run_script_in(&src, dir.path()) else { return };
    assert_eq!(run.stdout, "found\nstatus=0\n");
}

#[test]
fn exec_file_test_against_missing_file() {
    let src = fs::read_to_string("tests/fixtures/if_file.sh").unwrap();
    let Some(out) = stdout_of(&src) else { return };
    assert_eq!(out, "status=1\n");
}

#[test]
fn exec_literal_prints_in_order() {
    let Some(out) = stdout_of("echo first\necho 'second line'\necho \"50% off\"\necho '$HOME'") else {
        return;
    };
    assert_eq!(out, "first\nsecond line\n50% off\n$HOME\n");
}

#[test]
fn exec_percent_next_to_variable() {
    let Some(out) = stdout_of("pct=50\necho \"$pct% off\"") else { return };
    assert_eq!(out, "50% off\n");
}

#[test]
fn exec_echo_without_newline() {
    let Some(out) = stdout_of("echo -n a\necho b") else { return };
    assert_eq!(out, "ab\n");
}

#[test]
fn exec_pipeline_fixture() {
    let src = fs::read_to_string("tests/fixtures/pipeline.sh").unwrap();
    let Some(out) = stdout_of(&src) else { return };
    assert_eq!(out, "HELLO THERE\nrc=0\n");
}

#[test]
fn exec_pipeline_status_is_last_stage() {
    let Some(out) = stdout_of("true | false\necho \"rc=$?\"\nfalse | true\necho \"rc=$?\"") else {
        return;
    };
    assert_eq!(out, "rc=1\nrc=0\n");
}

#[test]
fn exec_pipeline_stage_sees_status() {
    let Some(out) = stdout_of("false\necho $? | cat") else { return };
    assert_eq!(out, "1\n");
}

#[test]
fn exec_single_quotes_reach_interpreter_untouched() {
    let Some(out) = stdout_of("word=hi\necho '$word' | cat") else { return };
    assert_eq!(out, "$word\n");
}

#[test]
fn exec_loops_fixture() {
    let src = fs::read_to_string("tests/fixtures/loops.sh").unwrap();
    let Some(out) = stdout_of(&src) else { return };
    assert_eq!(out, "item alpha\nitem beta\nitem gamma\nn=0\nn=1\nn=2\n");
}

#[test]
fn exec_elif_fixture() {
    let src = fs::read_to_string("tests/fixtures/elif.sh").unwrap();
    let Some(out) = stdout_of(&src) else { return };
    assert_eq!(out, "one\ntwo\nother\n");
}

#[test]
fn exec_for_over_variable_items() {
    let Some(out) = stdout_of("a=red\nfor c in $a \"dark $a\" blue; do echo \"[$c]\"; done") else {
        return;
    };
    assert_eq!(out, "[red]\n[dark red]\n[blue]\n");
}

#[test]
fn exec_command_substitution() {
    let Some(out) = stdout_of("name=$(echo world)\necho \"hello $name\"") else { return };
    assert_eq!(out, "hello world\n");
}

#[test]
fn exec_exit_code_is_returned() {
    let Some(run) = common::run_script("echo start\nexit 3\necho never") else { return };
    assert_eq!(run.stdout, "start\n");
    assert_eq!(run.code, 3);
}

#[test]
fn exec_non_numeric_operand_coerces_to_zero() {
    let Some(out) = stdout_of("x=abc\nif [ \"$x\" -eq 0 ]; then echo zero; fi") else { return };
    assert_eq!(out, "zero\n");
}

#[test]
fn exec_string_comparison() {
    let src = "a=yes\nif [ \"$a\" = yes ]; then echo same; fi\nif [ \"$a\" != no ]; then echo differ; fi";
    let Some(out) = stdout_of(src) else { return };
    assert_eq!(out, "same\ndiffer\n");
}

#[test]
fn exec_cd_changes_working_directory() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir(dir.path().join("sub")).unwrap();
    let Some(run) = common::run_script_in("cd sub\necho \"cd=$?\"\npwd", dir.path()) else { return };
    let mut lines = run.stdout.lines();
    assert_eq!(lines.next(), Some("cd=0"));
    assert!(lines.next().is_some_and(|l| l.ends_with("/sub")), "{}", run.stdout);
}

#[test]
fn exec_cd_to_missing_directory_fails() {
    let Some(out) = stdout_of("cd nowhere\necho \"cd=$?\"") else { return };
    assert_eq!(out, "cd=1\n");
}

#[test]
fn exec_background_pid_is_recorded() {
    let Some(out) = stdout_of("true &\nif [ $! -gt 0 ]; then echo launched; fi") else { return };
    assert_eq!(out, "launched\n");
}

#[test]
fn exec_command_condition() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("notes.txt"), "a needle here\n").unwrap();
    let src = "if grep -q needle notes.txt; then echo hit; else echo miss; fi\n\
               if ! grep -q hay notes.txt; then echo no-hay; fi";
    let Some(run) = common::run_script_in(src, dir.path()) else { return };
    assert_eq!(run.stdout, "hit\nno-hay\n");
}

#[test]
fn exec_while_counts_up() {
    let src = "i=0\nwhile [ $i -lt 2 ]; do\n  echo \"tick $i\"\n  i=$((i + 1))\ndone\necho \"end $i\"";
    let Some(out) = stdout_of(src) else { return };
    assert_eq!(out, "tick 0\ntick 1\nend 2\n");
}

#[test]
fn exec_arith_print() {
    let Some(out) = stdout_of("a=6\nb=7\necho \"$((a * b - (a + b) % 5))\"") else { return };
    assert_eq!(out, "39\n");
}

#[test]
fn exec_unsupported_statements_are_skipped() {
    let src = fs::read_to_string("tests/fixtures/unsupported.sh").unwrap();
    let Some(out) = stdout_of(&src) else { return };
    assert_eq!(out, "before\nafter\n");
}

#[test]
fn exec_unclosed_block_still_compiles() {
    let src = fs::read_to_string("tests/fixtures/unclosed.sh").unwrap();
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir(dir.path().join("build")).unwrap();
    let Some(run) = common::run_script_in(&src, dir.path()) else { return };
    assert_eq!(run.stdout, "has build\n");
}

#[test]
fn exec_echo_with_command_list_is_skipped() {
    let src = "echo a && echo b\necho c || echo d\necho e";
    assert_eq!(common::translate(src).diagnostics.error_count(), 2);
    let Some(out) = stdout_of(src) else { return };
    assert_eq!(out, "e\n");
}

#[test]
fn exec_extra_else_still_compiles() {
    let src = "if true; then echo a; else echo b; else echo c; fi\nelif true\necho after";
    assert_eq!(common::translate(src).diagnostics.error_count(), 2);
    let Some(out) = stdout_of(src) else { return };
    assert_eq!(out, "a\nafter\n");
}

#[test]
fn exec_every_test_operator() {
    let cases: &[(&str, bool)] = &[
        ("\"$s\"", true),
        ("\"$e\"", false),
        ("-n \"$s\"", true),
        ("-n \"$e\"", false),
        ("-z \"$e\"", true),
        ("-z \"$s\"", false),
        ("-e f", true),
        ("-e missing", false),
        ("-f f", true),
        ("-f d", false),
        ("-d d", true),
        ("-d f", false),
        ("\"$s\" = abc", true),
        ("\"$s\" = abd", false),
        ("\"$s\" != abd", true),
        ("\"$s\" != abc", false),
        ("5 -eq 5", true),
        ("5 -eq 6", false),
        ("abc -eq 0", true),
        ("5 -ne 6", true),
        ("5 -ne 5", false),
        ("abc -ne 0", false),
        ("\"$n\" -gt 3", true),
        ("3 -gt 7", false),
        ("1 -gt abc", true),
        ("2 -lt 3", true),
        ("3 -lt 2", false),
        ("abc -lt 1", true),
        ("3 -ge 3", true),
        ("2 -ge 3", false),
        ("abc -ge 0", true),
        ("3 -le 3", true),
        ("4 -le 3", false),
        ("abc -le -1", false),
        ("! -e missing", true),
    ];

    let mut src = String::from("s=abc\ne=\nn=10\n");
    let mut expected = String::new();
    for (i, (expr, holds)) in cases.iter().enumerate() {
        src.push_str(&format!("if [ {} ]; then echo \"{}:1\"; else echo \"{}:0\"; fi\n", expr, i, i));
        expected.push_str(&format!("{}:{}\n", i, u8::from(*holds)));
    }
    let t = common::translate(&src);
    assert!(!t.has_errors(), "{:?}", t.diagnostics.entries());

    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("f"), "").unwrap();
    fs::create_dir(dir.path().join("d")).unwrap();
    let Some(run) = common::run_script_in(&src, dir.path()) else { return };
    assert_eq!(run.stdout, expected);
}
