//! Target-side runtime helpers.
//!
//! Each helper is a small C function appended to the generated program only
//! when some translated statement needs it. Declaration order of the enum is
//! the emission order.

use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RuntimeHelper {
    Var,
    Int,
    SetInt,
    Format,
    WaitStatus,
    Run,
    Capture,
    Pipeline,
    Background,
    PathExists,
    IsFile,
    IsDir,
}

impl RuntimeHelper {
    pub const ALL: [RuntimeHelper; 12] = [
        RuntimeHelper::Var,
        RuntimeHelper::Int,
        RuntimeHelper::SetInt,
        RuntimeHelper::Format,
        RuntimeHelper::WaitStatus,
        RuntimeHelper::Run,
        RuntimeHelper::Capture,
        RuntimeHelper::Pipeline,
        RuntimeHelper::Background,
        RuntimeHelper::PathExists,
        RuntimeHelper::IsFile,
        RuntimeHelper::IsDir,
    ];

    pub fn name(self) -> &'static str {
        match self {
            RuntimeHelper::Var => "sh_var",
            RuntimeHelper::Int => "sh_int",
            RuntimeHelper::SetInt => "sh_set_int",
            RuntimeHelper::Format => "sh_format",
            RuntimeHelper::WaitStatus => "sh_wait_status",
            RuntimeHelper::Run => "sh_run",
            RuntimeHelper::Capture => "sh_capture",
            RuntimeHelper::Pipeline => "sh_pipeline",
            RuntimeHelper::Background => "sh_background",
            RuntimeHelper::PathExists => "sh_path_exists",
            RuntimeHelper::IsFile => "sh_is_file",
            RuntimeHelper::IsDir => "sh_is_dir",
        }
    }

    fn dependencies(self) -> &'static [RuntimeHelper] {
        match self {
            RuntimeHelper::Run | RuntimeHelper::Capture | RuntimeHelper::Pipeline => {
                &[RuntimeHelper::WaitStatus]
            }
            _ => &[],
        }
    }

    pub fn declaration(self) -> &'static str {
        match self {
            RuntimeHelper::Var => "static const char *sh_var(const char *name);",
            RuntimeHelper::Int => "static long sh_int(const char *text);",
            RuntimeHelper::SetInt => "static void sh_set_int(const char *name, long value);",
            RuntimeHelper::Format => "static char *sh_format(const char *fmt, ...);",
            RuntimeHelper::WaitStatus => "static int sh_wait_status(pid_t pid);",
            RuntimeHelper::Run => "static int sh_run(const char *cmd);",
            RuntimeHelper::Capture => "static char *sh_capture(const char *cmd);",
            RuntimeHelper::Pipeline => {
                "static int sh_pipeline(const char *const *cmds, int n, int *statuses);"
            }
            RuntimeHelper::Background => "static int sh_background(const char *cmd);",
            RuntimeHelper::PathExists => "static int sh_path_exists(const char *path);",
            RuntimeHelper::IsFile => "static int sh_is_file(const char *path);",
            RuntimeHelper::IsDir => "static int sh_is_dir(const char *path);",
        }
    }

    pub fn definition(self) -> &'static str {
        match self {
            RuntimeHelper::Var => SH_VAR,
            RuntimeHelper::Int => SH_INT,
            RuntimeHelper::SetInt => SH_SET_INT,
            RuntimeHelper::Format => SH_FORMAT,
            RuntimeHelper::WaitStatus => SH_WAIT_STATUS,
            RuntimeHelper::Run => SH_RUN,
            RuntimeHelper::Capture => SH_CAPTURE,
            RuntimeHelper::Pipeline => SH_PIPELINE,
            RuntimeHelper::Background => SH_BACKGROUND,
            RuntimeHelper::PathExists => SH_PATH_EXISTS,
            RuntimeHelper::IsFile => SH_IS_FILE,
            RuntimeHelper::IsDir => SH_IS_DIR,
        }
    }
}

/// Helpers required by the program translated so far. Only ever grows.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RuntimeUsage {
    required: BTreeSet<RuntimeHelper>,
}

impl RuntimeUsage {
    pub fn require(&mut self, helper: RuntimeHelper) {
        if self.required.insert(helper) {
            log::debug!("runtime helper {} required", helper.name());
        }
        for dep in helper.dependencies() {
            self.require(*dep);
        }
    }

    pub fn contains(&self, helper: RuntimeHelper) -> bool {
        self.required.contains(&helper)
    }

    pub fn is_empty(&self) -> bool {
        self.required.is_empty()
    }

    /// Required helpers in emission order.
    pub fn iter(&self) -> impl Iterator<Item = RuntimeHelper> + '_ {
        self.required.iter().copied()
    }
}

/// Fixed program preamble: feature macro, includes and the two globals.
pub const PREAMBLE: &str = "\
#define _POSIX_C_SOURCE 200809L
#include <errno.h>
#include <signal.h>
#include <stdarg.h>
#include <stdio.h>
#include <stdlib.h>
#include <string.h>
#include <sys/stat.h>
#include <sys/types.h>
#include <sys/wait.h>
#include <unistd.h>

int last_status = 0;
int last_bg_pid = 0;
";

/// Renders `s` as a C string literal.
pub fn c_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    let mut prev_question = false;
    for ch in s.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            // break up `??` so no trigraph can form
            '?' if prev_question => out.push_str("\\?"),
            c if (c as u32) < 0x20 || c as u32 == 0x7f => {
                out.push_str(&format!("\\{:03o}", c as u32));
            }
            c => out.push(c),
        }
        prev_question = ch == '?';
    }
    out.push('"');
    out
}

const SH_VAR: &str = "\
static const char *sh_var(const char *name)
{
    const char *value = getenv(name);
    return value != NULL ? value : \"\";
}
";

const SH_INT: &str = "\
static long sh_int(const char *text)
{
    return strtol(text, NULL, 10);
}
";

const SH_SET_INT: &str = "\
static void sh_set_int(const char *name, long value)
{
    char text[32];
    snprintf(text, sizeof text, \"%ld\", value);
    setenv(name, text, 1);
}
";

const SH_FORMAT: &str = "\
static char *sh_format(const char *fmt, ...)
{
    va_list ap;
    int len;
    char *buf;

    va_start(ap, fmt);
    len = vsnprintf(NULL, 0, fmt, ap);
    va_end(ap);
    if (len < 0) {
        len = 0;
    }
    buf = malloc((size_t)len + 1);
    if (buf == NULL) {
        perror(\"malloc\");
        exit(1);
    }
    buf[0] = '\\0';
    va_start(ap, fmt);
    vsnprintf(buf, (size_t)len + 1, fmt, ap);
    va_end(ap);
    return buf;
}
";

const SH_WAIT_STATUS: &str = "\
static int sh_wait_status(pid_t pid)
{
    int status;

    while (waitpid(pid, &status, 0) < 0) {
        if (errno != EINTR) {
            return 127;
        }
    }
    if (WIFEXITED(status)) {
        return WEXITSTATUS(status);
    }
    return 127;
}
";

const SH_RUN: &str = "\
static int sh_run(const char *cmd)
{
    pid_t pid;

    fflush(NULL);
    pid = fork();
    if (pid < 0) {
        return 127;
    }
    if (pid == 0) {
        execl(\"/bin/sh\", \"sh\", \"-c\", cmd, (char *)NULL);
        _exit(127);
    }
    return sh_wait_status(pid);
}
";

const SH_CAPTURE: &str = "\
static char *sh_capture(const char *cmd)
{
    int fds[2];
    pid_t pid;
    size_t len = 0;
    size_t cap = 256;
    char *buf = malloc(cap);

    if (buf == NULL) {
        perror(\"malloc\");
        exit(1);
    }
    buf[0] = '\\0';
    if (pipe(fds) != 0) {
        last_status = 127;
        return buf;
    }
    fflush(NULL);
    pid = fork();
    if (pid < 0) {
        close(fds[0]);
        close(fds[1]);
        last_status = 127;
        return buf;
    }
    if (pid == 0) {
        close(fds[0]);
        if (fds[1] != STDOUT_FILENO) {
            dup2(fds[1], STDOUT_FILENO);
            close(fds[1]);
        }
        execl(\"/bin/sh\", \"sh\", \"-c\", cmd, (char *)NULL);
        _exit(127);
    }
    close(fds[1]);
    for (;;) {
        ssize_t got;
        if (len + 1 >= cap) {
            char *grown = realloc(buf, cap * 2);
            if (grown == NULL) {
                perror(\"realloc\");
                exit(1);
            }
            buf = grown;
            cap *= 2;
        }
        got = read(fds[0], buf + len, cap - len - 1);
        if (got < 0 && errno == EINTR) {
            continue;
        }
        if (got <= 0) {
            break;
        }
        len += (size_t)got;
    }
    close(fds[0]);
    while (len > 0 && buf[len - 1] == '\\n') {
        len--;
    }
    buf[len] = '\\0';
    last_status = sh_wait_status(pid);
    return buf;
}
";

const SH_PIPELINE: &str = "\
static int sh_pipeline(const char *const *cmds, int n, int *statuses)
{
    int *fds = NULL;
    pid_t *pids = NULL;
    int opened = 0;
    int spawned = 0;
    int result;
    int i;

    if (n < 1) {
        return -1;
    }
    fds = malloc(sizeof(int) * 2 * (size_t)(n > 1 ? n - 1 : 1));
    pids = malloc(sizeof(pid_t) * (size_t)n);
    if (fds == NULL || pids == NULL) {
        goto fail;
    }
    for (i = 0; i < n - 1; i++) {
        if (pipe(fds + 2 * i) != 0) {
            goto fail;
        }
        opened++;
    }
    fflush(NULL);
    for (i = 0; i < n; i++) {
        pid_t pid = fork();
        if (pid < 0) {
            goto fail;
        }
        if (pid == 0) {
            int j;
            if (i > 0) {
                dup2(fds[2 * (i - 1)], STDIN_FILENO);
            }
            if (i < n - 1) {
                dup2(fds[2 * i + 1], STDOUT_FILENO);
            }
            for (j = 0; j < 2 * opened; j++) {
                close(fds[j]);
            }
            execl(\"/bin/sh\", \"sh\", \"-c\", cmds[i], (char *)NULL);
            _exit(127);
        }
        pids[spawned++] = pid;
    }
    for (i = 0; i < 2 * opened; i++) {
        close(fds[i]);
    }
    for (i = 0; i < n; i++) {
        statuses[i] = sh_wait_status(pids[i]);
    }
    result = statuses[n - 1];
    free(fds);
    free(pids);
    return result;

fail:
    for (i = 0; i < spawned; i++) {
        kill(pids[i], SIGTERM);
        waitpid(pids[i], NULL, 0);
    }
    for (i = 0; i < 2 * opened; i++) {
        close(fds[i]);
    }
    free(fds);
    free(pids);
    return -1;
}
";

const SH_BACKGROUND: &str = "\
static int sh_background(const char *cmd)
{
    int fds[2];
    pid_t mid;
    pid_t job = -1;

    if (pipe(fds) != 0) {
        return -1;
    }
    fflush(NULL);
    mid = fork();
    if (mid < 0) {
        close(fds[0]);
        close(fds[1]);
        return -1;
    }
    if (mid == 0) {
        close(fds[0]);
        setsid();
        job = fork();
        if (job == 0) {
            close(fds[1]);
            execl(\"/bin/sh\", \"sh\", \"-c\", cmd, (char *)NULL);
            _exit(127);
        }
        if (write(fds[1], &job, sizeof job) != (ssize_t)sizeof job) {
            _exit(1);
        }
        _exit(job < 0 ? 1 : 0);
    }
    close(fds[1]);
    if (read(fds[0], &job, sizeof job) != (ssize_t)sizeof job) {
        job = -1;
    }
    close(fds[0]);
    while (waitpid(mid, NULL, 0) < 0 && errno == EINTR) {
    }
    return (int)job;
}
";

const SH_PATH_EXISTS: &str = "\
static int sh_path_exists(const char *path)
{
    struct stat st;
    return stat(path, &st) == 0;
}
";

const SH_IS_FILE: &str = "\
static int sh_is_file(const char *path)
{
    struct stat st;
    return stat(path, &st) == 0 && S_ISREG(st.st_mode);
}
";

const SH_IS_DIR: &str = "\
static int sh_is_dir(const char *path)
{
    struct stat st;
    return stat(path, &st) == 0 && S_ISDIR(st.st_mode);
}
";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requiring_a_spawner_pulls_in_wait_status() {
        let mut usage = RuntimeUsage::default();
        usage.require(RuntimeHelper::Pipeline);
        assert!(usage.contains(RuntimeHelper::WaitStatus));
        assert!(!usage.contains(RuntimeHelper::Run));
    }

    #[test]
    fn iteration_follows_declaration_order() {
        let mut usage = RuntimeUsage::default();
        usage.require(RuntimeHelper::IsDir);
        usage.require(RuntimeHelper::Var);
        usage.require(RuntimeHelper::Run);
        usage.require(RuntimeHelper::Var);
        let names: Vec<&str> = usage.iter().map(RuntimeHelper::name).collect();
        assert_eq!(names, vec!["sh_var", "sh_wait_status", "sh_run", "sh_is_dir"]);
    }

    #[test]
    fn every_definition_matches_its_declaration() {
        for helper in RuntimeHelper::ALL {
            let decl = helper.declaration().trim_end_matches(';');
            assert!(
                helper.definition().starts_with(decl),
                "{} definition does not start with its declaration",
                helper.name()
            );
        }
    }

    #[test]
    fn c_string_escapes() {
        assert_eq!(c_string("a\"b\\c\nd"), "\"a\\\"b\\\\c\\nd\"");
        assert_eq!(c_string("??="), "\"?\\?=\"");
        assert_eq!(c_string("\u{1}"), "\"\\001\"");
        assert_eq!(c_string("100%"), "\"100%\"");
    }
}
