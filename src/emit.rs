//! Statement emitters and the translation context they share.
//!
//! Every emitter appends C lines for exactly one statement. Errors never
//! escape this module: they become a marker comment, an error diagnostic and
//! a safe fallback, and translation moves on to the next statement.

use crate::arith;
use crate::block::{BlockKind, BlockStack, Frame};
use crate::classify::{self, Classified, Kind};
use crate::cond::{self, Operand};
use crate::diag::Diagnostics;
use crate::error::TranslateError;
use crate::interp::{self, Arg, Interpolated};
use crate::lexer;
use crate::runtime::{RuntimeHelper, RuntimeUsage, c_string};

/// A C string expression. Heap-built values carry the declaration of the
/// temporary that holds them; the temporary is freed after use.
struct CValue {
    expr: String,
    decl: Option<String>,
}

impl CValue {
    fn borrowed(expr: String) -> Self {
        Self { expr, decl: None }
    }
}

pub struct Context {
    pub blocks: BlockStack,
    pub usage: RuntimeUsage,
    pub diagnostics: Diagnostics,
    out: String,
    unit: String,
    /// Extra indentation for helper scopes opened inside one statement.
    scope: usize,
    counter: usize,
    file: String,
    line: usize,
}

impl Context {
    pub fn new(file: &str, unit: &str) -> Self {
        Self {
            blocks: BlockStack::new(unit),
            usage: RuntimeUsage::default(),
            diagnostics: Diagnostics::new(file),
            out: String::new(),
            unit: unit.to_string(),
            scope: 0,
            counter: 0,
            file: file.to_string(),
            line: 0,
        }
    }

    /// Closes every block still open, reporting each unterminated one, and
    /// hands back the translated body.
    pub fn finish(mut self) -> (String, RuntimeUsage, Diagnostics) {
        while let Some(frame) = self.blocks.pop_innermost() {
            if !frame.chained {
                self.line = frame.line;
                self.fail(TranslateError::Unterminated { opener: frame.opener.clone() });
            }
            self.close_frame(&frame);
        }
        (self.out, self.usage, self.diagnostics)
    }

    fn emit(&mut self, code: &str) {
        self.out.push_str(&self.blocks.prefix());
        for _ in 0..self.scope {
            self.out.push_str(&self.unit);
        }
        self.out.push_str(code);
        self.out.push('\n');
    }

    fn emit_nested(&mut self, code: &str) {
        self.scope += 1;
        self.emit(code);
        self.scope -= 1;
    }

    fn fresh_id(&mut self) -> usize {
        self.counter += 1;
        self.counter
    }

    fn fail(&mut self, err: TranslateError) {
        let message = err.to_string();
        let marker = format!(
            "/* shtoc: {}:{}: {} */",
            self.file,
            self.line,
            message.replace("*/", "* /")
        );
        self.emit(&marker);
        self.diagnostics.error(self.line, message);
    }

    /// Emits `body`, wrapped in a `{ }` scope that declares and frees the
    /// temporaries behind `values` when there are any (or when `force`).
    fn scoped(&mut self, values: &[&CValue], body: &[String], force: bool) {
        let decls: Vec<&CValue> = values.iter().copied().filter(|v| v.decl.is_some()).collect();
        if decls.is_empty() && !force {
            for line in body {
                self.emit(line);
            }
            return;
        }
        self.emit("{");
        self.scope += 1;
        for value in &decls {
            if let Some(decl) = &value.decl {
                self.emit(decl);
            }
        }
        for line in body {
            self.emit(line);
        }
        for value in &decls {
            self.emit(&format!("free({});", value.expr));
        }
        self.scope -= 1;
        self.emit("}");
    }

    fn arg_expr(&mut self, arg: &Arg) -> String {
        match arg {
            Arg::Var(name) => {
                self.usage.require(RuntimeHelper::Var);
                format!("sh_var({})", c_string(name))
            }
            Arg::Status => "last_status".to_string(),
            Arg::BackgroundPid => "last_bg_pid".to_string(),
        }
    }

    fn format_call(&mut self, func: &str, format: &str, args: &[Arg]) -> String {
        let mut call = format!("{}({}", func, c_string(format));
        for arg in args {
            call.push_str(", ");
            call.push_str(&self.arg_expr(arg));
        }
        call.push(')');
        call
    }

    fn value(&mut self, value: Interpolated, temp: &str) -> CValue {
        match value {
            Interpolated::Literal(text) => CValue::borrowed(c_string(&text)),
            Interpolated::Format { format, args } => {
                if let [Arg::Var(name)] = args.as_slice() {
                    if format == "%s" {
                        self.usage.require(RuntimeHelper::Var);
                        return CValue::borrowed(format!("sh_var({})", c_string(name)));
                    }
                }
                self.usage.require(RuntimeHelper::Format);
                let call = self.format_call("sh_format", &format, &args);
                CValue { expr: temp.to_string(), decl: Some(format!("char *{} = {};", temp, call)) }
            }
        }
    }

    /// Prints interpolated text. Literal text never reaches a format string.
    fn print(&mut self, value: Interpolated, newline: bool) {
        let line = match value {
            Interpolated::Literal(text) if newline => format!("puts({});", c_string(&text)),
            Interpolated::Literal(text) => format!("fputs({}, stdout);", c_string(&text)),
            Interpolated::Format { mut format, args } => {
                if newline {
                    format.push('\n');
                }
                format!("{};", self.format_call("printf", &format, &args))
            }
        };
        self.emit(&line);
        self.emit("last_status = 0;");
    }

    fn test(&mut self, expr: &str) {
        match cond::translate(expr, &mut self.usage) {
            Ok(c) => self.emit(&format!("last_status = ({}) ? 0 : 1;", c)),
            Err(err) => {
                self.fail(err);
                self.emit("last_status = 1;");
            }
        }
    }

    fn run(&mut self, command: &str) {
        let cmd = self.value(interp::interpolate_command(command), "sh_cmd");
        self.usage.require(RuntimeHelper::Run);
        let body = [format!("last_status = sh_run({});", cmd.expr)];
        self.scoped(&[&cmd], &body, false);
    }

    /// Leaves the outcome of an `if`/`elif`/`while` condition in
    /// `last_status`: a test expression, `true`/`false`, or any command.
    fn condition(&mut self, text: &str) {
        let (negated, text) = match text.strip_prefix('!') {
            Some(rest) if rest.starts_with(char::is_whitespace) => (true, rest.trim_start()),
            _ => (false, text),
        };
        if let Some(expr) = classify::test_expression(text) {
            self.test(expr);
        } else {
            match text {
                "true" | ":" => self.emit("last_status = 0;"),
                "false" => self.emit("last_status = 1;"),
                command => self.run(command),
            }
        }
        if negated {
            self.emit("last_status = last_status == 0 ? 1 : 0;");
        }
    }

    fn close_frame(&mut self, frame: &Frame) {
        self.emit("}");
        for line in &frame.epilogue {
            self.emit(line);
        }
    }

    /// Pops and closes the innermost block. A block of the other kind is
    /// closed anyway with a warning.
    fn close(&mut self, keyword: &str, expected: BlockKind) -> Result<Frame, TranslateError> {
        let frame = self.blocks.pop(keyword)?;
        if frame.kind != expected {
            self.diagnostics.warn(
                self.line,
                format!(
                    "`{}` closes the `{}` block opened on line {} (expected `{}`)",
                    keyword,
                    frame.opener,
                    frame.line,
                    frame.kind.closer()
                ),
            );
        }
        self.close_frame(&frame);
        Ok(frame)
    }

    /// Turns the innermost conditional into its `else` branch and returns
    /// its frame for the caller to push back. A loop, or a conditional that
    /// already took its `else`, stays open untouched.
    fn reopen_if(&mut self, keyword: &str) -> Result<Frame, TranslateError> {
        let mut frame = self.blocks.pop(keyword)?;
        if frame.kind != BlockKind::If || frame.in_else {
            self.blocks.push(frame);
            return Err(TranslateError::structural(keyword));
        }
        self.emit("} else {");
        frame.in_else = true;
        Ok(frame)
    }
}

pub fn emit_statement(ctx: &mut Context, line: usize, stmt: &Classified<'_>) {
    ctx.line = line;
    let field = |name: &str| stmt.field(name).unwrap_or_default();
    let result = match stmt.kind {
        Kind::Comment | Kind::Then => Ok(()),
        Kind::Pipeline => pipeline(ctx, stmt.text),
        Kind::Echo => echo(ctx, field("args")),
        Kind::ArithAssign => arith_assign(ctx, field("name"), field("expr")),
        Kind::CaptureAssign => capture_assign(ctx, field("name"), field("cmd")),
        Kind::ArithPrint => arith_print(ctx, field("expr")),
        Kind::Test => {
            ctx.test(field("expr"));
            Ok(())
        }
        Kind::Cd => cd(ctx, stmt.field("dir")),
        Kind::If => {
            open_if(ctx, field("cond"));
            Ok(())
        }
        Kind::Elif => elif(ctx, field("cond")),
        Kind::While => {
            while_loop(ctx, field("cond"));
            Ok(())
        }
        Kind::Else => ctx.reopen_if("else").map(|frame| ctx.blocks.push(frame)),
        Kind::Fi => fi(ctx),
        Kind::For => for_loop(ctx, field("var"), stmt.field("items")),
        Kind::Done => ctx.close("done", BlockKind::Loop).map(drop),
        Kind::Exit => exit(ctx, stmt.field("code")),
        Kind::Background => background(ctx, field("cmd")),
        Kind::Assign => assign(ctx, field("name"), field("value")),
        Kind::Informational => {
            informational(ctx, field("cmd"), stmt.text);
            Ok(())
        }
        Kind::VarPrint => {
            ctx.print(interp::interpolate(stmt.text), true);
            Ok(())
        }
        Kind::Unsupported => Err(TranslateError::unsupported(stmt.text)),
    };
    if let Err(err) = result {
        ctx.fail(err);
    }
}

fn pipeline(ctx: &mut Context, text: &str) -> Result<(), TranslateError> {
    let stages = lexer::split_pipeline(text).ok_or_else(|| TranslateError::unsupported(text))?;
    let n = stages.len();
    let mut cmds = Vec::with_capacity(n);
    for (i, stage) in stages.iter().enumerate() {
        cmds.push(ctx.value(interp::interpolate_command(stage), &format!("sh_cmd_{}", i)));
    }
    ctx.usage.require(RuntimeHelper::Pipeline);

    let list: Vec<&str> = cmds.iter().map(|c| c.expr.as_str()).collect();
    let body = [
        format!("const char *sh_cmds[{}] = {{ {} }};", n, list.join(", ")),
        format!("int sh_statuses[{}];", n),
        format!("int sh_rc = sh_pipeline(sh_cmds, {}, sh_statuses);", n),
        "last_status = sh_rc < 0 ? 127 : sh_rc;".to_string(),
    ];
    let values: Vec<&CValue> = cmds.iter().collect();
    ctx.scoped(&values, &body, true);
    Ok(())
}

fn echo(ctx: &mut Context, args: &str) -> Result<(), TranslateError> {
    if lexer::has_redirection(args) {
        return Err(TranslateError::unsupported(format!("redirection in `echo {}`", args)));
    }
    if lexer::has_list_operator(args) {
        return Err(TranslateError::unsupported(format!("command list in `echo {}`", args)));
    }
    if args.contains("$(") || args.contains('`') {
        return Err(TranslateError::unsupported(format!(
            "command substitution in `echo {}`",
            args
        )));
    }
    let mut words = lexer::split_words(args);
    let newline = words.first().map(String::as_str) != Some("-n");
    if !newline {
        words.remove(0);
    }
    let parts = words.iter().map(|w| interp::interpolate_word(w)).collect();
    ctx.print(Interpolated::join(parts, " "), newline);
    Ok(())
}

fn arith_assign(ctx: &mut Context, name: &str, expr: &str) -> Result<(), TranslateError> {
    let value = arith::translate(expr, &mut ctx.usage)?;
    ctx.usage.require(RuntimeHelper::SetInt);
    ctx.emit(&format!("sh_set_int({}, {});", c_string(name), value));
    ctx.emit("last_status = 0;");
    Ok(())
}

fn arith_print(ctx: &mut Context, expr: &str) -> Result<(), TranslateError> {
    let value = arith::translate(expr, &mut ctx.usage)?;
    ctx.emit(&format!("printf(\"%ld\\n\", (long){});", value));
    ctx.emit("last_status = 0;");
    Ok(())
}

fn capture_assign(ctx: &mut Context, name: &str, command: &str) -> Result<(), TranslateError> {
    let cmd = ctx.value(interp::interpolate_command(command), "sh_cmd");
    ctx.usage.require(RuntimeHelper::Capture);
    let body = [
        format!("char *sh_out = sh_capture({});", cmd.expr),
        format!("setenv({}, sh_out, 1);", c_string(name)),
        "free(sh_out);".to_string(),
    ];
    ctx.scoped(&[&cmd], &body, true);
    Ok(())
}

fn cd(ctx: &mut Context, dir: Option<&str>) -> Result<(), TranslateError> {
    let target = match dir {
        Some(dir) => match lexer::split_words(dir).as_slice() {
            [word] => ctx.value(interp::interpolate_word(word), "sh_dir"),
            _ => return Err(TranslateError::unsupported(format!("cd {}", dir))),
        },
        None => {
            ctx.usage.require(RuntimeHelper::Var);
            CValue::borrowed("sh_var(\"HOME\")".to_string())
        }
    };
    let body = [format!("last_status = chdir({}) == 0 ? 0 : 1;", target.expr)];
    ctx.scoped(&[&target], &body, false);
    Ok(())
}

fn open_if(ctx: &mut Context, cond: &str) {
    ctx.condition(cond);
    ctx.emit("if (last_status == 0) {");
    let line = ctx.line;
    ctx.blocks.push(Frame::new(BlockKind::If, "if", line));
}

/// `elif` becomes a conditional nested in the `else` branch of the previous
/// one. The inner frame is chained so one `fi` closes both.
fn elif(ctx: &mut Context, cond: &str) -> Result<(), TranslateError> {
    let frame = ctx.reopen_if("elif")?;
    ctx.blocks.push(frame);
    ctx.condition(cond);
    ctx.emit("if (last_status == 0) {");
    let line = ctx.line;
    ctx.blocks.push(Frame::new(BlockKind::If, "elif", line).chained(true));
    Ok(())
}

fn fi(ctx: &mut Context) -> Result<(), TranslateError> {
    let mut frame = ctx.close("fi", BlockKind::If)?;
    while frame.chained {
        let Some(outer) = ctx.blocks.pop_innermost() else { break };
        ctx.close_frame(&outer);
        frame = outer;
    }
    Ok(())
}

fn while_loop(ctx: &mut Context, cond: &str) {
    ctx.emit("for (;;) {");
    let line = ctx.line;
    ctx.blocks.push(Frame::new(BlockKind::Loop, "while", line));
    ctx.condition(cond);
    ctx.emit("if (last_status != 0) {");
    ctx.emit_nested("break;");
    ctx.emit("}");
}

fn for_loop(ctx: &mut Context, var: &str, items: Option<&str>) -> Result<(), TranslateError> {
    let words = items.map(lexer::split_words).unwrap_or_default();
    let line = ctx.line;
    if words.is_empty() {
        ctx.emit("while (0) {");
        ctx.blocks.push(Frame::new(BlockKind::Loop, "for", line));
        return Ok(());
    }

    let values: Vec<Interpolated> = words.iter().map(|w| interp::interpolate_word(w)).collect();
    let owned = !values.iter().all(Interpolated::is_literal);
    let mut exprs = Vec::with_capacity(values.len());
    for value in values {
        exprs.push(match value {
            Interpolated::Literal(text) if !owned => c_string(&text),
            Interpolated::Literal(text) => {
                ctx.usage.require(RuntimeHelper::Format);
                format!("sh_format(\"%s\", {})", c_string(&text))
            }
            Interpolated::Format { format, args } => {
                ctx.usage.require(RuntimeHelper::Format);
                ctx.format_call("sh_format", &format, &args)
            }
        });
    }

    let id = ctx.fresh_id();
    let items = format!("sh_items_{}", id);
    let index = format!("sh_i_{}", id);
    let n = exprs.len();
    let mut epilogue = Vec::new();
    if owned {
        ctx.emit(&format!("char *{}[] = {{ {} }};", items, exprs.join(", ")));
        epilogue.extend((0..n).map(|k| format!("free({}[{}]);", items, k)));
    } else {
        ctx.emit(&format!("static const char *const {}[] = {{ {} }};", items, exprs.join(", ")));
    }
    ctx.emit(&format!("for (size_t {i} = 0; {i} < {n}; {i}++) {{", i = index, n = n));
    ctx.blocks.push(Frame::new(BlockKind::Loop, "for", line).with_epilogue(epilogue));
    ctx.emit(&format!("setenv({}, {}[{}], 1);", c_string(var), items, index));
    Ok(())
}

fn exit(ctx: &mut Context, code: Option<&str>) -> Result<(), TranslateError> {
    let status = match code {
        None => "last_status".to_string(),
        Some(raw) => Operand::resolve(raw)?.int_expr(&mut ctx.usage),
    };
    ctx.emit(&format!("return (int)({});", status));
    Ok(())
}

fn background(ctx: &mut Context, command: &str) -> Result<(), TranslateError> {
    let cmd = ctx.value(interp::interpolate_command(command), "sh_cmd");
    ctx.usage.require(RuntimeHelper::Background);
    let body = [
        format!("last_bg_pid = sh_background({});", cmd.expr),
        "last_status = last_bg_pid < 0 ? 127 : 0;".to_string(),
    ];
    ctx.scoped(&[&cmd], &body, false);
    Ok(())
}

fn assign(ctx: &mut Context, name: &str, value: &str) -> Result<(), TranslateError> {
    let value = ctx.value(interp::interpolate_word(value), "sh_value");
    let body = [format!("setenv({}, {}, 1);", c_string(name), value.expr)];
    ctx.scoped(&[&value], &body, false);
    ctx.emit("last_status = 0;");
    Ok(())
}

fn informational(ctx: &mut Context, command: &str, text: &str) {
    match command {
        "true" | ":" => ctx.emit("last_status = 0;"),
        "false" => ctx.emit("last_status = 1;"),
        "pwd" => {
            ctx.emit("{");
            ctx.scope += 1;
            ctx.emit("char sh_cwd[4096];");
            ctx.emit("if (getcwd(sh_cwd, sizeof sh_cwd) != NULL) {");
            ctx.emit_nested("puts(sh_cwd);");
            ctx.emit_nested("last_status = 0;");
            ctx.emit("} else {");
            ctx.emit_nested("last_status = 1;");
            ctx.emit("}");
            ctx.scope -= 1;
            ctx.emit("}");
        }
        _ => ctx.run(text),
    }
}
