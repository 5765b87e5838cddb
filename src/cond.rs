use crate::error::TranslateError;
use crate::interp::{self, Arg, Interpolated};
use crate::lexer;
use crate::runtime::{RuntimeHelper, RuntimeUsage, c_string};

/// One side of a test expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    Var(String),
    Status,
    BackgroundPid,
    Literal(String),
}

impl Operand {
    pub fn resolve(raw: &str) -> Result<Operand, TranslateError> {
        match interp::interpolate_word(raw) {
            Interpolated::Literal(text) => Ok(Operand::Literal(text)),
            resolved => match resolved.single_arg() {
                Some(Arg::Var(name)) => Ok(Operand::Var(name.clone())),
                Some(Arg::Status) => Ok(Operand::Status),
                Some(Arg::BackgroundPid) => Ok(Operand::BackgroundPid),
                None => Err(TranslateError::unsupported(format!(
                    "test operand `{}` mixes text and variable references",
                    raw
                ))),
            },
        }
    }

    fn is_pseudo(&self) -> bool {
        matches!(self, Operand::Status | Operand::BackgroundPid)
    }

    /// C `const char *` expression. `None` for the integer pseudo-variables.
    fn string_expr(&self, usage: &mut RuntimeUsage) -> Option<String> {
        match self {
            Operand::Var(name) => {
                usage.require(RuntimeHelper::Var);
                Some(format!("sh_var({})", c_string(name)))
            }
            Operand::Literal(text) => Some(c_string(text)),
            Operand::Status | Operand::BackgroundPid => None,
        }
    }

    /// C `long` expression; non-numeric text coerces to zero.
    pub fn int_expr(&self, usage: &mut RuntimeUsage) -> String {
        match self {
            Operand::Var(name) => {
                usage.require(RuntimeHelper::Var);
                usage.require(RuntimeHelper::Int);
                format!("sh_int(sh_var({}))", c_string(name))
            }
            Operand::Status => "last_status".to_string(),
            Operand::BackgroundPid => "last_bg_pid".to_string(),
            Operand::Literal(text) => match text.trim().parse::<i64>() {
                Ok(n) => format!("{}L", n),
                Err(_) => {
                    usage.require(RuntimeHelper::Int);
                    format!("sh_int({})", c_string(text))
                }
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BinaryOp {
    StrEq,
    StrNe,
    Eq,
    Ne,
    Gt,
    Lt,
    Ge,
    Le,
}

impl BinaryOp {
    fn parse(op: &str) -> Option<BinaryOp> {
        Some(match op {
            "=" | "==" => BinaryOp::StrEq,
            "!=" => BinaryOp::StrNe,
            "-eq" => BinaryOp::Eq,
            "-ne" => BinaryOp::Ne,
            "-gt" => BinaryOp::Gt,
            "-lt" => BinaryOp::Lt,
            "-ge" => BinaryOp::Ge,
            "-le" => BinaryOp::Le,
            _ => return None,
        })
    }

    fn c_operator(self) -> &'static str {
        match self {
            BinaryOp::StrEq | BinaryOp::Eq => "==",
            BinaryOp::StrNe | BinaryOp::Ne => "!=",
            BinaryOp::Gt => ">",
            BinaryOp::Lt => "<",
            BinaryOp::Ge => ">=",
            BinaryOp::Le => "<=",
        }
    }
}

/// Translates a test expression (already stripped of `[ ]`, `[[ ]]` or
/// `test`) into a C expression that is non-zero when the test holds.
///
/// On error the caller is expected to substitute a constant false.
pub fn translate(expr: &str, usage: &mut RuntimeUsage) -> Result<String, TranslateError> {
    let tokens = lexer::split_words(expr);
    translate_tokens(&tokens, usage)
}

fn translate_tokens(tokens: &[String], usage: &mut RuntimeUsage) -> Result<String, TranslateError> {
    if let [lhs, op, rhs] = tokens {
        if let Some(op) = BinaryOp::parse(op) {
            return binary(Operand::resolve(lhs)?, op, Operand::resolve(rhs)?, usage);
        }
    }
    match tokens {
        [] => Err(TranslateError::unsupported("empty test expression")),
        [bang, rest @ ..] if bang == "!" && !rest.is_empty() => {
            Ok(format!("!{}", translate_tokens(rest, usage)?))
        }
        [operand] => non_empty(&Operand::resolve(operand)?, usage),
        [op, operand] => unary(op, &Operand::resolve(operand)?, usage),
        [_, op, _] => Err(TranslateError::operator(op.as_str())),
        _ => Err(TranslateError::unsupported(format!(
            "test expression with {} words",
            tokens.len()
        ))),
    }
}

fn non_empty(operand: &Operand, usage: &mut RuntimeUsage) -> Result<String, TranslateError> {
    Ok(match operand {
        Operand::Literal(text) => if text.is_empty() { "0" } else { "1" }.to_string(),
        Operand::Status | Operand::BackgroundPid => "1".to_string(),
        Operand::Var(name) => {
            usage.require(RuntimeHelper::Var);
            format!("(sh_var({})[0] != '\\0')", c_string(name))
        }
    })
}

fn unary(op: &str, operand: &Operand, usage: &mut RuntimeUsage) -> Result<String, TranslateError> {
    let helper = match op {
        "-n" => return non_empty(operand, usage),
        "-z" => return non_empty(operand, usage).map(|e| negate(&e)),
        "-e" => RuntimeHelper::PathExists,
        "-f" => RuntimeHelper::IsFile,
        "-d" => RuntimeHelper::IsDir,
        _ => return Err(TranslateError::operator(op)),
    };
    match operand.string_expr(usage) {
        Some(path) => {
            usage.require(helper);
            Ok(format!("{}({})", helper.name(), path))
        }
        None => Ok("0".to_string()),
    }
}

fn binary(lhs: Operand, op: BinaryOp, rhs: Operand, usage: &mut RuntimeUsage) -> Result<String, TranslateError> {
    let string_compare = matches!(op, BinaryOp::StrEq | BinaryOp::StrNe) && !lhs.is_pseudo() && !rhs.is_pseudo();
    if string_compare {
        if let (Some(l), Some(r)) = (lhs.string_expr(usage), rhs.string_expr(usage)) {
            return Ok(format!("(strcmp({}, {}) {} 0)", l, r, op.c_operator()));
        }
    }
    Ok(format!(
        "({} {} {})",
        lhs.int_expr(usage),
        op.c_operator(),
        rhs.int_expr(usage)
    ))
}

fn negate(expr: &str) -> String {
    match expr {
        "0" => "1".to_string(),
        "1" => "0".to_string(),
        e => format!("!{}", e),
    }
}
