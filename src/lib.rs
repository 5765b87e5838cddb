pub mod arith;
pub mod block;
pub mod classify;
pub mod codegen;
pub mod cond;
pub mod diag;
pub mod driver;
pub mod emit;
pub mod error;
pub mod interp;
pub mod lexer;
pub mod runtime;
pub mod segment;
