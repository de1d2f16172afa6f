// src/lib.rs

pub mod aliases;
pub mod constants;
pub mod parser;
pub mod progress;
pub mod tty;
