//! # rete-scanner
//!
//! The scanner turns rule surface syntax into a stream of typed tokens:
//! parentheses, literals, variables and wildcards, instance-name brackets,
//! and the `~`/`|`/`&` constraint connectives. See [`Scanner::get_token`]
//! for the token-recognition contract.

pub mod scanner;
pub mod token;

pub use scanner::Scanner;
pub use token::{Token, TokenKind};
