//! gqlx lexers.
//!
//! [`Lexer`] tokenizes embedded resolver expressions on demand, starting at
//! an arbitrary byte offset of the composite source, so the parser can stop
//! exactly where an expression ends. [`SdlLexer`] tokenizes the declarative
//! schema text around those expressions.

pub mod lexer;
pub mod sdl;
pub mod token;

pub use lexer::Lexer;
pub use sdl::{SdlLexer, SdlToken, SdlTokenKind};
pub use token::{Token, TokenKind, PUNCTUATORS, RESERVED_WORDS};
