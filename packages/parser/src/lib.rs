//! Reference host grammar ("flow notation", `.flow` files) for the diagram
//! pipeline.

pub mod error;
pub mod parser;
#[cfg(feature = "pretty-errors")]
pub mod pretty;
pub mod quote;
pub mod tokenizer;

pub use error::{ParseError, ParseResult};
pub use parser::{keyword_for, parse, type_tag_for, ParseOutput, Parser, DOCUMENT_TYPE};
pub use quote::{format_name, is_identifier, quote, unquote};
pub use tokenizer::{tokenize, Token};
