// AJS parser -- token stream to abstract syntax tree.
//
// The `node` module defines the uniform AST node used by every later
// stage; the `parser` module is the hand-written recursive-descent
// parser producing a PROGRAM node from a token stream.

pub mod node;
pub mod parser;

pub use node::{NodeAttr, NodeFlag, NodeKind, NodeRef, NodeWeak};
pub use parser::Parser;
