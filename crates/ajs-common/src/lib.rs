// AJS compiler shared types.
//
// Everything the front-end stages have in common lives here: source
// positions, the token vocabulary produced by the lexer, the dialect
// options toggled by pragmas, and the message (diagnostics) system.

pub mod message;
pub mod options;
pub mod position;
pub mod token;
