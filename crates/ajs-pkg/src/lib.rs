// AJS package support: the persistent package database used to locate
// `package.element` declarations, and the `.rc` resource file giving
// the script search paths.

pub mod database;
pub mod resources;

pub use database::{Database, Element};
pub use resources::Resources;
