mod user;
mod document;

pub use document::*;
pub use user::*;
