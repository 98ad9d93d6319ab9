pub mod enums;
pub mod user;
pub mod document;
pub mod conversation;

pub use conversation::*;
pub use document::*;
pub use enums::*;
pub use user::*;
