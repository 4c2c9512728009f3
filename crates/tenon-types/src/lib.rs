pub mod history;
pub mod kind;
pub mod pick;
pub mod tag;

pub use history::*;
pub use kind::*;
pub use pick::*;
pub use tag::*;
