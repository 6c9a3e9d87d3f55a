//! Model identifiers: defaulting and provider/suffix splitting.

pub mod reference;

pub use reference::*;
