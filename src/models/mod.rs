pub mod api;
pub mod internal;
pub mod rows;


pub use api::*;
pub use internal::*;
