pub mod movie;
pub mod paging;

pub use paging::{Listing, Paging};
