pub mod common;
pub mod pagination;
pub mod participation;
pub mod raffle;
pub mod ticket;

pub use common::*;
pub use pagination::*;
pub use participation::*;
pub use raffle::*;
pub use ticket::*;
