pub mod draw_service;
pub mod participation_service;
pub mod raffle_service;
pub mod ticket_service;

pub use draw_service::*;
pub use participation_service::*;
pub use raffle_service::*;
pub use ticket_service::*;
