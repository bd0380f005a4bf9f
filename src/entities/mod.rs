pub mod participations;
pub mod raffles;
pub mod tickets;

pub use participations as participation_entity;
pub use raffles as raffle_entity;
pub use tickets as ticket_entity;

pub use raffles::RaffleStatus;
pub use tickets::TicketStatus;
