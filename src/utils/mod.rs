pub mod code_generator;
pub mod jwt;
pub mod ticket_crypto;

pub use code_generator::generate_ticket_code;
pub use jwt::*;
pub use ticket_crypto::TicketCrypto;
