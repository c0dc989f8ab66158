pub mod user;
pub mod dome;
pub mod show;
pub mod session;
pub mod reservation;

pub use user::User;
pub use dome::Dome;
pub use show::{Show, Theme};
pub use session::Session;
pub use reservation::{Reservation, SeatKey, Ticket, TicketRequest};
