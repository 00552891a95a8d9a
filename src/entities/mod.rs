pub mod prelude;

pub mod hostelers;
pub mod hostels;
pub mod outpasses;
pub mod users;
