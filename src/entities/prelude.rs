pub use super::hostelers::Entity as Hostelers;
pub use super::hostels::Entity as Hostels;
pub use super::outpasses::Entity as Outpasses;
pub use super::users::Entity as Users;
