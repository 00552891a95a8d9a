pub mod hostel;
pub mod hosteler;
pub mod outpass;
pub mod user;
