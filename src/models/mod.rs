pub mod outpass;
pub mod people;

pub use outpass::{HostelPageFilter, NewOutPass, OutPass, OutPassWithRefs, SortDirection};
pub use people::{Hostel, Hosteler};
