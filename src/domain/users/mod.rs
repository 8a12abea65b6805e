pub mod contact;
mod member;
mod profile;
mod staff;

pub use member::{Member, MembershipState, MembershipType};
pub use profile::{LibraryUser, Role, UserProfile};
pub use staff::{Admin, Librarian};
