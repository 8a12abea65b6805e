mod commands;
mod members;
mod staff;

pub use commands::*;
pub use members::{
    expire_memberships, extend_membership, get_all_members, get_member, get_member_by_email,
    reactivate_member, register_member, suspend_member, upgrade_membership,
};
pub use staff::{get_librarian, register_librarian};
