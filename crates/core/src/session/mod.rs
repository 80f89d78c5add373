//! Authentication, permissions and role menus.

mod access;
mod system;

pub use access::{menu_for, MenuEntry, Permission};
pub use system::{LoginAttempts, RentalSystem, Session};
