//! Role permissions and menus.

use crate::models::Role;

/// Capability checked before every [`super::RentalSystem`] operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    /// Create, edit and deactivate accounts.
    ManageUsers,
    /// Maintain the fleet.
    ManageVehicles,
    /// Maintain client records.
    ManageClients,
    /// Book, deliver and close rentals for any client.
    ManageRentals,
    /// Browse vehicles that can be booked.
    BrowseAvailableVehicles,
    /// View and edit the client record linked to the account.
    OwnProfile,
    /// List and book rentals for the linked client record.
    OwnRentals,
}

impl Role {
    /// Whether this role holds `permission`.
    pub fn allows(&self, permission: Permission) -> bool {
        use Permission::*;
        match self {
            Role::Administrador => !matches!(permission, OwnProfile | OwnRentals),
            Role::Asistente => matches!(
                permission,
                ManageVehicles | ManageClients | ManageRentals | BrowseAvailableVehicles
            ),
            Role::Cliente => {
                matches!(permission, BrowseAvailableVehicles | OwnProfile | OwnRentals)
            }
        }
    }
}

/// Entry of the main menu shown after login.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuEntry {
    /// Account administration.
    Users,
    /// Fleet list.
    Vehicles,
    /// Client list.
    Clients,
    /// Every rental.
    Rentals,
    /// Linked client record of a CLIENTE account.
    MyProfile,
    /// Rentals of the linked client.
    MyRentals,
    /// End the session.
    Logout,
}

impl MenuEntry {
    /// Text shown in the menu.
    pub fn label(&self) -> &'static str {
        match self {
            MenuEntry::Users => "Users",
            MenuEntry::Vehicles => "Vehicles",
            MenuEntry::Clients => "Clients",
            MenuEntry::Rentals => "Rentals",
            MenuEntry::MyProfile => "My profile",
            MenuEntry::MyRentals => "My rentals",
            MenuEntry::Logout => "Logout",
        }
    }

    /// Permission needed to open the entry; `None` for [`MenuEntry::Logout`].
    pub fn permission(&self) -> Option<Permission> {
        match self {
            MenuEntry::Users => Some(Permission::ManageUsers),
            MenuEntry::Vehicles => Some(Permission::ManageVehicles),
            MenuEntry::Clients => Some(Permission::ManageClients),
            MenuEntry::Rentals => Some(Permission::ManageRentals),
            MenuEntry::MyProfile => Some(Permission::OwnProfile),
            MenuEntry::MyRentals => Some(Permission::OwnRentals),
            MenuEntry::Logout => None,
        }
    }
}

const ADMIN_MENU: &[MenuEntry] = &[
    MenuEntry::Users,
    MenuEntry::Vehicles,
    MenuEntry::Clients,
    MenuEntry::Rentals,
    MenuEntry::Logout,
];
const ASSISTANT_MENU: &[MenuEntry] = &[
    MenuEntry::Vehicles,
    MenuEntry::Clients,
    MenuEntry::Rentals,
    MenuEntry::Logout,
];
const CLIENT_MENU: &[MenuEntry] = &[MenuEntry::MyProfile, MenuEntry::MyRentals, MenuEntry::Logout];

/// Main menu for `role`, in display order.
pub fn menu_for(role: Role) -> &'static [MenuEntry] {
    match role {
        Role::Administrador => ADMIN_MENU,
        Role::Asistente => ASSISTANT_MENU,
        Role::Cliente => CLIENT_MENU,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn menus_match_roles() {
        assert_eq!(menu_for(Role::Administrador).len(), 5);
        assert_eq!(menu_for(Role::Administrador)[0], MenuEntry::Users);
        assert!(!menu_for(Role::Asistente).contains(&MenuEntry::Users));
        assert_eq!(
            menu_for(Role::Cliente),
            &[MenuEntry::MyProfile, MenuEntry::MyRentals, MenuEntry::Logout]
        );
    }

    #[test]
    fn every_menu_entry_is_permitted() {
        for role in Role::ALL {
            for entry in menu_for(role) {
                if let Some(permission) = entry.permission() {
                    assert!(role.allows(permission), "{role} -> {}", entry.label());
                }
            }
        }
    }

    #[test]
    fn only_admins_manage_users() {
        assert!(Role::Administrador.allows(Permission::ManageUsers));
        assert!(!Role::Asistente.allows(Permission::ManageUsers));
        assert!(!Role::Cliente.allows(Permission::ManageUsers));
        assert!(!Role::Cliente.allows(Permission::ManageRentals));
        assert!(Role::Cliente.allows(Permission::BrowseAvailableVehicles));
    }
}
