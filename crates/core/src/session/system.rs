//! Logged-in sessions over the entity services.
//!
//! [`RentalSystem`] is the single entry point for frontends. Every operation
//! takes the caller's [`Session`], checks the role's [`Permission`] and
//! appends the outcome to the access log.

use chrono::Local;
use tracing::{error, info, warn};

use crate::{
    access_log::AccessLog,
    config::AppConfig,
    error::{Error, Result},
    models::{Client, Rental, Role, User, Vehicle},
    services::{
        ClientPatch, ClientService, NewClient, NewRental, NewUser, NewVehicle, RentalService,
        UserPatch, UserService, VehiclePatch, VehicleService,
    },
};

use super::access::{menu_for, MenuEntry, Permission};

/// An authenticated user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    user: User,
}

impl Session {
    /// Account that logged in, as it was at login time.
    pub fn user(&self) -> &User {
        &self.user
    }

    /// Login name.
    pub fn username(&self) -> &str {
        &self.user.username
    }

    /// Access level of the account.
    pub fn role(&self) -> Role {
        self.user.role
    }

    /// Main menu for the session's role.
    pub fn menu(&self) -> &'static [MenuEntry] {
        menu_for(self.user.role)
    }
}

/// Failed-login budget for one run of the frontend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoginAttempts {
    remaining: u32,
}

impl LoginAttempts {
    /// Budget of `max` attempts; at least one is always granted.
    pub fn new(max: u32) -> Self {
        Self {
            remaining: max.max(1),
        }
    }

    /// Attempts left before the frontend gives up.
    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    /// Whether no attempts remain.
    pub fn is_exhausted(&self) -> bool {
        self.remaining == 0
    }

    /// Spend one attempt. Returns `true` while attempts remain.
    pub fn record_failure(&mut self) -> bool {
        self.remaining = self.remaining.saturating_sub(1);
        !self.is_exhausted()
    }
}

/// Services, access log and login policy of one data directory.
#[derive(Debug, Clone)]
pub struct RentalSystem {
    users: UserService,
    clients: ClientService,
    vehicles: VehicleService,
    rentals: RentalService,
    access_log: AccessLog,
    max_login_attempts: u32,
}

impl RentalSystem {
    /// Open the stores described by `config`, seeding the bootstrap
    /// administrator when no users exist.
    pub fn open(config: &AppConfig) -> Result<Self> {
        let paths = config.store_paths();
        let system = Self {
            users: UserService::new(&paths),
            clients: ClientService::new(&paths),
            vehicles: VehicleService::new(&paths),
            rentals: RentalService::new(&paths),
            access_log: AccessLog::new(config.access_log_path()),
            max_login_attempts: config.max_login_attempts,
        };

        let admin = &config.bootstrap_admin;
        if let Some(seeded) = system.users.ensure_admin(&admin.username, &admin.password)? {
            system.access_log.record(&seeded.username, "ACCOUNT SEEDED")?;
        }
        info!(data_dir = %config.data_dir.display(), "Rental system opened");
        Ok(system)
    }

    /// The bitácora every operation appends to.
    pub fn access_log(&self) -> &AccessLog {
        &self.access_log
    }

    /// Fresh failed-login budget from the configuration.
    pub fn login_attempts(&self) -> LoginAttempts {
        LoginAttempts::new(self.max_login_attempts)
    }

    /// Authenticate and start a session.
    pub fn login(&self, username: &str, password: &str) -> Result<Session> {
        match self.users.authenticate(username, password) {
            Ok(user) => {
                self.access_log.record(&user.username, "LOGIN")?;
                info!(username = %user.username, role = %user.role, "Logged in");
                Ok(Session { user })
            }
            Err(Error::InvalidCredentials) => {
                self.access_log.record(username.trim(), "LOGIN FAILED")?;
                warn!(username = %username.trim(), "Login failed");
                Err(Error::InvalidCredentials)
            }
            Err(err) => Err(err),
        }
    }

    /// End a session.
    pub fn logout(&self, session: Session) -> Result<()> {
        self.access_log.record(session.username(), "LOGOUT")?;
        info!(username = %session.username(), "Logged out");
        Ok(())
    }

    // Users

    /// All accounts. Administrators only.
    pub fn list_users(&self, session: &Session) -> Result<Vec<User>> {
        self.authorize(session, Permission::ManageUsers, "list users")?;
        self.users.list()
    }

    /// Register an account.
    pub fn create_user(&self, session: &Session, draft: NewUser) -> Result<User> {
        self.authorize(session, Permission::ManageUsers, "create users")?;
        let user = self.users.create(draft)?;
        self.record(session, format!("CREATE USER {} ({})", user.username, user.id));
        Ok(user)
    }

    /// Edit an account. Administrators cannot deactivate their own.
    pub fn update_user(&self, session: &Session, id: &str, patch: UserPatch) -> Result<User> {
        self.authorize(session, Permission::ManageUsers, "edit users")?;
        if patch.active == Some(false) {
            forbid_self_deactivation(session, id)?;
        }
        let user = self.users.update(id, patch)?;
        self.record(session, format!("UPDATE USER {}", user.id));
        Ok(user)
    }

    /// Deactivate an account.
    pub fn delete_user(&self, session: &Session, id: &str) -> Result<User> {
        self.authorize(session, Permission::ManageUsers, "delete users")?;
        forbid_self_deactivation(session, id)?;
        let user = self.users.delete(id)?;
        self.record(session, format!("DEACTIVATE USER {}", user.id));
        Ok(user)
    }

    // Clients

    /// Every client record.
    pub fn list_clients(&self, session: &Session) -> Result<Vec<Client>> {
        self.authorize(session, Permission::ManageClients, "list clients")?;
        self.clients.list()
    }

    /// Register a client.
    pub fn create_client(&self, session: &Session, draft: NewClient) -> Result<Client> {
        self.authorize(session, Permission::ManageClients, "create clients")?;
        let client = self.clients.create(draft)?;
        self.record(session, format!("CREATE CLIENT {}", client.id));
        Ok(client)
    }

    /// Edit a client record.
    pub fn update_client(&self, session: &Session, id: &str, patch: ClientPatch) -> Result<Client> {
        self.authorize(session, Permission::ManageClients, "edit clients")?;
        let client = self.clients.update(id, patch)?;
        self.record(session, format!("UPDATE CLIENT {}", client.id));
        Ok(client)
    }

    /// Remove a client and deactivate the CLIENTE accounts linked to it.
    pub fn delete_client(&self, session: &Session, id: &str) -> Result<Client> {
        self.authorize(session, Permission::ManageClients, "delete clients")?;
        let client = self.clients.delete(id)?;
        self.record(session, format!("DELETE CLIENT {}", client.id));
        for user in self.users.deactivate_for_client(&client.id)? {
            self.record(session, format!("DEACTIVATE USER {}", user.id));
        }
        Ok(client)
    }

    /// Client record linked to a CLIENTE account.
    pub fn my_profile(&self, session: &Session) -> Result<Client> {
        self.authorize(session, Permission::OwnProfile, "view a client profile")?;
        self.clients.get(own_client_id(session)?)
    }

    /// Edit the client record linked to a CLIENTE account.
    pub fn update_my_profile(&self, session: &Session, patch: ClientPatch) -> Result<Client> {
        self.authorize(session, Permission::OwnProfile, "edit a client profile")?;
        let client = self.clients.update(own_client_id(session)?, patch)?;
        self.record(session, format!("UPDATE PROFILE {}", client.id));
        Ok(client)
    }

    // Vehicles

    /// The whole fleet.
    pub fn list_vehicles(&self, session: &Session) -> Result<Vec<Vehicle>> {
        self.authorize(session, Permission::ManageVehicles, "list the fleet")?;
        self.vehicles.list()
    }

    /// Vehicles that can be booked right now.
    pub fn available_vehicles(&self, session: &Session) -> Result<Vec<Vehicle>> {
        self.authorize(session, Permission::BrowseAvailableVehicles, "browse vehicles")?;
        self.vehicles.available()
    }

    /// Add a vehicle to the fleet.
    pub fn create_vehicle(&self, session: &Session, draft: NewVehicle) -> Result<Vehicle> {
        self.authorize(session, Permission::ManageVehicles, "create vehicles")?;
        let vehicle = self.vehicles.create(draft)?;
        self.record(session, format!("CREATE VEHICLE {} ({})", vehicle.id, vehicle.plate));
        Ok(vehicle)
    }

    /// Edit the descriptive fields of a vehicle.
    pub fn update_vehicle(
        &self,
        session: &Session,
        id: &str,
        patch: VehiclePatch,
    ) -> Result<Vehicle> {
        self.authorize(session, Permission::ManageVehicles, "edit vehicles")?;
        let vehicle = self.vehicles.update(id, patch)?;
        self.record(session, format!("UPDATE VEHICLE {}", vehicle.id));
        Ok(vehicle)
    }

    /// Remove a vehicle that no rental holds.
    pub fn delete_vehicle(&self, session: &Session, id: &str) -> Result<Vehicle> {
        self.authorize(session, Permission::ManageVehicles, "delete vehicles")?;
        let vehicle = self.vehicles.delete(id)?;
        self.record(session, format!("DELETE VEHICLE {} ({})", vehicle.id, vehicle.plate));
        Ok(vehicle)
    }

    // Rentals

    /// All rentals for staff; only the linked client's rentals for CLIENTE.
    pub fn list_rentals(&self, session: &Session) -> Result<Vec<Rental>> {
        if session.role().allows(Permission::ManageRentals) {
            return self.rentals.list();
        }
        self.authorize(session, Permission::OwnRentals, "list rentals")?;
        self.rentals.list_for_client(own_client_id(session)?)
    }

    /// Book a vehicle. CLIENTE sessions may only book for their own record.
    pub fn create_rental(&self, session: &Session, mut draft: NewRental) -> Result<Rental> {
        if !session.role().allows(Permission::ManageRentals) {
            self.authorize(session, Permission::OwnRentals, "book rentals")?;
            let own = own_client_id(session)?;
            let requested = draft.client_id.trim();
            if !requested.is_empty() && requested != own {
                return Err(self.deny(session, "book rentals for another client"));
            }
            draft.client_id = own.to_string();
        }
        let rental = self.rentals.create(draft, Local::now().date_naive())?;
        self.record(
            session,
            format!("CREATE RENTAL {} ({} -> {})", rental.id, rental.vehicle_id, rental.client_id),
        );
        Ok(rental)
    }

    /// Hand the vehicle of a PREPARADO rental to the client.
    pub fn deliver_rental(&self, session: &Session, id: &str) -> Result<Rental> {
        self.authorize(session, Permission::ManageRentals, "deliver rentals")?;
        let rental = self.rentals.deliver(id)?;
        self.record(session, format!("DELIVER RENTAL {}", rental.id));
        Ok(rental)
    }

    /// Receive the vehicle back and close the rental on `end_date`.
    pub fn close_rental(&self, session: &Session, id: &str, end_date: &str) -> Result<Rental> {
        self.authorize(session, Permission::ManageRentals, "close rentals")?;
        let rental = self.rentals.close(id, end_date)?;
        self.record(session, format!("CLOSE RENTAL {}", rental.id));
        Ok(rental)
    }

    fn authorize(&self, session: &Session, permission: Permission, action: &str) -> Result<()> {
        if session.role().allows(permission) {
            Ok(())
        } else {
            Err(self.deny(session, action))
        }
    }

    fn deny(&self, session: &Session, action: &str) -> Error {
        self.record(session, format!("DENIED {action}"));
        warn!(username = %session.username(), role = %session.role(), action, "Forbidden");
        Error::Forbidden {
            role: session.role().to_string(),
            action: action.to_string(),
        }
    }

    // The change is already saved; a log write failure must not undo it.
    fn record(&self, session: &Session, action: String) {
        if let Err(err) = self.access_log.record(session.username(), &action) {
            error!(%err, action = %action, "Failed to append to access log");
        }
    }
}

fn forbid_self_deactivation(session: &Session, id: &str) -> Result<()> {
    if session.user.id == id {
        return Err(Error::InvalidState(
            "you cannot deactivate your own account".to_string(),
        ));
    }
    Ok(())
}

fn own_client_id(session: &Session) -> Result<&str> {
    session.user.client_id.as_deref().ok_or_else(|| {
        Error::InvalidState(format!(
            "account {} is not linked to a client",
            session.user.username
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{IdType, RentalStatus, VehicleStatus};
    use anyhow::Result;
    use tempfile::{tempdir, TempDir};

    fn open() -> Result<(TempDir, RentalSystem)> {
        let dir = tempdir()?;
        let system = RentalSystem::open(&AppConfig::for_data_dir(dir.path()))?;
        Ok((dir, system))
    }

    fn client(national_id: &str) -> NewClient {
        NewClient {
            id_type: IdType::Fisica,
            national_id: national_id.to_string(),
            name: "Ana Perez".to_string(),
            email: "ana@correo.com".to_string(),
            phone: "88887777".to_string(),
            address: "San Jose".to_string(),
            profession: None,
            job_address: None,
        }
    }

    fn vehicle(plate: &str) -> NewVehicle {
        NewVehicle {
            plate: plate.to_string(),
            brand: "Toyota".to_string(),
            model: "Corolla".to_string(),
            year: "2020".to_string(),
            color: "Blanco".to_string(),
            passengers: "5".to_string(),
        }
    }

    fn booking(client_id: &str, vehicle_id: &str) -> NewRental {
        NewRental {
            client_id: client_id.to_string(),
            vehicle_id: vehicle_id.to_string(),
            start_date: "2024-01-01".to_string(),
            expected_return: None,
            cost_per_day: "25000".to_string(),
            card_number: "4111 1111 1111 1111".to_string(),
            card_expiration: "12-2099".to_string(),
        }
    }

    fn account(username: &str, role: Role, client_id: Option<&str>) -> NewUser {
        NewUser {
            username: username.to_string(),
            password: "secreto123".to_string(),
            full_name: "Laura Mora".to_string(),
            email: format!("{username}@rentacar.cr"),
            role: Some(role),
            client_id: client_id.map(str::to_string),
        }
    }

    #[test]
    fn login_and_logout_are_logged() -> Result<()> {
        let (_dir, system) = open()?;

        assert!(matches!(
            system.login("admin", "equivocada"),
            Err(Error::InvalidCredentials)
        ));
        let session = system.login("admin", "admin1234")?;
        assert_eq!(session.role(), Role::Administrador);
        assert_eq!(session.menu()[0], MenuEntry::Users);
        system.logout(session)?;

        let entries = system.access_log().entries()?;
        let actions: Vec<&str> = entries
            .iter()
            .filter_map(|line| line.split_once("] ").map(|(_, rest)| rest))
            .collect();
        assert_eq!(
            actions,
            [
                "admin: ACCOUNT SEEDED",
                "admin: LOGIN FAILED",
                "admin: LOGIN",
                "admin: LOGOUT"
            ]
        );
        Ok(())
    }

    #[test]
    fn login_attempts_run_out() {
        let mut attempts = LoginAttempts::new(3);
        assert!(attempts.record_failure());
        assert!(attempts.record_failure());
        assert!(!attempts.record_failure());
        assert!(attempts.is_exhausted());
        assert_eq!(LoginAttempts::new(0).remaining(), 1);
    }

    #[test]
    fn assistants_cannot_manage_users() -> Result<()> {
        let (_dir, system) = open()?;
        let admin = system.login("admin", "admin1234")?;
        system.create_user(&admin, account("lmora", Role::Asistente, None))?;

        let assistant = system.login("lmora", "secreto123")?;
        assert!(matches!(
            system.list_users(&assistant),
            Err(Error::Forbidden { .. })
        ));
        assert!(system.list_vehicles(&assistant)?.is_empty());
        assert!(system
            .access_log()
            .entries()?
            .iter()
            .any(|line| line.ends_with("lmora: DENIED list users")));
        Ok(())
    }

    #[test]
    fn admin_cannot_deactivate_itself() -> Result<()> {
        let (_dir, system) = open()?;
        let admin = system.login("admin", "admin1234")?;
        let id = admin.user().id.clone();
        assert!(matches!(
            system.delete_user(&admin, &id),
            Err(Error::InvalidState(_))
        ));
        Ok(())
    }

    #[test]
    fn admin_cannot_deactivate_itself_through_edit() -> Result<()> {
        let (_dir, system) = open()?;
        let admin = system.login("admin", "admin1234")?;
        system.create_user(&admin, account("jsolis", Role::Administrador, None))?;
        let id = admin.user().id.clone();

        let deactivate = UserPatch {
            active: Some(false),
            ..UserPatch::default()
        };
        assert!(matches!(
            system.update_user(&admin, &id, deactivate.clone()),
            Err(Error::InvalidState(_))
        ));
        assert!(system.login("admin", "admin1234").is_ok());

        let other = system.login("jsolis", "secreto123")?;
        assert!(!system.update_user(&other, &id, deactivate)?.active);
        assert!(matches!(
            system.login("admin", "admin1234"),
            Err(Error::InvalidCredentials)
        ));
        Ok(())
    }

    #[test]
    fn deleting_a_client_deactivates_its_accounts() -> Result<()> {
        let (_dir, system) = open()?;
        let admin = system.login("admin", "admin1234")?;
        let ana = system.create_client(&admin, client("112340567"))?;
        let linked = system.create_user(&admin, account("ana", Role::Cliente, Some(&ana.id)))?;
        assert!(system.login("ana", "secreto123").is_ok());

        system.delete_client(&admin, &ana.id)?;
        assert!(matches!(
            system.login("ana", "secreto123"),
            Err(Error::InvalidCredentials)
        ));
        assert!(system
            .access_log()
            .entries()?
            .iter()
            .any(|line| line.ends_with(&format!("admin: DEACTIVATE USER {}", linked.id))));

        let reactivate = UserPatch {
            active: Some(true),
            ..UserPatch::default()
        };
        assert!(matches!(
            system.update_user(&admin, &linked.id, reactivate),
            Err(Error::NotFound { kind: "client", .. })
        ));
        Ok(())
    }

    #[test]
    fn clients_only_see_their_own_records() -> Result<()> {
        let (_dir, system) = open()?;
        let admin = system.login("admin", "admin1234")?;
        let ana = system.create_client(&admin, client("112340567"))?;
        let other = system.create_client(&admin, client("212340567"))?;
        system.create_vehicle(&admin, vehicle("ABC123"))?;
        system.create_vehicle(&admin, vehicle("XYZ789"))?;
        system.create_rental(&admin, booking(&other.id, "V2"))?;
        system.create_user(&admin, account("ana", Role::Cliente, Some(&ana.id)))?;

        let session = system.login("ana", "secreto123")?;
        assert_eq!(session.menu(), menu_for(Role::Cliente));
        assert_eq!(system.my_profile(&session)?.id, ana.id);
        assert_eq!(system.available_vehicles(&session)?.len(), 1);
        assert!(matches!(
            system.list_clients(&session),
            Err(Error::Forbidden { .. })
        ));
        assert!(matches!(
            system.create_rental(&session, booking(&other.id, "V1")),
            Err(Error::Forbidden { .. })
        ));

        let rental = system.create_rental(&session, booking("", "V1"))?;
        assert_eq!(rental.client_id, ana.id);
        assert_eq!(rental.status, RentalStatus::Preparado);
        assert_eq!(system.list_rentals(&session)?, vec![rental.clone()]);
        assert!(matches!(
            system.close_rental(&session, &rental.id, "2024-01-02"),
            Err(Error::Forbidden { .. })
        ));

        let updated = system.update_my_profile(
            &session,
            ClientPatch {
                phone: Some("22223333".to_string()),
                ..ClientPatch::default()
            },
        )?;
        assert_eq!(updated.phone, "22223333");
        Ok(())
    }

    #[test]
    fn staff_rental_scenario() -> Result<()> {
        let (_dir, system) = open()?;
        let admin = system.login("admin", "admin1234")?;
        let ana = system.create_client(&admin, client("112340567"))?;
        let v1 = system.create_vehicle(&admin, vehicle("ABC123"))?;
        assert_eq!(v1.status, VehicleStatus::Disponible);

        let rental = system.create_rental(&admin, booking(&ana.id, &v1.id))?;
        assert!(system.available_vehicles(&admin)?.is_empty());
        assert!(matches!(
            system.create_rental(&admin, booking(&ana.id, &v1.id)),
            Err(Error::InvalidState(_))
        ));
        assert!(matches!(
            system.delete_client(&admin, &ana.id),
            Err(Error::ReferentialIntegrity(_))
        ));

        system.deliver_rental(&admin, &rental.id)?;
        let closed = system.close_rental(&admin, &rental.id, "2024-01-05")?;
        assert!(closed.end_date.is_some());
        assert_eq!(system.available_vehicles(&admin)?, vec![v1.clone()]);

        let log = system.access_log().entries()?;
        assert!(log.iter().any(|line| line.ends_with("admin: DELIVER RENTAL R1")));
        assert!(log.iter().any(|line| line.ends_with("admin: CLOSE RENTAL R1")));
        Ok(())
    }
}
