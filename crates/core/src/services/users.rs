//! User accounts and authentication.

use tracing::{info, warn};

use crate::{
    error::{Error, Result},
    models::{Client, Role, User},
    store::{next_id, JsonStore, Records, StorePaths},
    validation,
};

use super::{ordered, provided};

/// Input for [`UserService::create`].
#[derive(Debug, Clone, Default)]
pub struct NewUser {
    /// Login name: at least 3 characters, no spaces.
    pub username: String,
    /// Plain-text password.
    pub password: String,
    /// Display name.
    pub full_name: String,
    /// Contact address.
    pub email: String,
    /// Access level; required.
    pub role: Option<Role>,
    /// Required for `CLIENTE` accounts.
    pub client_id: Option<String>,
}

/// Changes applied by [`UserService::update`]. `None` or blank keeps the current value.
#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    /// New display name.
    pub full_name: Option<String>,
    /// New contact address.
    pub email: Option<String>,
    /// New password. Only an empty string counts as blank.
    pub password: Option<String>,
    /// Reactivate or deactivate the account.
    pub active: Option<bool>,
}

/// CRUD over the user store plus credential checks.
#[derive(Debug, Clone)]
pub struct UserService {
    users: JsonStore<User>,
    clients: JsonStore<Client>,
}

impl UserService {
    /// Service over the user store in `paths`.
    pub fn new(paths: &StorePaths) -> Self {
        Self {
            users: paths.users(),
            clients: paths.clients(),
        }
    }

    /// Register a new account.
    pub fn create(&self, draft: NewUser) -> Result<User> {
        let username = username(&draft.username)?;
        let password = validation::password(&draft.password)?;
        let full_name = validation::person_name("name", &draft.full_name)?;
        let email = validation::email(&draft.email)?;
        let role = draft
            .role
            .ok_or_else(|| Error::validation("role", "a role is required"))?;

        let client_id = match role {
            Role::Cliente => {
                let client_id = provided(draft.client_id.as_deref())
                    .ok_or_else(|| {
                        Error::validation("client", "CLIENTE accounts need a client id")
                    })?
                    .to_string();
                if !self.clients.load()?.contains_key(&client_id) {
                    return Err(Error::not_found("client", client_id));
                }
                Some(client_id)
            }
            Role::Administrador | Role::Asistente => None,
        };

        let mut users = self.users.load()?;
        if find_username(users.values(), &username).is_some() {
            return Err(Error::AlreadyExists {
                kind: "user",
                key: "username",
                value: username,
            });
        }

        let user = User {
            id: next_id('U', &users),
            username,
            password,
            role,
            full_name,
            email,
            client_id,
            active: true,
        };
        users.insert(user.id.clone(), user.clone());
        self.users.save(&users)?;
        info!(id = %user.id, username = %user.username, role = %user.role, "User created");
        Ok(user)
    }

    /// All accounts, active or not.
    pub fn list(&self) -> Result<Vec<User>> {
        Ok(ordered(self.users.load()?))
    }

    /// Look up one account.
    pub fn get(&self, id: &str) -> Result<User> {
        self.users
            .load()?
            .remove(id)
            .ok_or_else(|| Error::not_found("user", id))
    }

    /// Edit name, email, password or active flag.
    ///
    /// A CLIENTE account can only be reactivated while its client record exists.
    pub fn update(&self, id: &str, patch: UserPatch) -> Result<User> {
        let mut users = self.users.load()?;
        let last_admin = is_last_active_admin(&users, id);
        let user = users
            .get_mut(id)
            .ok_or_else(|| Error::not_found("user", id))?;

        if patch.active == Some(true) && !user.active {
            if let Some(client_id) = user.client_id.as_deref() {
                if !self.clients.load()?.contains_key(client_id) {
                    return Err(Error::not_found("client", client_id));
                }
            }
        }

        if let Some(name) = provided(patch.full_name.as_deref()) {
            user.full_name = validation::person_name("name", name)?;
        }
        if let Some(email) = provided(patch.email.as_deref()) {
            user.email = validation::email(email)?;
        }
        if let Some(password) = patch.password.as_deref().filter(|value| !value.is_empty()) {
            user.password = validation::password(password)?;
        }
        if let Some(active) = patch.active {
            if !active && last_admin {
                return Err(Error::InvalidState(
                    "cannot deactivate the last active administrator".to_string(),
                ));
            }
            user.active = active;
        }

        let updated = user.clone();
        self.users.save(&users)?;
        info!(id = %updated.id, "User updated");
        Ok(updated)
    }

    /// Deactivate an account. Users are never removed from the store.
    pub fn delete(&self, id: &str) -> Result<User> {
        self.update(
            id,
            UserPatch {
                active: Some(false),
                ..UserPatch::default()
            },
        )
    }

    /// Deactivate every active account linked to `client_id`.
    pub fn deactivate_for_client(&self, client_id: &str) -> Result<Vec<User>> {
        let mut users = self.users.load()?;
        let deactivated: Vec<User> = users
            .values_mut()
            .filter(|user| user.active && user.client_id.as_deref() == Some(client_id))
            .map(|user| {
                user.active = false;
                user.clone()
            })
            .collect();
        if !deactivated.is_empty() {
            self.users.save(&users)?;
            info!(client_id, count = deactivated.len(), "Linked accounts deactivated");
        }
        Ok(deactivated)
    }

    /// Check credentials, returning the matching active user.
    pub fn authenticate(&self, username: &str, password: &str) -> Result<User> {
        let users = self.users.load()?;
        match find_username(users.values(), username.trim()) {
            Some(user) if user.active && user.password == password => Ok(user.clone()),
            Some(user) if !user.active => {
                warn!(username = %user.username, "Login attempt on deactivated account");
                Err(Error::InvalidCredentials)
            }
            _ => Err(Error::InvalidCredentials),
        }
    }

    /// Seed an administrator when the store has no users at all.
    pub fn ensure_admin(&self, username: &str, password: &str) -> Result<Option<User>> {
        if !self.users.load()?.is_empty() {
            return Ok(None);
        }
        let admin = self.create(NewUser {
            username: username.to_string(),
            password: password.to_string(),
            full_name: "Administrador".to_string(),
            email: format!("{}@rentacar.local", username.trim()),
            role: Some(Role::Administrador),
            client_id: None,
        })?;
        warn!(username = %admin.username, "Seeded default administrator; change its password");
        Ok(Some(admin))
    }
}

fn username(input: &str) -> Result<String> {
    let value = validation::non_empty("username", input)?;
    if value.chars().count() < 3 || value.chars().any(char::is_whitespace) {
        return Err(Error::validation(
            "username",
            "needs at least 3 characters and no spaces",
        ));
    }
    Ok(value)
}

fn find_username<'a>(
    mut users: impl Iterator<Item = &'a User>,
    username: &str,
) -> Option<&'a User> {
    users.find(|user| user.username.eq_ignore_ascii_case(username))
}

fn is_last_active_admin(users: &Records<User>, id: &str) -> bool {
    let admins: Vec<&User> = users
        .values()
        .filter(|user| user.active && user.role == Role::Administrador)
        .collect();
    admins.len() == 1 && admins[0].id == id
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::IdType,
        services::{ClientService, NewClient},
    };
    use anyhow::Result;
    use tempfile::tempdir;

    fn staff(username: &str, role: Role) -> NewUser {
        NewUser {
            username: username.to_string(),
            password: "secreto123".to_string(),
            full_name: "Laura Mora".to_string(),
            email: format!("{username}@rentacar.cr"),
            role: Some(role),
            client_id: None,
        }
    }

    #[test]
    fn authenticate_checks_username_and_password() -> Result<()> {
        let dir = tempdir()?;
        let service = UserService::new(&StorePaths::new(dir.path()));
        let created = service.create(staff("lmora", Role::Asistente))?;

        let user = service.authenticate("lmora", "secreto123")?;
        assert_eq!(user, created);
        assert_eq!(service.authenticate("LMORA", "secreto123")?.id, created.id);

        assert!(matches!(
            service.authenticate("lmora", "incorrecto"),
            Err(Error::InvalidCredentials)
        ));
        assert!(matches!(
            service.authenticate("nadie", "secreto123"),
            Err(Error::InvalidCredentials)
        ));
        Ok(())
    }

    #[test]
    fn usernames_are_unique() -> Result<()> {
        let dir = tempdir()?;
        let service = UserService::new(&StorePaths::new(dir.path()));
        service.create(staff("lmora", Role::Asistente))?;
        let err = service
            .create(staff("LMora", Role::Administrador))
            .expect_err("duplicate username");
        assert!(matches!(err, Error::AlreadyExists { key: "username", .. }));
        Ok(())
    }

    #[test]
    fn client_accounts_need_an_existing_client() -> Result<()> {
        let dir = tempdir()?;
        let service = UserService::new(&StorePaths::new(dir.path()));
        let mut draft = staff("cliente1", Role::Cliente);
        assert!(matches!(
            service.create(draft.clone()),
            Err(Error::Validation { field: "client", .. })
        ));
        draft.client_id = Some("C9".to_string());
        assert!(matches!(service.create(draft), Err(Error::NotFound { .. })));
        Ok(())
    }

    #[test]
    fn delete_deactivates_and_blocks_login() -> Result<()> {
        let dir = tempdir()?;
        let service = UserService::new(&StorePaths::new(dir.path()));
        service.create(staff("admin", Role::Administrador))?;
        let assistant = service.create(staff("lmora", Role::Asistente))?;

        let removed = service.delete(&assistant.id)?;
        assert!(!removed.active);
        assert_eq!(service.list()?.len(), 2);
        assert!(matches!(
            service.authenticate("lmora", "secreto123"),
            Err(Error::InvalidCredentials)
        ));

        service.update(
            &assistant.id,
            UserPatch {
                active: Some(true),
                ..UserPatch::default()
            },
        )?;
        assert!(service.authenticate("lmora", "secreto123").is_ok());
        Ok(())
    }

    #[test]
    fn usernames_need_three_characters() -> Result<()> {
        let dir = tempdir()?;
        let service = UserService::new(&StorePaths::new(dir.path()));
        assert!(matches!(
            service.create(staff("ñí", Role::Asistente)),
            Err(Error::Validation { field: "username", .. })
        ));
        assert!(matches!(
            service.create(staff("la mora", Role::Asistente)),
            Err(Error::Validation { field: "username", .. })
        ));
        assert_eq!(service.create(staff("ñoa", Role::Asistente))?.username, "ñoa");
        Ok(())
    }

    #[test]
    fn client_accounts_follow_their_client() -> Result<()> {
        let dir = tempdir()?;
        let paths = StorePaths::new(dir.path());
        let service = UserService::new(&paths);
        let clients = ClientService::new(&paths);
        let client = clients.create(NewClient {
            id_type: IdType::Fisica,
            national_id: "112340567".to_string(),
            name: "Ana Perez".to_string(),
            email: "ana@correo.com".to_string(),
            phone: "88887777".to_string(),
            address: "San Jose".to_string(),
            profession: None,
            job_address: None,
        })?;
        let mut draft = staff("ana", Role::Cliente);
        draft.client_id = Some(client.id.clone());
        let linked = service.create(draft)?;
        let staff_member = service.create(staff("lmora", Role::Asistente))?;

        let deactivated = service.deactivate_for_client(&client.id)?;
        assert_eq!(deactivated.len(), 1);
        assert_eq!(deactivated[0].id, linked.id);
        assert!(service.get(&staff_member.id)?.active);
        assert!(service.deactivate_for_client(&client.id)?.is_empty());

        clients.delete(&client.id)?;
        let reactivate = UserPatch {
            active: Some(true),
            ..UserPatch::default()
        };
        assert!(matches!(
            service.update(&linked.id, reactivate),
            Err(Error::NotFound { kind: "client", .. })
        ));
        assert!(!service.get(&linked.id)?.active);
        Ok(())
    }

    #[test]
    fn last_admin_cannot_be_deactivated() -> Result<()> {
        let dir = tempdir()?;
        let service = UserService::new(&StorePaths::new(dir.path()));
        let admin = service.create(staff("admin", Role::Administrador))?;
        assert!(matches!(
            service.delete(&admin.id),
            Err(Error::InvalidState(_))
        ));
        Ok(())
    }

    #[test]
    fn update_validates_and_keeps_blank_fields() -> Result<()> {
        let dir = tempdir()?;
        let service = UserService::new(&StorePaths::new(dir.path()));
        let user = service.create(staff("lmora", Role::Asistente))?;

        let updated = service.update(
            &user.id,
            UserPatch {
                full_name: Some("  ".to_string()),
                email: Some("laura@correo.com".to_string()),
                ..UserPatch::default()
            },
        )?;
        assert_eq!(updated.full_name, "Laura Mora");
        assert_eq!(updated.email, "laura@correo.com");

        let err = service.update(
            &user.id,
            UserPatch {
                password: Some("corta".to_string()),
                ..UserPatch::default()
            },
        );
        assert!(matches!(err, Err(Error::Validation { field: "password", .. })));
        assert_eq!(service.get(&user.id)?.password, "secreto123");
        Ok(())
    }

    #[test]
    fn ensure_admin_only_seeds_empty_store() -> Result<()> {
        let dir = tempdir()?;
        let service = UserService::new(&StorePaths::new(dir.path()));
        let seeded = service.ensure_admin("admin", "admin1234")?;
        assert!(seeded.is_some());
        assert!(service.ensure_admin("admin", "admin1234")?.is_none());
        assert_eq!(service.authenticate("admin", "admin1234")?.role, Role::Administrador);
        Ok(())
    }
}
