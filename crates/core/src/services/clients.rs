//! Client records.

use tracing::info;

use crate::{
    error::{Error, Result},
    models::{Client, IdType, Rental},
    store::{next_id, JsonStore, StorePaths},
    validation,
};

use super::{ordered, provided};

/// Input for [`ClientService::create`].
#[derive(Debug, Clone)]
pub struct NewClient {
    /// Document type; decides the national id format.
    pub id_type: IdType,
    /// Identification number.
    pub national_id: String,
    /// Full name.
    pub name: String,
    /// Contact address.
    pub email: String,
    /// Eight-digit phone number.
    pub phone: String,
    /// Home address.
    pub address: String,
    /// Optional occupation.
    pub profession: Option<String>,
    /// Optional workplace address.
    pub job_address: Option<String>,
}

/// Changes applied by [`ClientService::update`]. `None` or blank keeps the current value.
#[derive(Debug, Clone, Default)]
pub struct ClientPatch {
    /// Validated against the client's existing id type.
    pub national_id: Option<String>,
    /// New full name.
    pub name: Option<String>,
    /// New contact address.
    pub email: Option<String>,
    /// New phone number.
    pub phone: Option<String>,
    /// New home address.
    pub address: Option<String>,
    /// New occupation.
    pub profession: Option<String>,
    /// New workplace address.
    pub job_address: Option<String>,
}

/// CRUD over the client store.
#[derive(Debug, Clone)]
pub struct ClientService {
    clients: JsonStore<Client>,
    rentals: JsonStore<Rental>,
}

impl ClientService {
    /// Service over the client store in `paths`.
    pub fn new(paths: &StorePaths) -> Self {
        Self {
            clients: paths.clients(),
            rentals: paths.rentals(),
        }
    }

    /// Register a client after validating every field.
    pub fn create(&self, draft: NewClient) -> Result<Client> {
        let national_id = validation::national_id(draft.id_type, &draft.national_id)?;
        let name = validation::person_name("name", &draft.name)?;
        let email = validation::email(&draft.email)?;
        let phone = validation::phone(&draft.phone)?;
        let address = validation::non_empty("address", &draft.address)?;
        let profession = provided(draft.profession.as_deref())
            .map(|value| validation::word("profession", value))
            .transpose()?;
        let job_address = provided(draft.job_address.as_deref()).map(str::to_string);

        let mut clients = self.clients.load()?;
        if clients
            .values()
            .any(|client| client.national_id == national_id)
        {
            return Err(Error::AlreadyExists {
                kind: "client",
                key: "national id",
                value: national_id,
            });
        }

        let client = Client {
            id: next_id('C', &clients),
            id_type: draft.id_type,
            national_id,
            name,
            email,
            phone,
            address,
            profession,
            job_address,
        };
        clients.insert(client.id.clone(), client.clone());
        self.clients.save(&clients)?;
        info!(id = %client.id, id_type = %client.id_type, "Client created");
        Ok(client)
    }

    /// Every client.
    pub fn list(&self) -> Result<Vec<Client>> {
        Ok(ordered(self.clients.load()?))
    }

    /// Look up one client.
    pub fn get(&self, id: &str) -> Result<Client> {
        self.clients
            .load()?
            .remove(id)
            .ok_or_else(|| Error::not_found("client", id))
    }

    /// Find a client by identification number.
    pub fn find_by_national_id(&self, national_id: &str) -> Result<Option<Client>> {
        let national_id = national_id.trim();
        Ok(self
            .clients
            .load()?
            .into_values()
            .find(|client| client.national_id == national_id))
    }

    /// Edit identification and contact details, validating every changed field.
    pub fn update(&self, id: &str, patch: ClientPatch) -> Result<Client> {
        let mut clients = self.clients.load()?;
        let id_type = clients
            .get(id)
            .map(|client| client.id_type)
            .ok_or_else(|| Error::not_found("client", id))?;
        let national_id = provided(patch.national_id.as_deref())
            .map(|value| validation::national_id(id_type, value))
            .transpose()?;
        if let Some(national_id) = national_id.as_deref() {
            if clients
                .values()
                .any(|other| other.id != id && other.national_id == national_id)
            {
                return Err(Error::AlreadyExists {
                    kind: "client",
                    key: "national id",
                    value: national_id.to_string(),
                });
            }
        }

        let client = clients
            .get_mut(id)
            .ok_or_else(|| Error::not_found("client", id))?;

        if let Some(national_id) = national_id {
            client.national_id = national_id;
        }
        if let Some(name) = provided(patch.name.as_deref()) {
            client.name = validation::person_name("name", name)?;
        }
        if let Some(email) = provided(patch.email.as_deref()) {
            client.email = validation::email(email)?;
        }
        if let Some(phone) = provided(patch.phone.as_deref()) {
            client.phone = validation::phone(phone)?;
        }
        if let Some(address) = provided(patch.address.as_deref()) {
            client.address = address.to_string();
        }
        if let Some(profession) = provided(patch.profession.as_deref()) {
            client.profession = Some(validation::word("profession", profession)?);
        }
        if let Some(job_address) = provided(patch.job_address.as_deref()) {
            client.job_address = Some(job_address.to_string());
        }

        let updated = client.clone();
        self.clients.save(&clients)?;
        info!(id = %updated.id, "Client updated");
        Ok(updated)
    }

    /// Remove a client that has no open rental.
    pub fn delete(&self, id: &str) -> Result<Client> {
        let mut clients = self.clients.load()?;
        if !clients.contains_key(id) {
            return Err(Error::not_found("client", id));
        }
        let open = self
            .rentals
            .load()?
            .into_values()
            .filter(|rental| rental.client_id == id && rental.is_open())
            .count();
        if open > 0 {
            return Err(Error::ReferentialIntegrity(format!(
                "client {id} has {open} open rental(s)"
            )));
        }

        let removed = clients
            .remove(id)
            .ok_or_else(|| Error::not_found("client", id))?;
        self.clients.save(&clients)?;
        info!(id = %removed.id, "Client deleted");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{models::RentalStatus, store::Records};
    use anyhow::Result;
    use chrono::NaiveDate;
    use tempfile::tempdir;

    fn sample_client() -> NewClient {
        NewClient {
            id_type: IdType::Fisica,
            national_id: "112340567".to_string(),
            name: "Ana Perez".to_string(),
            email: "ana@correo.com".to_string(),
            phone: "88887777".to_string(),
            address: "San Jose, Barrio Escalante".to_string(),
            profession: Some("Ingeniera".to_string()),
            job_address: None,
        }
    }

    #[test]
    fn create_validates_national_id_and_email() -> Result<()> {
        let dir = tempdir()?;
        let service = ClientService::new(&StorePaths::new(dir.path()));

        let mut draft = sample_client();
        draft.national_id = "912340567".to_string();
        assert!(matches!(
            service.create(draft),
            Err(Error::Validation { field: "national id", .. })
        ));

        let mut draft = sample_client();
        draft.email = "ana.correo.com".to_string();
        assert!(matches!(
            service.create(draft),
            Err(Error::Validation { field: "email", .. })
        ));

        let client = service.create(sample_client())?;
        assert_eq!(client.id, "C1");
        assert_eq!(service.get("C1")?, client);
        Ok(())
    }

    #[test]
    fn national_ids_are_unique() -> Result<()> {
        let dir = tempdir()?;
        let service = ClientService::new(&StorePaths::new(dir.path()));
        service.create(sample_client())?;
        assert!(matches!(
            service.create(sample_client()),
            Err(Error::AlreadyExists { .. })
        ));
        assert!(service.find_by_national_id("112340567")?.is_some());
        Ok(())
    }

    #[test]
    fn update_rejects_bad_email_without_saving() -> Result<()> {
        let dir = tempdir()?;
        let service = ClientService::new(&StorePaths::new(dir.path()));
        let client = service.create(sample_client())?;

        let result = service.update(
            &client.id,
            ClientPatch {
                phone: Some("22223333".to_string()),
                email: Some("not-an-email".to_string()),
                ..ClientPatch::default()
            },
        );
        assert!(matches!(result, Err(Error::Validation { field: "email", .. })));
        assert_eq!(service.get(&client.id)?.phone, "88887777");

        let updated = service.update(
            &client.id,
            ClientPatch {
                phone: Some("22223333".to_string()),
                ..ClientPatch::default()
            },
        )?;
        assert_eq!(updated.phone, "22223333");
        assert_eq!(updated.email, "ana@correo.com");

        let result = service.update(
            &client.id,
            ClientPatch {
                national_id: Some("1234".to_string()),
                ..ClientPatch::default()
            },
        );
        assert!(matches!(
            result,
            Err(Error::Validation { field: "national id", .. })
        ));
        Ok(())
    }

    #[test]
    fn delete_is_blocked_by_open_rentals() -> Result<()> {
        let dir = tempdir()?;
        let paths = StorePaths::new(dir.path());
        let service = ClientService::new(&paths);
        let client = service.create(sample_client())?;

        let mut rentals = Records::new();
        let mut rental = Rental {
            id: "R1".to_string(),
            client_id: client.id.clone(),
            vehicle_id: "V1".to_string(),
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).expect("valid date"),
            end_date: None,
            expected_return: None,
            cost_per_day: 25_000,
            pay_card: "************1111".to_string(),
            card_expiration: "12-2030".to_string(),
            status: RentalStatus::Activo,
        };
        rentals.insert(rental.id.clone(), rental.clone());
        paths.rentals().save(&rentals)?;

        assert!(matches!(
            service.delete(&client.id),
            Err(Error::ReferentialIntegrity(_))
        ));

        rental.status = RentalStatus::Devuelto;
        rental.end_date = NaiveDate::from_ymd_opt(2024, 1, 3);
        rentals.insert(rental.id.clone(), rental);
        paths.rentals().save(&rentals)?;

        service.delete(&client.id)?;
        assert!(matches!(
            service.get(&client.id),
            Err(Error::NotFound { .. })
        ));
        assert!(matches!(
            service.delete(&client.id),
            Err(Error::NotFound { .. })
        ));
        Ok(())
    }
}
