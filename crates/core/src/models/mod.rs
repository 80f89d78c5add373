//! Shared domain models.
//!
//! These records are persisted verbatim in the JSON stores, so field names
//! and enum spellings are part of the on-disk format.

use std::{fmt, str::FromStr};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Access level of a user account.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    /// Full access, including user management.
    Administrador,
    /// Front-desk staff: vehicles, clients and rentals.
    Asistente,
    /// A client using the self-service menu.
    Cliente,
}

impl Role {
    /// All roles in menu order.
    pub const ALL: [Role; 3] = [Role::Administrador, Role::Asistente, Role::Cliente];

    /// Stored spelling of the role.
    pub fn label(&self) -> &'static str {
        match self {
            Role::Administrador => "ADMINISTRADOR",
            Role::Asistente => "ASISTENTE",
            Role::Cliente => "CLIENTE",
        }
    }

    /// Whether the role belongs to rental staff rather than a client.
    pub fn is_staff(&self) -> bool {
        !matches!(self, Role::Cliente)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(input: &str) -> Result<Self> {
        match input.trim().to_lowercase().as_str() {
            "1" | "administrador" | "admin" => Ok(Role::Administrador),
            "2" | "asistente" => Ok(Role::Asistente),
            "3" | "cliente" => Ok(Role::Cliente),
            _ => Err(Error::validation(
                "role",
                "expected administrador, asistente or cliente",
            )),
        }
    }
}

/// Kind of identification document a client presents.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum IdType {
    /// National ID card for citizens.
    Fisica,
    /// Company registration number.
    Juridica,
    /// Residence permit for foreigners.
    Dimex,
    /// Passport.
    Pasaporte,
}

impl IdType {
    /// All document types in menu order.
    pub const ALL: [IdType; 4] = [
        IdType::Fisica,
        IdType::Juridica,
        IdType::Dimex,
        IdType::Pasaporte,
    ];

    /// Stored spelling of the document type.
    pub fn label(&self) -> &'static str {
        match self {
            IdType::Fisica => "FISICA",
            IdType::Juridica => "JURIDICA",
            IdType::Dimex => "DIMEX",
            IdType::Pasaporte => "PASAPORTE",
        }
    }

    /// Description of the expected number format.
    pub fn format_hint(&self) -> &'static str {
        match self {
            IdType::Fisica => "FISICA ids have 9 digits starting with 1-7",
            IdType::Juridica => "JURIDICA ids have 10 digits",
            IdType::Dimex => "DIMEX ids have 11 or 12 digits",
            IdType::Pasaporte => "passports have 6 to 12 letters or digits",
        }
    }
}

impl fmt::Display for IdType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for IdType {
    type Err = Error;

    fn from_str(input: &str) -> Result<Self> {
        match input.trim().to_lowercase().as_str() {
            "1" | "fisica" | "física" => Ok(IdType::Fisica),
            "2" | "juridica" | "jurídica" => Ok(IdType::Juridica),
            "3" | "dimex" => Ok(IdType::Dimex),
            "4" | "pasaporte" => Ok(IdType::Pasaporte),
            _ => Err(Error::validation(
                "id type",
                "expected fisica, juridica, dimex or pasaporte",
            )),
        }
    }
}

/// Account able to log into the system.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    /// Store key (`U1`, `U2`, ...).
    pub id: String,
    /// Unique login name.
    pub username: String,
    /// Plain-text password, as kept by the existing data files.
    pub password: String,
    /// Access level.
    pub role: Role,
    /// Display name.
    pub full_name: String,
    /// Contact address.
    pub email: String,
    /// Linked client record for `CLIENTE` accounts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    /// Deactivated accounts are kept but cannot log in.
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

/// Rental customer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Client {
    /// Store key (`C1`, `C2`, ...).
    pub id: String,
    /// Document presented at registration.
    pub id_type: IdType,
    /// Identification number matching [`Client::id_type`].
    pub national_id: String,
    /// Full name.
    pub name: String,
    /// Contact address.
    pub email: String,
    /// Eight-digit phone number.
    pub phone: String,
    /// Home address.
    pub address: String,
    /// Occupation, if given.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profession: Option<String>,
    /// Workplace address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_address: Option<String>,
}

/// Availability of a vehicle.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum VehicleStatus {
    /// Free to be rented.
    #[default]
    Disponible,
    /// Assigned to an open rental.
    Rentado,
}

impl VehicleStatus {
    /// Stored spelling of the status.
    pub fn label(&self) -> &'static str {
        match self {
            VehicleStatus::Disponible => "DISPONIBLE",
            VehicleStatus::Rentado => "RENTADO",
        }
    }
}

impl fmt::Display for VehicleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Fleet vehicle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Vehicle {
    /// Store key (`V1`, `V2`, ...).
    pub id: String,
    /// Unique licence plate.
    pub plate: String,
    /// Manufacturer.
    pub brand: String,
    /// Model name.
    pub model: String,
    /// Model year.
    pub year: i32,
    /// Body colour.
    pub color: String,
    /// Seating capacity.
    pub passengers: u8,
    /// Changed only through [`Vehicle::rent`] and [`Vehicle::release`].
    #[serde(default)]
    pub status: VehicleStatus,
}

impl Vehicle {
    /// Whether the vehicle can be assigned to a new rental.
    pub fn is_available(&self) -> bool {
        self.status == VehicleStatus::Disponible
    }

    /// DISPONIBLE → RENTADO.
    pub fn rent(&mut self) -> Result<()> {
        match self.status {
            VehicleStatus::Disponible => {
                self.status = VehicleStatus::Rentado;
                Ok(())
            }
            VehicleStatus::Rentado => Err(Error::InvalidState(format!(
                "vehicle {} ({}) is already RENTADO",
                self.id, self.plate
            ))),
        }
    }

    /// RENTADO → DISPONIBLE.
    pub fn release(&mut self) -> Result<()> {
        match self.status {
            VehicleStatus::Rentado => {
                self.status = VehicleStatus::Disponible;
                Ok(())
            }
            VehicleStatus::Disponible => Err(Error::InvalidState(format!(
                "vehicle {} ({}) is not rented",
                self.id, self.plate
            ))),
        }
    }

    /// Label used in lists, e.g. `ABC123 Toyota Corolla (2020)`.
    pub fn display_name(&self) -> String {
        format!("{} {} {} ({})", self.plate, self.brand, self.model, self.year)
    }
}

/// Lifecycle of a rental.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum RentalStatus {
    /// Booked; the vehicle is reserved but not handed over yet.
    Preparado,
    /// The client has the vehicle.
    Activo,
    /// Closed; the vehicle is back.
    Devuelto,
}

impl RentalStatus {
    /// Stored spelling of the status.
    pub fn label(&self) -> &'static str {
        match self {
            RentalStatus::Preparado => "PREPARADO",
            RentalStatus::Activo => "ACTIVO",
            RentalStatus::Devuelto => "DEVUELTO",
        }
    }

    /// Open rentals keep their vehicle RENTADO.
    pub fn is_open(&self) -> bool {
        !matches!(self, RentalStatus::Devuelto)
    }
}

impl fmt::Display for RentalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Rental contract between a client and a vehicle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Rental {
    /// Store key (`R1`, `R2`, ...).
    pub id: String,
    /// Client the vehicle is rented to.
    pub client_id: String,
    /// Rented vehicle.
    pub vehicle_id: String,
    /// Pick-up date.
    pub start_date: NaiveDate,
    /// Actual return date; `None` while the rental is open.
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    /// Planned return date agreed at booking time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_return: Option<NaiveDate>,
    /// Daily rate.
    pub cost_per_day: u32,
    /// Masked card number; only the last four digits are kept.
    pub pay_card: String,
    /// Card expiration as `MM-YYYY`.
    pub card_expiration: String,
    /// Lifecycle stage.
    pub status: RentalStatus,
}

impl Rental {
    /// Whether the rental still holds its vehicle.
    pub fn is_open(&self) -> bool {
        self.status.is_open()
    }

    /// Days charged between the start date and `until`, counting at least one.
    pub fn billed_days(&self, until: NaiveDate) -> i64 {
        (until - self.start_date).num_days().max(1)
    }

    /// Amount due for a closed rental.
    pub fn total_cost(&self) -> Option<u64> {
        let end = self.end_date?;
        let days = u64::try_from(self.billed_days(end)).ok()?;
        Some(days * u64::from(self.cost_per_day))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vehicle() -> Vehicle {
        Vehicle {
            id: "V1".to_string(),
            plate: "ABC123".to_string(),
            brand: "Toyota".to_string(),
            model: "Corolla".to_string(),
            year: 2020,
            color: "Blanco".to_string(),
            passengers: 5,
            status: VehicleStatus::default(),
        }
    }

    #[test]
    fn vehicle_state_machine() {
        let mut car = vehicle();
        assert!(car.is_available());
        car.rent().unwrap();
        assert_eq!(car.status, VehicleStatus::Rentado);
        assert!(matches!(car.rent(), Err(Error::InvalidState(_))));
        car.release().unwrap();
        assert_eq!(car.status, VehicleStatus::Disponible);
        assert!(matches!(car.release(), Err(Error::InvalidState(_))));
    }

    #[test]
    fn enums_use_stored_spelling() {
        let json = serde_json::to_string(&vehicle()).unwrap();
        assert!(json.contains("\"status\":\"DISPONIBLE\""));
        assert_eq!(
            serde_json::to_string(&RentalStatus::Devuelto).unwrap(),
            "\"DEVUELTO\""
        );
        assert_eq!(serde_json::to_string(&Role::Asistente).unwrap(), "\"ASISTENTE\"");
        let parsed: IdType = serde_json::from_str("\"DIMEX\"").unwrap();
        assert_eq!(parsed, IdType::Dimex);
    }

    #[test]
    fn roles_and_id_types_parse_from_menu_input() {
        assert_eq!("1".parse::<IdType>().unwrap(), IdType::Fisica);
        assert_eq!("Pasaporte".parse::<IdType>().unwrap(), IdType::Pasaporte);
        assert!("licencia".parse::<IdType>().is_err());
        assert_eq!("admin".parse::<Role>().unwrap(), Role::Administrador);
        assert!("root".parse::<Role>().is_err());
        assert!(Role::Asistente.is_staff());
        assert!(!Role::Cliente.is_staff());
    }

    #[test]
    fn closed_rental_cost_counts_at_least_one_day() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let mut rental = Rental {
            id: "R1".to_string(),
            client_id: "C1".to_string(),
            vehicle_id: "V1".to_string(),
            start_date: start,
            end_date: None,
            expected_return: None,
            cost_per_day: 30_000,
            pay_card: "************1111".to_string(),
            card_expiration: "12-2030".to_string(),
            status: RentalStatus::Preparado,
        };
        assert_eq!(rental.total_cost(), None);

        rental.end_date = Some(start);
        assert_eq!(rental.total_cost(), Some(30_000));

        rental.end_date = NaiveDate::from_ymd_opt(2024, 1, 4);
        assert_eq!(rental.total_cost(), Some(90_000));
    }
}
