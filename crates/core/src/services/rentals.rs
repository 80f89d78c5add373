//! Rental lifecycle.
//!
//! ```text
//! create ──► PREPARADO ──deliver──► ACTIVO
//!                │                    │
//!                └──────close─────────┴──► DEVUELTO
//! ```
//!
//! Creating a rental flips its vehicle to RENTADO and closing it flips the
//! vehicle back to DISPONIBLE. The rental store is written before the vehicle
//! store; the two writes are not atomic.

use chrono::NaiveDate;
use tracing::{info, warn};

use crate::{
    error::{Error, Result},
    models::{Client, Rental, RentalStatus, Vehicle},
    store::{next_id, JsonStore, StorePaths},
    validation,
};

use super::{ordered, provided};

/// Raw input for [`RentalService::create`].
#[derive(Debug, Clone, Default)]
pub struct NewRental {
    /// Client booking the vehicle.
    pub client_id: String,
    /// Vehicle to book; must be DISPONIBLE.
    pub vehicle_id: String,
    /// `YYYY-MM-DD`.
    pub start_date: String,
    /// Optional planned return, `YYYY-MM-DD`.
    pub expected_return: Option<String>,
    /// Positive whole amount.
    pub cost_per_day: String,
    /// Payment card digits; spaces and dashes are ignored.
    pub card_number: String,
    /// `MM-YYYY`.
    pub card_expiration: String,
}

/// Books vehicles and closes rentals, keeping vehicle status in step.
#[derive(Debug, Clone)]
pub struct RentalService {
    rentals: JsonStore<Rental>,
    vehicles: JsonStore<Vehicle>,
    clients: JsonStore<Client>,
}

impl RentalService {
    /// Service over the rental, vehicle and client stores in `paths`.
    pub fn new(paths: &StorePaths) -> Self {
        Self {
            rentals: paths.rentals(),
            vehicles: paths.vehicles(),
            clients: paths.clients(),
        }
    }

    /// Book an available vehicle for a client.
    ///
    /// `today` decides whether the payment card has expired.
    pub fn create(&self, draft: NewRental, today: NaiveDate) -> Result<Rental> {
        let client_id = draft.client_id.trim();
        if !self.clients.load()?.contains_key(client_id) {
            return Err(Error::not_found("client", client_id));
        }

        let vehicle_id = draft.vehicle_id.trim();
        let mut vehicles = self.vehicles.load()?;
        let vehicle = vehicles
            .get_mut(vehicle_id)
            .ok_or_else(|| Error::not_found("vehicle", vehicle_id))?;
        if !vehicle.is_available() {
            return Err(Error::InvalidState(format!(
                "vehicle {} ({}) is {} and cannot be rented",
                vehicle.id, vehicle.plate, vehicle.status
            )));
        }

        let mut rentals = self.rentals.load()?;
        if let Some(open) = rentals
            .values()
            .find(|rental| rental.vehicle_id == vehicle_id && rental.is_open())
        {
            return Err(Error::InvalidState(format!(
                "vehicle {} is still held by open rental {}",
                vehicle_id, open.id
            )));
        }

        let start_date = validation::parse_date("start date", &draft.start_date)?;
        let expected_return = provided(draft.expected_return.as_deref())
            .map(|value| validation::parse_date("expected return", value))
            .transpose()?;
        if let Some(expected) = expected_return {
            if expected < start_date {
                return Err(Error::validation(
                    "expected return",
                    "must not be before the start date",
                ));
            }
        }
        let cost_per_day = validation::cost_per_day(&draft.cost_per_day)?;
        let card = validation::card_number(&draft.card_number)?;
        let card_expiration = validation::card_expiration(&draft.card_expiration, today)?;

        vehicle.rent()?;
        let rental = Rental {
            id: next_id('R', &rentals),
            client_id: client_id.to_string(),
            vehicle_id: vehicle_id.to_string(),
            start_date,
            end_date: None,
            expected_return,
            cost_per_day,
            pay_card: validation::mask_card(&card),
            card_expiration,
            status: RentalStatus::Preparado,
        };
        rentals.insert(rental.id.clone(), rental.clone());
        self.rentals.save(&rentals)?;
        self.vehicles.save(&vehicles)?;
        info!(
            id = %rental.id,
            client = %rental.client_id,
            vehicle = %rental.vehicle_id,
            "Rental created"
        );
        Ok(rental)
    }

    /// Hand the vehicle over: PREPARADO → ACTIVO.
    pub fn deliver(&self, id: &str) -> Result<Rental> {
        let mut rentals = self.rentals.load()?;
        let rental = rentals
            .get_mut(id)
            .ok_or_else(|| Error::not_found("rental", id))?;
        if rental.status != RentalStatus::Preparado {
            return Err(Error::InvalidState(format!(
                "rental {} is {}, only PREPARADO rentals can be delivered",
                rental.id, rental.status
            )));
        }
        rental.status = RentalStatus::Activo;

        let delivered = rental.clone();
        self.rentals.save(&rentals)?;
        info!(id = %delivered.id, "Rental delivered");
        Ok(delivered)
    }

    /// Close an open rental on `end_date` (`YYYY-MM-DD`) and free its vehicle.
    pub fn close(&self, id: &str, end_date: &str) -> Result<Rental> {
        let mut rentals = self.rentals.load()?;
        let rental = rentals
            .get_mut(id)
            .ok_or_else(|| Error::not_found("rental", id))?;
        if !rental.is_open() {
            return Err(Error::InvalidState(format!(
                "rental {} is already closed",
                rental.id
            )));
        }
        let end_date = validation::parse_date("end date", end_date)?;
        if end_date < rental.start_date {
            return Err(Error::validation(
                "end date",
                format!("must not be before the start date {}", rental.start_date),
            ));
        }

        let mut vehicles = self.vehicles.load()?;
        let vehicle = vehicles
            .get_mut(&rental.vehicle_id)
            .ok_or_else(|| Error::not_found("vehicle", rental.vehicle_id.clone()))?;
        if vehicle.is_available() {
            warn!(
                rental = %rental.id,
                vehicle = %vehicle.id,
                "Closing rental whose vehicle is already DISPONIBLE"
            );
        } else {
            vehicle.release()?;
        }

        rental.end_date = Some(end_date);
        rental.status = RentalStatus::Devuelto;
        let closed = rental.clone();
        self.rentals.save(&rentals)?;
        self.vehicles.save(&vehicles)?;
        info!(id = %closed.id, vehicle = %closed.vehicle_id, "Rental closed");
        Ok(closed)
    }

    /// Every rental.
    pub fn list(&self) -> Result<Vec<Rental>> {
        Ok(ordered(self.rentals.load()?))
    }

    /// Look up one rental.
    pub fn get(&self, id: &str) -> Result<Rental> {
        self.rentals
            .load()?
            .remove(id)
            .ok_or_else(|| Error::not_found("rental", id))
    }

    /// Rentals belonging to one client.
    pub fn list_for_client(&self, client_id: &str) -> Result<Vec<Rental>> {
        Ok(self
            .list()?
            .into_iter()
            .filter(|rental| rental.client_id == client_id)
            .collect())
    }

    /// The open rental holding `vehicle_id`, if any.
    pub fn open_for_vehicle(&self, vehicle_id: &str) -> Result<Option<Rental>> {
        Ok(self
            .rentals
            .load()?
            .into_values()
            .find(|rental| rental.vehicle_id == vehicle_id && rental.is_open()))
    }

    /// Whether the client still holds a vehicle.
    pub fn has_open_for_client(&self, client_id: &str) -> Result<bool> {
        Ok(self
            .rentals
            .load()?
            .values()
            .any(|rental| rental.client_id == client_id && rental.is_open()))
    }
}
