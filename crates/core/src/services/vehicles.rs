//! Fleet management.
//!
//! Status changes are not exposed here: a vehicle only becomes RENTADO or
//! DISPONIBLE through [`super::RentalService`].

use chrono::Local;
use tracing::info;

use crate::{
    error::{Error, Result},
    models::{Rental, Vehicle, VehicleStatus},
    store::{next_id, JsonStore, StorePaths},
    validation,
};

use super::{ordered, provided};

/// Raw input for [`VehicleService::create`].
#[derive(Debug, Clone, Default)]
pub struct NewVehicle {
    /// Licence plate; stored uppercase.
    pub plate: String,
    /// Manufacturer.
    pub brand: String,
    /// Model name.
    pub model: String,
    /// Model year.
    pub year: String,
    /// Body colour.
    pub color: String,
    /// Seating capacity.
    pub passengers: String,
}

/// Changes applied by [`VehicleService::update`]. `None` or blank keeps the current value.
#[derive(Debug, Clone, Default)]
pub struct VehiclePatch {
    /// New manufacturer.
    pub brand: Option<String>,
    /// New model name.
    pub model: Option<String>,
    /// New model year.
    pub year: Option<String>,
    /// New body colour.
    pub color: Option<String>,
    /// New seating capacity.
    pub passengers: Option<String>,
}

/// CRUD over the vehicle store.
#[derive(Debug, Clone)]
pub struct VehicleService {
    vehicles: JsonStore<Vehicle>,
    rentals: JsonStore<Rental>,
}

impl VehicleService {
    /// Service over the vehicle store in `paths`.
    pub fn new(paths: &StorePaths) -> Self {
        Self {
            vehicles: paths.vehicles(),
            rentals: paths.rentals(),
        }
    }

    /// Register a vehicle. New vehicles start DISPONIBLE.
    pub fn create(&self, draft: NewVehicle) -> Result<Vehicle> {
        let today = Local::now().date_naive();
        let plate = validation::plate(&draft.plate)?;
        let brand = validation::word("brand", &draft.brand)?;
        let model = validation::model(&draft.model)?;
        let year = validation::vehicle_year(&draft.year, today)?;
        let color = validation::word("color", &draft.color)?;
        let passengers = validation::passengers(&draft.passengers)?;

        let mut vehicles = self.vehicles.load()?;
        if vehicles.values().any(|vehicle| vehicle.plate == plate) {
            return Err(Error::AlreadyExists {
                kind: "vehicle",
                key: "plate",
                value: plate,
            });
        }

        let vehicle = Vehicle {
            id: next_id('V', &vehicles),
            plate,
            brand,
            model,
            year,
            color,
            passengers,
            status: VehicleStatus::Disponible,
        };
        vehicles.insert(vehicle.id.clone(), vehicle.clone());
        self.vehicles.save(&vehicles)?;
        info!(id = %vehicle.id, plate = %vehicle.plate, "Vehicle created");
        Ok(vehicle)
    }

    /// Every vehicle.
    pub fn list(&self) -> Result<Vec<Vehicle>> {
        Ok(ordered(self.vehicles.load()?))
    }

    /// Vehicles that can be assigned to a new rental.
    pub fn available(&self) -> Result<Vec<Vehicle>> {
        Ok(self
            .list()?
            .into_iter()
            .filter(Vehicle::is_available)
            .collect())
    }

    /// Look up one vehicle.
    pub fn get(&self, id: &str) -> Result<Vehicle> {
        self.vehicles
            .load()?
            .remove(id)
            .ok_or_else(|| Error::not_found("vehicle", id))
    }

    /// Look up a vehicle by plate, ignoring case.
    pub fn find_by_plate(&self, plate: &str) -> Result<Option<Vehicle>> {
        let plate = plate.trim().to_ascii_uppercase();
        Ok(self
            .vehicles
            .load()?
            .into_values()
            .find(|vehicle| vehicle.plate == plate))
    }

    /// Current availability of a vehicle.
    pub fn status(&self, id: &str) -> Result<VehicleStatus> {
        Ok(self.get(id)?.status)
    }

    /// Edit descriptive fields. The status is never touched.
    pub fn update(&self, id: &str, patch: VehiclePatch) -> Result<Vehicle> {
        let today = Local::now().date_naive();
        let mut vehicles = self.vehicles.load()?;
        let vehicle = vehicles
            .get_mut(id)
            .ok_or_else(|| Error::not_found("vehicle", id))?;

        if let Some(brand) = provided(patch.brand.as_deref()) {
            vehicle.brand = validation::word("brand", brand)?;
        }
        if let Some(model) = provided(patch.model.as_deref()) {
            vehicle.model = validation::model(model)?;
        }
        if let Some(year) = provided(patch.year.as_deref()) {
            vehicle.year = validation::vehicle_year(year, today)?;
        }
        if let Some(color) = provided(patch.color.as_deref()) {
            vehicle.color = validation::word("color", color)?;
        }
        if let Some(passengers) = provided(patch.passengers.as_deref()) {
            vehicle.passengers = validation::passengers(passengers)?;
        }

        let updated = vehicle.clone();
        self.vehicles.save(&vehicles)?;
        info!(id = %updated.id, "Vehicle updated");
        Ok(updated)
    }

    /// Remove a vehicle that is neither RENTADO nor held by an open rental.
    pub fn delete(&self, id: &str) -> Result<Vehicle> {
        let mut vehicles = self.vehicles.load()?;
        let vehicle = vehicles
            .get(id)
            .ok_or_else(|| Error::not_found("vehicle", id))?;
        if !vehicle.is_available() {
            return Err(Error::InvalidState(format!(
                "vehicle {} ({}) is RENTADO and cannot be deleted",
                vehicle.id, vehicle.plate
            )));
        }
        if let Some(rental) = self
            .rentals
            .load()?
            .into_values()
            .find(|rental| rental.vehicle_id == id && rental.is_open())
        {
            return Err(Error::ReferentialIntegrity(format!(
                "vehicle {} ({}) is held by open rental {}",
                vehicle.id, vehicle.plate, rental.id
            )));
        }

        let removed = vehicles
            .remove(id)
            .ok_or_else(|| Error::not_found("vehicle", id))?;
        self.vehicles.save(&vehicles)?;
        info!(id = %removed.id, plate = %removed.plate, "Vehicle deleted");
        Ok(removed)
    }
}
