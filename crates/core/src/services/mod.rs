//! Entity services.
//!
//! Each service owns handles to the stores it reads and performs a full
//! load → validate → mutate → save cycle per call.

pub mod clients;
pub mod rentals;
pub mod users;
pub mod vehicles;

pub use clients::{ClientPatch, ClientService, NewClient};
pub use rentals::{NewRental, RentalService};
pub use users::{NewUser, UserPatch, UserService};
pub use vehicles::{NewVehicle, VehiclePatch, VehicleService};

use crate::store::Records;

/// Records in natural id order (`V2` before `V10`).
pub(crate) fn ordered<T>(records: Records<T>) -> Vec<T> {
    let mut entries: Vec<(String, T)> = records.into_iter().collect();
    entries.sort_by(|(a, _), (b, _)| a.len().cmp(&b.len()).then_with(|| a.cmp(b)));
    entries.into_iter().map(|(_, record)| record).collect()
}

/// Treat blank input as "not provided".
pub(crate) fn provided(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}
