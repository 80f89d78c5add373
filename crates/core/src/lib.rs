#![warn(clippy::all, missing_docs)]

//! Core domain logic for the Rentacar vehicle rental desk.
//!
//! This crate hosts the data models, validation rules, JSON persistence,
//! the access log and the role-checked [`RentalSystem`] used by the
//! terminal UI and any future frontends.

pub mod access_log;
pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod session;
pub mod store;
pub mod validation;

pub use access_log::AccessLog;
pub use config::AppConfig;
pub use error::{Error, Result};
pub use models::{Client, IdType, Rental, RentalStatus, Role, User, Vehicle, VehicleStatus};
pub use services::{
    ClientPatch, NewClient, NewRental, NewUser, NewVehicle, UserPatch, VehiclePatch,
};
pub use session::{menu_for, LoginAttempts, MenuEntry, Permission, RentalSystem, Session};
