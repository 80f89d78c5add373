//! Record listings and the forms that create or edit them.

use chrono::NaiveDate;
use rentacar_core::{
    models::{Client, IdType, Rental, Role, User, Vehicle},
    validation::DATE_FORMAT,
    Error, Result,
};

use crate::form::{FormField, FormKind, FormModal};

/// Records shown on the current screen.
#[derive(Debug, Clone, Default)]
pub enum Listing {
    #[default]
    Empty,
    Users(Vec<User>),
    Clients(Vec<Client>),
    Vehicles(Vec<Vehicle>),
    Rentals(Vec<Rental>),
}

impl Listing {
    pub fn len(&self) -> usize {
        match self {
            Listing::Empty => 0,
            Listing::Users(users) => users.len(),
            Listing::Clients(clients) => clients.len(),
            Listing::Vehicles(vehicles) => vehicles.len(),
            Listing::Rentals(rentals) => rentals.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// One line per record.
    pub fn summaries(&self) -> Vec<String> {
        match self {
            Listing::Empty => Vec::new(),
            Listing::Users(users) => users.iter().map(user_summary).collect(),
            Listing::Clients(clients) => clients.iter().map(client_summary).collect(),
            Listing::Vehicles(vehicles) => vehicles.iter().map(vehicle_summary).collect(),
            Listing::Rentals(rentals) => rentals.iter().map(rental_summary).collect(),
        }
    }

    /// Labelled fields of the record at `index`.
    pub fn detail(&self, index: usize) -> Vec<(&'static str, String)> {
        let detail = match self {
            Listing::Empty => None,
            Listing::Users(users) => users.get(index).map(user_detail),
            Listing::Clients(clients) => clients.get(index).map(client_detail),
            Listing::Vehicles(vehicles) => vehicles.get(index).map(vehicle_detail),
            Listing::Rentals(rentals) => rentals.get(index).map(rental_detail),
        };
        detail.unwrap_or_default()
    }
}

fn user_summary(user: &User) -> String {
    let inactive = if user.active { "" } else { "  (inactive)" };
    format!("{:<5}{:<16}{}{}", user.id, user.username, user.role, inactive)
}

fn client_summary(client: &Client) -> String {
    format!("{:<5}{:<14}{}", client.id, client.national_id, client.name)
}

fn vehicle_summary(vehicle: &Vehicle) -> String {
    format!(
        "{:<5}{:<36}{}",
        vehicle.id,
        vehicle.display_name(),
        vehicle.status
    )
}

fn rental_summary(rental: &Rental) -> String {
    format!(
        "{:<5}{:<5}{:<5}{}  {}",
        rental.id, rental.client_id, rental.vehicle_id, rental.start_date, rental.status
    )
}

fn user_detail(user: &User) -> Vec<(&'static str, String)> {
    vec![
        ("Id", user.id.clone()),
        ("Username", user.username.clone()),
        ("Name", user.full_name.clone()),
        ("Email", user.email.clone()),
        ("Role", user.role.to_string()),
        ("Client", user.client_id.clone().unwrap_or_else(|| "-".to_string())),
        ("Active", yes_no(user.active).to_string()),
    ]
}

fn client_detail(client: &Client) -> Vec<(&'static str, String)> {
    vec![
        ("Id", client.id.clone()),
        ("Id type", client.id_type.to_string()),
        ("National id", client.national_id.clone()),
        ("Name", client.name.clone()),
        ("Email", client.email.clone()),
        ("Phone", client.phone.clone()),
        ("Address", client.address.clone()),
        ("Profession", or_dash(client.profession.as_deref())),
        ("Job address", or_dash(client.job_address.as_deref())),
    ]
}

fn vehicle_detail(vehicle: &Vehicle) -> Vec<(&'static str, String)> {
    vec![
        ("Id", vehicle.id.clone()),
        ("Plate", vehicle.plate.clone()),
        ("Brand", vehicle.brand.clone()),
        ("Model", vehicle.model.clone()),
        ("Year", vehicle.year.to_string()),
        ("Color", vehicle.color.clone()),
        ("Passengers", vehicle.passengers.to_string()),
        ("Status", vehicle.status.to_string()),
    ]
}

fn rental_detail(rental: &Rental) -> Vec<(&'static str, String)> {
    let date = |value: Option<NaiveDate>| {
        value
            .map(|date| date.format(DATE_FORMAT).to_string())
            .unwrap_or_else(|| "-".to_string())
    };
    vec![
        ("Id", rental.id.clone()),
        ("Client", rental.client_id.clone()),
        ("Vehicle", rental.vehicle_id.clone()),
        ("Start", rental.start_date.format(DATE_FORMAT).to_string()),
        ("Expected return", date(rental.expected_return)),
        ("Returned", date(rental.end_date)),
        ("Cost per day", format!("₡{}", rental.cost_per_day)),
        ("Card", rental.pay_card.clone()),
        ("Card expiration", rental.card_expiration.clone()),
        ("Status", rental.status.to_string()),
        (
            "Total",
            rental
                .total_cost()
                .map(|total| format!("₡{total}"))
                .unwrap_or_else(|| "-".to_string()),
        ),
    ]
}

fn or_dash(value: Option<&str>) -> String {
    value.unwrap_or("-").to_string()
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}

/// Read a yes/no answer; blank means "leave unchanged".
pub fn parse_yes_no(field: &'static str, input: &str) -> Result<Option<bool>> {
    match input.trim().to_lowercase().as_str() {
        "" => Ok(None),
        "y" | "yes" | "s" | "si" | "sí" => Ok(Some(true)),
        "n" | "no" => Ok(Some(false)),
        _ => Err(Error::validation(field, "answer y or n")),
    }
}

pub fn login_form() -> FormModal {
    FormModal::new(
        FormKind::Login,
        "Sign in",
        vec![FormField::new("Username"), FormField::new("Password").secret()],
    )
}

pub fn new_user_form() -> FormModal {
    let roles: Vec<String> = Role::ALL
        .iter()
        .enumerate()
        .map(|(idx, role)| format!("{} {}", idx + 1, role))
        .collect();
    FormModal::new(
        FormKind::NewUser,
        "New user",
        vec![
            FormField::new("Username"),
            FormField::new("Password").secret(),
            FormField::new("Full name"),
            FormField::new("Email"),
            FormField::new("Role"),
            FormField::new("Client id"),
        ],
    )
    .with_note(format!(
        "Roles: {}. Client id is required for CLIENTE.",
        roles.join(", ")
    ))
}

pub fn edit_user_form(user: &User) -> FormModal {
    FormModal::new(
        FormKind::EditUser(user.id.clone()),
        format!("Edit user {}", user.username),
        vec![
            FormField::new("Full name").with_value(&user.full_name),
            FormField::new("Email").with_value(&user.email),
            FormField::new("New password").secret(),
            FormField::new("Active").with_value(yes_no(user.active)),
        ],
    )
    .with_note("Leave the password blank to keep it.")
}

pub fn new_client_form() -> FormModal {
    let types: Vec<String> = IdType::ALL
        .iter()
        .enumerate()
        .map(|(idx, id_type)| format!("{} {}", idx + 1, id_type))
        .collect();
    FormModal::new(
        FormKind::NewClient,
        "New client",
        vec![
            FormField::new("Id type"),
            FormField::new("National id"),
            FormField::new("Name"),
            FormField::new("Email"),
            FormField::new("Phone"),
            FormField::new("Address"),
            FormField::new("Profession"),
            FormField::new("Job address"),
        ],
    )
    .with_note(format!("Id types: {}", types.join(", ")))
}

/// Edit form for a client record; `own` edits the logged-in client's profile.
pub fn edit_client_form(client: &Client, own: bool) -> FormModal {
    let (kind, title) = if own {
        (FormKind::EditProfile, "Edit my profile".to_string())
    } else {
        (
            FormKind::EditClient(client.id.clone()),
            format!("Edit client {}", client.id),
        )
    };
    FormModal::new(
        kind,
        title,
        vec![
            FormField::new("National id").with_value(&client.national_id),
            FormField::new("Name").with_value(&client.name),
            FormField::new("Email").with_value(&client.email),
            FormField::new("Phone").with_value(&client.phone),
            FormField::new("Address").with_value(&client.address),
            FormField::new("Profession")
                .with_value(client.profession.clone().unwrap_or_default()),
            FormField::new("Job address")
                .with_value(client.job_address.clone().unwrap_or_default()),
        ],
    )
    .with_note(client.id_type.format_hint())
}

pub fn new_vehicle_form() -> FormModal {
    FormModal::new(
        FormKind::NewVehicle,
        "New vehicle",
        vec![
            FormField::new("Plate"),
            FormField::new("Brand"),
            FormField::new("Model"),
            FormField::new("Year"),
            FormField::new("Color"),
            FormField::new("Passengers"),
        ],
    )
}

pub fn edit_vehicle_form(vehicle: &Vehicle) -> FormModal {
    FormModal::new(
        FormKind::EditVehicle(vehicle.id.clone()),
        format!("Edit vehicle {}", vehicle.plate),
        vec![
            FormField::new("Brand").with_value(&vehicle.brand),
            FormField::new("Model").with_value(&vehicle.model),
            FormField::new("Year").with_value(vehicle.year.to_string()),
            FormField::new("Color").with_value(&vehicle.color),
            FormField::new("Passengers").with_value(vehicle.passengers.to_string()),
        ],
    )
}

/// Booking form. Staff pick the client; clients always book for themselves.
pub fn new_rental_form(staff: bool, today: NaiveDate, available: &[Vehicle]) -> FormModal {
    let mut fields = Vec::new();
    if staff {
        fields.push(FormField::new("Client id"));
    }
    fields.extend([
        FormField::new("Vehicle id"),
        FormField::new("Start date").with_value(today.format(DATE_FORMAT).to_string()),
        FormField::new("Expected return"),
        FormField::new("Cost per day"),
        FormField::new("Card number"),
        FormField::new("Card expiration"),
    ]);
    let note = if available.is_empty() {
        "No vehicles are available right now.".to_string()
    } else {
        let names: Vec<String> = available
            .iter()
            .map(|vehicle| format!("{} {}", vehicle.id, vehicle.plate))
            .collect();
        format!("Available: {}. Expiration as MM-YYYY.", names.join(", "))
    };
    FormModal::new(FormKind::NewRental, "New rental", fields).with_note(note)
}

pub fn close_rental_form(rental: &Rental, today: NaiveDate) -> FormModal {
    FormModal::new(
        FormKind::CloseRental(rental.id.clone()),
        format!("Return rental {}", rental.id),
        vec![FormField::new("End date").with_value(today.format(DATE_FORMAT).to_string())],
    )
    .with_note(format!(
        "Vehicle {} goes back to DISPONIBLE.",
        rental.vehicle_id
    ))
}
