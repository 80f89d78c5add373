use std::{cmp, io, thread, time::Duration};

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
    Frame, Terminal,
};
use rentacar_core::{
    models::{IdType, Role},
    services::{ClientPatch, NewClient, NewRental, NewUser, NewVehicle, UserPatch, VehiclePatch},
    Error, LoginAttempts, MenuEntry, Permission, RentalSystem, Session,
};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::{
    form::{FormKind, FormModal},
    views::{self, Listing},
};

const TICK_RATE: Duration = Duration::from_millis(250);

#[derive(Debug, Clone)]
struct Theme {
    primary_fg: Color,
    accent: Color,
    muted: Color,
    selection_bg: Color,
    warning: Color,
    danger: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            primary_fg: Color::White,
            accent: Color::Cyan,
            muted: Color::DarkGray,
            selection_bg: Color::DarkGray,
            warning: Color::Yellow,
            danger: Color::Red,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Screen {
    Login,
    Menu,
    Users,
    Clients,
    Vehicles,
    Rentals,
    Profile,
}

impl Screen {
    fn title(&self) -> &'static str {
        match self {
            Screen::Login => "Sign in",
            Screen::Menu => "Menu",
            Screen::Users => "Users",
            Screen::Clients => "Clients",
            Screen::Vehicles => "Vehicles",
            Screen::Rentals => "Rentals",
            Screen::Profile => "My profile",
        }
    }
}

/// Action waiting for a y/n answer.
#[derive(Debug, Clone, PartialEq, Eq)]
enum PendingAction {
    DeactivateUser(String),
    DeleteClient(String),
    DeleteVehicle(String),
    DeliverRental(String),
}

#[derive(Debug, Clone)]
struct ConfirmPrompt {
    message: String,
    action: PendingAction,
}

enum AppEvent {
    Input(Event),
    Tick,
}

/// Terminal frontend over a [`RentalSystem`].
pub struct RentacarApp {
    system: RentalSystem,
    session: Option<Session>,
    attempts: LoginAttempts,
    screen: Screen,
    state: UiState,
    listing: Listing,
    form: Option<FormModal>,
    confirm: Option<ConfirmPrompt>,
    theme: Theme,
    exit_notice: Option<String>,
}

impl RentacarApp {
    pub fn new(system: RentalSystem) -> Self {
        let attempts = system.login_attempts();
        Self {
            system,
            session: None,
            attempts,
            screen: Screen::Login,
            state: UiState::default(),
            listing: Listing::Empty,
            form: Some(views::login_form()),
            confirm: None,
            theme: Theme::default(),
            exit_notice: None,
        }
    }

    /// Message to print once the terminal has been restored.
    pub fn exit_notice(&self) -> Option<&str> {
        self.exit_notice.as_deref()
    }

    pub async fn run(&mut self) -> Result<()> {
        self.state
            .set_status("Enter your username and password".to_string());

        let mut stdout = io::stdout();
        enable_raw_mode().context("failed to enter raw mode")?;
        execute!(stdout, EnterAlternateScreen).context("failed to enter alternate screen")?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend).context("failed to create terminal")?;
        terminal.hide_cursor()?;
        terminal.clear()?;

        let (event_tx, event_rx) = mpsc::channel::<AppEvent>(128);
        spawn_input_thread(event_tx);

        let result = self.event_loop(&mut terminal, event_rx).await;
        if let Some(session) = self.session.take() {
            if let Err(err) = self.system.logout(session) {
                error!(%err, "Logout on exit failed");
            }
        }
        restore_terminal(&mut terminal)?;
        result
    }

    async fn event_loop(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
        mut event_rx: mpsc::Receiver<AppEvent>,
    ) -> Result<()> {
        loop {
            terminal.draw(|frame| self.draw(frame))?;
            if self.state.should_quit {
                break;
            }
            let maybe_event = event_rx.recv().await;
            if !self.process_app_event(maybe_event) {
                break;
            }
        }
        Ok(())
    }

    fn process_app_event(&mut self, maybe_event: Option<AppEvent>) -> bool {
        match maybe_event {
            Some(AppEvent::Input(event)) => {
                if let Err(err) = self.handle_input(event) {
                    error!(?err, "Input handling failed");
                    self.state.set_status(format!("Error: {err}"));
                }
                true
            }
            Some(AppEvent::Tick) => {
                self.state.clock = Local::now().format("%H:%M").to_string();
                true
            }
            None => false,
        }
    }

    fn today() -> NaiveDate {
        Local::now().date_naive()
    }

    fn handle_input(&mut self, event: Event) -> Result<()> {
        let Event::Key(key) = event else {
            return Ok(());
        };
        if key.kind != KeyEventKind::Press {
            return Ok(());
        }
        if key.modifiers == KeyModifiers::CONTROL && key.code == KeyCode::Char('c') {
            self.state.should_quit = true;
            return Ok(());
        }
        if self.confirm.is_some() {
            self.handle_confirm_key(key);
            return Ok(());
        }
        if self.form.is_some() {
            self.handle_form_key(key);
            return Ok(());
        }
        match self.screen {
            Screen::Login => match key.code {
                KeyCode::Esc | KeyCode::Char('q') => self.state.should_quit = true,
                _ => self.form = Some(views::login_form()),
            },
            Screen::Menu => self.handle_menu_key(key),
            _ => self.handle_list_key(key)?,
        }
        Ok(())
    }

    fn handle_form_key(&mut self, key: KeyEvent) {
        let Some(mut form) = self.form.take() else {
            return;
        };
        match key.code {
            KeyCode::Esc => {
                if form.kind == FormKind::Login {
                    self.state.should_quit = true;
                } else {
                    self.state.set_status(format!("{} cancelled", form.title));
                }
                return;
            }
            KeyCode::Enter => {
                self.submit_form(form);
                return;
            }
            KeyCode::Tab | KeyCode::Down => form.next_field(),
            KeyCode::BackTab | KeyCode::Up => form.prev_field(),
            KeyCode::Left => form.move_cursor(-1),
            KeyCode::Right => form.move_cursor(1),
            KeyCode::Home => form.move_home(),
            KeyCode::End => form.move_end(),
            KeyCode::Backspace => form.backspace(),
            KeyCode::Delete => form.delete(),
            KeyCode::Char(ch) => {
                if key.modifiers.is_empty() || key.modifiers == KeyModifiers::SHIFT {
                    form.insert(ch);
                }
            }
            _ => {}
        }
        self.form = Some(form);
    }

    fn submit_form(&mut self, form: FormModal) {
        if form.kind == FormKind::Login {
            self.submit_login(form);
            return;
        }
        match self.apply_form(&form) {
            Ok(message) => {
                self.state.set_status(message);
                self.refresh();
            }
            Err(err) => {
                debug!(%err, form = %form.title, "Form rejected");
                self.state.set_status(format!("Error: {err}"));
                self.form = Some(form);
            }
        }
    }

    fn submit_login(&mut self, mut form: FormModal) {
        let username = form.value("Username");
        match self.system.login(&username, &form.value("Password")) {
            Ok(session) => {
                self.attempts = self.system.login_attempts();
                self.state.set_status(format!(
                    "Welcome, {} ({})",
                    session.user().full_name,
                    session.role()
                ));
                self.session = Some(session);
                self.screen = Screen::Menu;
                self.state.menu_cursor = 0;
            }
            Err(Error::InvalidCredentials) => {
                if self.attempts.record_failure() {
                    self.state.set_status(format!(
                        "Invalid username or password, {} attempt(s) left",
                        self.attempts.remaining()
                    ));
                    form.clear("Password");
                    self.form = Some(form);
                } else {
                    warn!(username = %username.trim(), "Login attempts exhausted");
                    self.exit_notice = Some("Too many failed login attempts.".to_string());
                    self.state.should_quit = true;
                }
            }
            Err(err) => {
                error!(%err, "Login failed");
                self.state.set_status(format!("Error: {err}"));
                self.form = Some(form);
            }
        }
    }

    fn current_session(&self) -> rentacar_core::Result<&Session> {
        self.session
            .as_ref()
            .ok_or_else(|| Error::InvalidState("not logged in".to_string()))
    }

    fn apply_form(&self, form: &FormModal) -> rentacar_core::Result<String> {
        let session = self.current_session()?;
        let message = match &form.kind {
            FormKind::Login => String::new(),
            FormKind::NewUser => {
                let role = form
                    .optional("Role")
                    .map(|role| role.parse::<Role>())
                    .transpose()?;
                let user = self.system.create_user(
                    session,
                    NewUser {
                        username: form.value("Username"),
                        password: form.value("Password"),
                        full_name: form.value("Full name"),
                        email: form.value("Email"),
                        role,
                        client_id: form.optional("Client id"),
                    },
                )?;
                format!("User {} created as {}", user.username, user.id)
            }
            FormKind::EditUser(id) => {
                let user = self.system.update_user(
                    session,
                    id,
                    UserPatch {
                        full_name: form.optional("Full name"),
                        email: form.optional("Email"),
                        password: form.optional("New password"),
                        active: views::parse_yes_no("active", &form.value("Active"))?,
                    },
                )?;
                format!("User {} updated", user.username)
            }
            FormKind::NewClient => {
                let client = self.system.create_client(
                    session,
                    NewClient {
                        id_type: form.value("Id type").parse::<IdType>()?,
                        national_id: form.value("National id"),
                        name: form.value("Name"),
                        email: form.value("Email"),
                        phone: form.value("Phone"),
                        address: form.value("Address"),
                        profession: form.optional("Profession"),
                        job_address: form.optional("Job address"),
                    },
                )?;
                format!("Client {} created as {}", client.name, client.id)
            }
            FormKind::EditClient(id) => {
                let client = self.system.update_client(session, id, client_patch(form))?;
                format!("Client {} updated", client.id)
            }
            FormKind::EditProfile => {
                self.system.update_my_profile(session, client_patch(form))?;
                "Profile updated".to_string()
            }
            FormKind::NewVehicle => {
                let vehicle = self.system.create_vehicle(
                    session,
                    NewVehicle {
                        plate: form.value("Plate"),
                        brand: form.value("Brand"),
                        model: form.value("Model"),
                        year: form.value("Year"),
                        color: form.value("Color"),
                        passengers: form.value("Passengers"),
                    },
                )?;
                format!("Vehicle {} created as {}", vehicle.plate, vehicle.id)
            }
            FormKind::EditVehicle(id) => {
                let vehicle = self.system.update_vehicle(
                    session,
                    id,
                    VehiclePatch {
                        brand: form.optional("Brand"),
                        model: form.optional("Model"),
                        year: form.optional("Year"),
                        color: form.optional("Color"),
                        passengers: form.optional("Passengers"),
                    },
                )?;
                format!("Vehicle {} updated", vehicle.plate)
            }
            FormKind::NewRental => {
                let rental = self.system.create_rental(
                    session,
                    NewRental {
                        client_id: form.value("Client id"),
                        vehicle_id: form.value("Vehicle id"),
                        start_date: form.value("Start date"),
                        expected_return: form.optional("Expected return"),
                        cost_per_day: form.value("Cost per day"),
                        card_number: form.value("Card number"),
                        card_expiration: form.value("Card expiration"),
                    },
                )?;
                format!(
                    "Rental {} prepared for vehicle {}",
                    rental.id, rental.vehicle_id
                )
            }
            FormKind::CloseRental(id) => {
                let rental = self.system.close_rental(session, id, &form.value("End date"))?;
                match rental.total_cost() {
                    Some(total) => format!("Rental {} returned, total ₡{total}", rental.id),
                    None => format!("Rental {} returned", rental.id),
                }
            }
        };
        Ok(message)
    }

    fn handle_confirm_key(&mut self, key: KeyEvent) {
        let Some(prompt) = self.confirm.take() else {
            return;
        };
        match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                match self.apply_action(&prompt.action) {
                    Ok(message) => self.state.set_status(message),
                    Err(err) => self.state.set_status(format!("Error: {err}")),
                }
                self.refresh();
            }
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                self.state.set_status("Cancelled".to_string());
            }
            _ => self.confirm = Some(prompt),
        }
    }

    fn apply_action(&self, action: &PendingAction) -> rentacar_core::Result<String> {
        let session = self.current_session()?;
        let message = match action {
            PendingAction::DeactivateUser(id) => {
                let user = self.system.delete_user(session, id)?;
                format!("User {} deactivated", user.username)
            }
            PendingAction::DeleteClient(id) => {
                let client = self.system.delete_client(session, id)?;
                format!("Client {} deleted", client.id)
            }
            PendingAction::DeleteVehicle(id) => {
                let vehicle = self.system.delete_vehicle(session, id)?;
                format!("Vehicle {} deleted", vehicle.plate)
            }
            PendingAction::DeliverRental(id) => {
                let rental = self.system.deliver_rental(session, id)?;
                format!("Rental {} is now {}", rental.id, rental.status)
            }
        };
        Ok(message)
    }

    fn menu_entries(&self) -> &'static [MenuEntry] {
        self.session.as_ref().map(Session::menu).unwrap_or(&[])
    }

    fn handle_menu_key(&mut self, key: KeyEvent) {
        let entries = self.menu_entries();
        match key.code {
            KeyCode::Char('j') | KeyCode::Down => self.state.move_menu_cursor(1, entries.len()),
            KeyCode::Char('k') | KeyCode::Up => self.state.move_menu_cursor(-1, entries.len()),
            KeyCode::Esc | KeyCode::Char('q') => self.logout(),
            KeyCode::Enter => {
                if let Some(entry) = entries.get(self.state.menu_cursor).copied() {
                    self.open_entry(entry);
                }
            }
            _ => {}
        }
    }

    fn open_entry(&mut self, entry: MenuEntry) {
        let screen = match entry {
            MenuEntry::Users => Screen::Users,
            MenuEntry::Vehicles => Screen::Vehicles,
            MenuEntry::Clients => Screen::Clients,
            MenuEntry::Rentals | MenuEntry::MyRentals => Screen::Rentals,
            MenuEntry::MyProfile => Screen::Profile,
            MenuEntry::Logout => {
                self.logout();
                return;
            }
        };
        info!(screen = screen.title(), "Opening screen");
        self.screen = screen;
        self.state.cursor = 0;
        self.state.set_status(String::new());
        self.refresh();
    }

    fn logout(&mut self) {
        if let Some(session) = self.session.take() {
            if let Err(err) = self.system.logout(session) {
                error!(%err, "Logout failed");
            }
        }
        self.screen = Screen::Login;
        self.listing = Listing::Empty;
        self.form = Some(views::login_form());
        self.state.set_status("Logged out".to_string());
    }

    fn refresh(&mut self) {
        let Some(session) = self.session.as_ref() else {
            self.listing = Listing::Empty;
            return;
        };
        let listing = match self.screen {
            Screen::Users => self.system.list_users(session).map(Listing::Users),
            Screen::Clients => self.system.list_clients(session).map(Listing::Clients),
            Screen::Vehicles => self.system.list_vehicles(session).map(Listing::Vehicles),
            Screen::Rentals => self.system.list_rentals(session).map(Listing::Rentals),
            Screen::Profile => self
                .system
                .my_profile(session)
                .map(|client| Listing::Clients(vec![client])),
            Screen::Login | Screen::Menu => Ok(Listing::Empty),
        };
        match listing {
            Ok(listing) => self.listing = listing,
            Err(err) => {
                warn!(%err, screen = self.screen.title(), "Refresh failed");
                self.state.set_status(format!("Error: {err}"));
                self.listing = Listing::Empty;
            }
        }
        self.state.clamp_cursor(self.listing.len());
    }

    fn can_manage_rentals(&self) -> bool {
        self.session
            .as_ref()
            .is_some_and(|session| session.role().allows(Permission::ManageRentals))
    }

    fn handle_list_key(&mut self, key: KeyEvent) -> Result<()> {
        let total = self.listing.len();
        match key.code {
            KeyCode::Esc | KeyCode::Char('q') => {
                self.screen = Screen::Menu;
                self.listing = Listing::Empty;
            }
            KeyCode::Char('j') | KeyCode::Down => self.state.move_cursor(1, total),
            KeyCode::Char('k') | KeyCode::Up => self.state.move_cursor(-1, total),
            KeyCode::Home | KeyCode::Char('g') => self.state.cursor = 0,
            KeyCode::End | KeyCode::Char('G') => self.state.cursor = total.saturating_sub(1),
            KeyCode::F(5) => {
                self.refresh();
                self.state.set_status("Refreshed".to_string());
            }
            KeyCode::Char('n') => self.open_create_form()?,
            KeyCode::Char('e') => self.open_edit_form(),
            KeyCode::Char('d') => self.prompt_delete(),
            KeyCode::Char('a') if self.screen == Screen::Rentals => self.prompt_deliver(),
            KeyCode::Char('r') if self.screen == Screen::Rentals => self.open_close_form(),
            _ => {}
        }
        Ok(())
    }

    fn open_create_form(&mut self) -> Result<()> {
        let form = match self.screen {
            Screen::Users => views::new_user_form(),
            Screen::Clients => views::new_client_form(),
            Screen::Vehicles => views::new_vehicle_form(),
            Screen::Rentals => {
                let session = self.current_session()?;
                let available = self.system.available_vehicles(session)?;
                views::new_rental_form(self.can_manage_rentals(), Self::today(), &available)
            }
            Screen::Login | Screen::Menu | Screen::Profile => return Ok(()),
        };
        self.form = Some(form);
        Ok(())
    }

    fn open_edit_form(&mut self) {
        let cursor = self.state.cursor;
        let form = match &self.listing {
            Listing::Users(users) => users.get(cursor).map(views::edit_user_form),
            Listing::Clients(clients) => clients
                .get(cursor)
                .map(|client| views::edit_client_form(client, self.screen == Screen::Profile)),
            Listing::Vehicles(vehicles) => vehicles.get(cursor).map(views::edit_vehicle_form),
            Listing::Rentals(_) => {
                self.state
                    .set_status("Rentals cannot be edited; deliver or return them".to_string());
                return;
            }
            Listing::Empty => None,
        };
        if form.is_some() {
            self.form = form;
        }
    }

    fn prompt_delete(&mut self) {
        let cursor = self.state.cursor;
        let prompt = match &self.listing {
            Listing::Users(users) => users.get(cursor).map(|user| ConfirmPrompt {
                message: format!("Deactivate user {}?", user.username),
                action: PendingAction::DeactivateUser(user.id.clone()),
            }),
            Listing::Clients(clients) if self.screen == Screen::Clients => {
                clients.get(cursor).map(|client| ConfirmPrompt {
                    message: format!("Delete client {} ({})?", client.name, client.id),
                    action: PendingAction::DeleteClient(client.id.clone()),
                })
            }
            Listing::Vehicles(vehicles) => vehicles.get(cursor).map(|vehicle| ConfirmPrompt {
                message: format!("Delete vehicle {}?", vehicle.display_name()),
                action: PendingAction::DeleteVehicle(vehicle.id.clone()),
            }),
            _ => None,
        };
        if prompt.is_some() {
            self.confirm = prompt;
        }
    }

    fn prompt_deliver(&mut self) {
        if !self.can_manage_rentals() {
            return;
        }
        if let Listing::Rentals(rentals) = &self.listing {
            if let Some(rental) = rentals.get(self.state.cursor) {
                self.confirm = Some(ConfirmPrompt {
                    message: format!(
                        "Hand vehicle {} to client {} for rental {}?",
                        rental.vehicle_id, rental.client_id, rental.id
                    ),
                    action: PendingAction::DeliverRental(rental.id.clone()),
                });
            }
        }
    }

    fn open_close_form(&mut self) {
        if !self.can_manage_rentals() {
            return;
        }
        if let Listing::Rentals(rentals) = &self.listing {
            match rentals.get(self.state.cursor) {
                Some(rental) if rental.is_open() => {
                    self.form = Some(views::close_rental_form(rental, Self::today()));
                }
                Some(rental) => {
                    self.state
                        .set_status(format!("Rental {} is already returned", rental.id));
                }
                None => {}
            }
        }
    }

    fn draw(&mut self, frame: &mut Frame) {
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(5),
                Constraint::Length(4),
            ])
            .split(frame.size());

        self.render_header(frame, layout[0]);
        match self.screen {
            Screen::Login => self.render_login(frame, layout[1]),
            Screen::Menu => self.render_menu(frame, layout[1]),
            Screen::Profile => self.render_detail(frame, layout[1], "My profile"),
            Screen::Users | Screen::Clients | Screen::Vehicles | Screen::Rentals => {
                let columns = Layout::default()
                    .direction(Direction::Horizontal)
                    .constraints([Constraint::Percentage(58), Constraint::Percentage(42)])
                    .split(layout[1]);
                self.render_list(frame, columns[0]);
                self.render_detail(frame, columns[1], "Details");
            }
        }
        self.render_status(frame, layout[2]);

        if let Some(form) = &self.form {
            self.render_form(frame, form);
        }
        if let Some(prompt) = &self.confirm {
            self.render_confirm(frame, prompt);
        }
    }

    fn render_header(&self, frame: &mut Frame, area: Rect) {
        let mut spans = vec![Span::styled(
            "Rentacar",
            Style::default()
                .fg(self.theme.accent)
                .add_modifier(Modifier::BOLD),
        )];
        spans.push(Span::raw(format!(" · {}", self.screen.title())));
        if let Some(session) = &self.session {
            spans.push(Span::styled(
                format!("   {} ({})", session.username(), session.role()),
                Style::default().fg(self.theme.muted),
            ));
        }
        spans.push(Span::styled(
            format!("   {}", self.state.clock),
            Style::default().fg(self.theme.muted),
        ));
        let header =
            Paragraph::new(Line::from(spans)).block(Block::default().borders(Borders::ALL));
        frame.render_widget(header, area);
    }

    fn render_login(&self, frame: &mut Frame, area: Rect) {
        let remaining = self.attempts.remaining();
        let style = if remaining == 1 {
            Style::default().fg(self.theme.warning)
        } else {
            Style::default().fg(self.theme.muted)
        };
        let lines = vec![
            Line::from(Span::styled(
                "Vehicle rental desk",
                Style::default()
                    .fg(self.theme.primary_fg)
                    .add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            Line::from(Span::styled(
                format!("{remaining} login attempt(s) remaining"),
                style,
            )),
        ];
        let paragraph = Paragraph::new(lines).alignment(Alignment::Center);
        frame.render_widget(paragraph, centered_rect(area.width, 3, area));
    }

    fn render_menu(&self, frame: &mut Frame, area: Rect) {
        let entries = self.menu_entries();
        let menu_height = (entries.len() as u16)
            .saturating_mul(2)
            .saturating_add(2)
            .min(area.height);
        let menu_area = centered_rect(30.min(area.width.max(1)), menu_height, area);

        let lines: Vec<Line> = entries
            .iter()
            .enumerate()
            .flat_map(|(idx, entry)| {
                let line = if idx == self.state.menu_cursor {
                    Line::from(Span::styled(
                        format!("▶ {}", entry.label()),
                        Style::default()
                            .fg(self.theme.accent)
                            .add_modifier(Modifier::BOLD),
                    ))
                } else {
                    Line::from(Span::styled(
                        format!("  {}", entry.label()),
                        Style::default().fg(self.theme.primary_fg),
                    ))
                };
                [line, Line::from("")]
            })
            .collect();

        let menu = Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL).title("Menu"))
            .alignment(Alignment::Center);
        frame.render_widget(menu, menu_area);
    }

    fn render_list(&self, frame: &mut Frame, area: Rect) {
        let mut list_state = ListState::default();
        if !self.listing.is_empty() {
            list_state.select(Some(self.state.cursor));
        }
        let items: Vec<ListItem> = self
            .listing
            .summaries()
            .into_iter()
            .enumerate()
            .map(|(idx, summary)| {
                let marker = if idx == self.state.cursor {
                    Span::styled(
                        "▶ ",
                        Style::default()
                            .fg(self.theme.accent)
                            .add_modifier(Modifier::BOLD),
                    )
                } else {
                    Span::raw("  ")
                };
                ListItem::new(Line::from(vec![
                    marker,
                    Span::styled(summary, Style::default().fg(self.theme.primary_fg)),
                ]))
            })
            .collect();

        let title = format!("{} ({})", self.screen.title(), self.listing.len());
        let list = List::new(items)
            .block(Block::default().borders(Borders::ALL).title(title))
            .highlight_style(Style::default().bg(self.theme.selection_bg));
        frame.render_stateful_widget(list, area, &mut list_state);
    }

    fn render_detail(&self, frame: &mut Frame, area: Rect, title: &str) {
        let detail = self.listing.detail(self.state.cursor);
        let width = detail
            .iter()
            .map(|(label, _)| label.len())
            .max()
            .unwrap_or(0);
        let lines: Vec<Line> = if detail.is_empty() {
            vec![Line::from(Span::styled(
                "Nothing to show",
                Style::default().fg(self.theme.muted),
            ))]
        } else {
            detail
                .into_iter()
                .map(|(label, value)| {
                    Line::from(vec![
                        Span::styled(
                            format!("{label:>width$}: "),
                            Style::default().fg(self.theme.muted),
                        ),
                        Span::raw(value),
                    ])
                })
                .collect()
        };
        let paragraph = Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL).title(title.to_string()))
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
    }

    fn key_help(&self) -> &'static str {
        match self.screen {
            Screen::Login => "Tab next field  Enter sign in  Esc quit",
            Screen::Menu => "j/k move  Enter open  q logout  Ctrl+C quit",
            Screen::Users => "n new  e edit  d deactivate  F5 refresh  q back",
            Screen::Clients | Screen::Vehicles => "n new  e edit  d delete  F5 refresh  q back",
            Screen::Rentals if self.can_manage_rentals() => {
                "n new  a deliver  r return  F5 refresh  q back"
            }
            Screen::Rentals => "n book a vehicle  F5 refresh  q back",
            Screen::Profile => "e edit  q back",
        }
    }

    fn render_status(&self, frame: &mut Frame, area: Rect) {
        let status_style = if self.state.status.starts_with("Error") {
            Style::default().fg(self.theme.danger)
        } else {
            Style::default().fg(self.theme.primary_fg)
        };
        let paragraph = Paragraph::new(vec![
            Line::from(Span::styled(self.state.status.clone(), status_style)),
            Line::from(Span::styled(
                self.key_help(),
                Style::default().fg(self.theme.muted),
            )),
        ])
        .block(Block::default().borders(Borders::ALL).title("Status"))
        .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
    }

    fn render_form(&self, frame: &mut Frame, form: &FormModal) {
        let frame_area = frame.size();
        let note_height = u16::from(form.note.is_some()) * 2;
        let height = (form.fields.len() as u16 + note_height + 4).min(frame_area.height);
        let width = cmp::max(
            cmp::min(72_u16, frame_area.width.saturating_sub(4)),
            24_u16,
        );
        let area = centered_rect(width, height, frame_area);
        frame.render_widget(Clear, area);

        let label_width = form
            .fields
            .iter()
            .map(|field| field.label.chars().count())
            .max()
            .unwrap_or(0);
        let mut lines: Vec<Line> = form
            .fields
            .iter()
            .enumerate()
            .map(|(idx, field)| {
                let label_style = if idx == form.focus {
                    Style::default()
                        .fg(self.theme.accent)
                        .add_modifier(Modifier::BOLD)
                } else {
                    Style::default().fg(self.theme.muted)
                };
                Line::from(vec![
                    Span::styled(format!("{:>label_width$}: ", field.label), label_style),
                    Span::raw(field.display()),
                ])
            })
            .collect();
        if let Some(note) = &form.note {
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled(
                note.clone(),
                Style::default().fg(self.theme.muted),
            )));
        }
        lines.push(Line::from(vec![
            Span::styled("Enter", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(" save  "),
            Span::styled("Tab", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(" next  "),
            Span::styled("Esc", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(if form.kind == FormKind::Login {
                " quit"
            } else {
                " cancel"
            }),
        ]));

        let paragraph = Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL).title(form.title.clone()));
        frame.render_widget(paragraph, area);

        if let Some(field) = form.focused() {
            let cursor_x = (area.x + 1 + label_width as u16 + 2 + field.cursor as u16)
                .min(area.x + area.width.saturating_sub(2));
            let cursor_y = area.y + 1 + form.focus as u16;
            frame.set_cursor(cursor_x, cursor_y);
        }
    }

    fn render_confirm(&self, frame: &mut Frame, prompt: &ConfirmPrompt) {
        let frame_area = frame.size();
        let width = cmp::min(60_u16, frame_area.width.saturating_sub(4)).max(24);
        let area = centered_rect(width, 6, frame_area);
        frame.render_widget(Clear, area);

        let paragraph = Paragraph::new(vec![
            Line::from(prompt.message.clone()),
            Line::from(""),
            Line::from(vec![
                Span::styled("y", Style::default().add_modifier(Modifier::BOLD)),
                Span::raw(" confirm  "),
                Span::styled("n", Style::default().add_modifier(Modifier::BOLD)),
                Span::raw(" cancel"),
            ]),
        ])
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Confirm")
                .border_style(Style::default().fg(self.theme.warning)),
        )
        .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
    }
}

fn client_patch(form: &FormModal) -> ClientPatch {
    ClientPatch {
        national_id: form.optional("National id"),
        name: form.optional("Name"),
        email: form.optional("Email"),
        phone: form.optional("Phone"),
        address: form.optional("Address"),
        profession: form.optional("Profession"),
        job_address: form.optional("Job address"),
    }
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    disable_raw_mode().context("failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("failed to leave alternate screen")?;
    terminal.show_cursor()?;
    Ok(())
}

fn spawn_input_thread(sender: mpsc::Sender<AppEvent>) {
    thread::spawn(move || loop {
        match event::poll(TICK_RATE) {
            Ok(true) => match event::read() {
                Ok(evt) => {
                    if sender.blocking_send(AppEvent::Input(evt)).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            },
            Ok(false) => {
                if sender.blocking_send(AppEvent::Tick).is_err() {
                    break;
                }
            }
            Err(_) => break,
        }
    });
}

struct UiState {
    cursor: usize,
    menu_cursor: usize,
    status: String,
    clock: String,
    should_quit: bool,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            cursor: 0,
            menu_cursor: 0,
            status: "Ready".to_string(),
            clock: Local::now().format("%H:%M").to_string(),
            should_quit: false,
        }
    }
}

impl UiState {
    fn set_status(&mut self, message: String) {
        self.status = message;
    }

    fn move_cursor(&mut self, delta: isize, total: usize) {
        self.cursor = step(self.cursor, delta, total);
    }

    fn move_menu_cursor(&mut self, delta: isize, total: usize) {
        self.menu_cursor = step(self.menu_cursor, delta, total);
    }

    fn clamp_cursor(&mut self, total: usize) {
        if self.cursor >= total {
            self.cursor = total.saturating_sub(1);
        }
    }
}

fn step(current: usize, delta: isize, total: usize) -> usize {
    if total == 0 {
        return 0;
    }
    (current as isize + delta).clamp(0, total as isize - 1) as usize
}

fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width, height)
}
