//! Multi-field text form shown as a modal over the current screen.

const MAX_FIELD_LEN: usize = 80;

/// What submitting the form does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormKind {
    Login,
    NewUser,
    EditUser(String),
    NewClient,
    EditClient(String),
    EditProfile,
    NewVehicle,
    EditVehicle(String),
    NewRental,
    CloseRental(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormField {
    pub label: &'static str,
    pub input: String,
    /// Cursor position in characters, not bytes.
    pub cursor: usize,
    pub secret: bool,
}

impl FormField {
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            input: String::new(),
            cursor: 0,
            secret: false,
        }
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.input = value.into();
        self.cursor = self.input.chars().count();
        self
    }

    pub fn secret(mut self) -> Self {
        self.secret = true;
        self
    }

    /// Text to render: secrets are masked.
    pub fn display(&self) -> String {
        if self.secret {
            "*".repeat(self.input.chars().count())
        } else {
            self.input.clone()
        }
    }

    fn len(&self) -> usize {
        self.input.chars().count()
    }

    fn byte_index(&self, cursor: usize) -> usize {
        self.input
            .char_indices()
            .nth(cursor)
            .map(|(idx, _)| idx)
            .unwrap_or(self.input.len())
    }

    fn move_cursor(&mut self, delta: isize) {
        let next = self.cursor as isize + delta;
        self.cursor = next.clamp(0, self.len() as isize) as usize;
    }

    fn insert(&mut self, ch: char) {
        if self.len() >= MAX_FIELD_LEN || ch.is_control() {
            return;
        }
        let at = self.byte_index(self.cursor);
        self.input.insert(at, ch);
        self.cursor += 1;
    }

    fn backspace(&mut self) {
        if self.cursor == 0 {
            return;
        }
        self.cursor -= 1;
        let at = self.byte_index(self.cursor);
        self.input.remove(at);
    }

    fn delete(&mut self) {
        if self.cursor < self.len() {
            let at = self.byte_index(self.cursor);
            self.input.remove(at);
        }
    }
}

#[derive(Debug, Clone)]
pub struct FormModal {
    pub kind: FormKind,
    pub title: String,
    pub fields: Vec<FormField>,
    pub focus: usize,
    /// Extra guidance rendered under the fields.
    pub note: Option<String>,
}

impl FormModal {
    pub fn new(kind: FormKind, title: impl Into<String>, fields: Vec<FormField>) -> Self {
        Self {
            kind,
            title: title.into(),
            fields,
            focus: 0,
            note: None,
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    pub fn focused(&self) -> Option<&FormField> {
        self.fields.get(self.focus)
    }

    fn focused_mut(&mut self) -> Option<&mut FormField> {
        self.fields.get_mut(self.focus)
    }

    pub fn next_field(&mut self) {
        if !self.fields.is_empty() {
            self.focus = (self.focus + 1) % self.fields.len();
        }
    }

    pub fn prev_field(&mut self) {
        if !self.fields.is_empty() {
            self.focus = (self.focus + self.fields.len() - 1) % self.fields.len();
        }
    }

    pub fn move_cursor(&mut self, delta: isize) {
        if let Some(field) = self.focused_mut() {
            field.move_cursor(delta);
        }
    }

    pub fn move_home(&mut self) {
        if let Some(field) = self.focused_mut() {
            field.cursor = 0;
        }
    }

    pub fn move_end(&mut self) {
        if let Some(field) = self.focused_mut() {
            field.cursor = field.len();
        }
    }

    pub fn insert(&mut self, ch: char) {
        if let Some(field) = self.focused_mut() {
            field.insert(ch);
        }
    }

    pub fn backspace(&mut self) {
        if let Some(field) = self.focused_mut() {
            field.backspace();
        }
    }

    pub fn delete(&mut self) {
        if let Some(field) = self.focused_mut() {
            field.delete();
        }
    }

    /// Raw input of the field labelled `label`; empty if there is none.
    pub fn value(&self, label: &str) -> String {
        self.fields
            .iter()
            .find(|field| field.label == label)
            .map(|field| field.input.clone())
            .unwrap_or_default()
    }

    /// Input of `label`, or `None` when left blank.
    pub fn optional(&self, label: &str) -> Option<String> {
        let value = self.value(label);
        if value.trim().is_empty() {
            None
        } else {
            Some(value)
        }
    }

    /// Empty the field labelled `label` and focus it.
    pub fn clear(&mut self, label: &str) {
        if let Some(index) = self.fields.iter().position(|field| field.label == label) {
            self.fields[index].input.clear();
            self.fields[index].cursor = 0;
            self.focus = index;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form() -> FormModal {
        FormModal::new(
            FormKind::Login,
            "Login",
            vec![FormField::new("Username"), FormField::new("Password").secret()],
        )
    }

    #[test]
    fn editing_respects_the_cursor() {
        let mut form = form();
        for ch in "mara".chars() {
            form.insert(ch);
        }
        form.move_cursor(-2);
        form.insert('ñ');
        assert_eq!(form.value("Username"), "mañra");

        form.backspace();
        form.delete();
        assert_eq!(form.value("Username"), "maa");

        form.move_home();
        form.delete();
        form.move_end();
        form.insert('s');
        assert_eq!(form.value("Username"), "aas");
    }

    #[test]
    fn focus_wraps_between_fields() {
        let mut form = form();
        form.prev_field();
        assert_eq!(form.focused().map(|field| field.label), Some("Password"));
        form.insert('x');
        form.next_field();
        assert_eq!(form.focus, 0);
        assert_eq!(form.fields[1].display(), "*");
        assert_eq!(form.value("Password"), "x");
    }

    #[test]
    fn blank_fields_are_optional() {
        let mut form = form();
        form.insert(' ');
        assert_eq!(form.optional("Username"), None);
        assert_eq!(form.value("Missing"), "");

        let prefilled = FormField::new("Email").with_value("ana@correo.com");
        assert_eq!(prefilled.cursor, 14);
    }

    #[test]
    fn clear_refocuses_field() {
        let mut form = form();
        form.next_field();
        form.insert('a');
        form.prev_field();
        form.clear("Password");
        assert_eq!(form.focus, 1);
        assert_eq!(form.value("Password"), "");
    }

    #[test]
    fn control_characters_are_ignored() {
        let mut form = form();
        form.insert('\n');
        form.insert('\t');
        assert_eq!(form.value("Username"), "");
    }
}
