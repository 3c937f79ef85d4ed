//! Modal input forms used to collect record fields from the reader.

const MAX_INPUT_LEN: usize = 120;

/// How a field's text is interpreted on submit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Free text, surrounding whitespace removed.
    Text,
    /// Free text that must not be blank.
    RequiredText,
    /// Non-negative whole number.
    Count,
}

#[derive(Debug, Clone)]
pub struct InputField {
    pub label: &'static str,
    pub kind: FieldKind,
    pub input: String,
    /// Cursor position in characters, not bytes.
    pub cursor: usize,
    pub error: Option<String>,
}

impl InputField {
    fn new(label: &'static str, kind: FieldKind) -> Self {
        Self {
            label,
            kind,
            input: String::new(),
            cursor: 0,
            error: None,
        }
    }

    fn char_len(&self) -> usize {
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
        let len = self.char_len() as isize;
        self.cursor = (self.cursor as isize + delta).clamp(0, len) as usize;
    }

    fn move_home(&mut self) {
        self.cursor = 0;
    }

    fn move_end(&mut self) {
        self.cursor = self.char_len();
    }

    fn insert(&mut self, ch: char) {
        if ch.is_control() || self.char_len() >= MAX_INPUT_LEN {
            return;
        }
        let idx = self.byte_index(self.cursor);
        self.input.insert(idx, ch);
        self.cursor += 1;
        self.error = None;
    }

    fn backspace(&mut self) {
        if self.cursor == 0 {
            return;
        }
        self.cursor -= 1;
        let idx = self.byte_index(self.cursor);
        self.input.remove(idx);
        self.error = None;
    }

    fn delete(&mut self) {
        if self.cursor >= self.char_len() {
            return;
        }
        let idx = self.byte_index(self.cursor);
        self.input.remove(idx);
        self.error = None;
    }

    fn text(&self) -> String {
        self.input.trim().to_string()
    }

    fn validate(&mut self) -> bool {
        self.error = match self.kind {
            FieldKind::Text => None,
            FieldKind::RequiredText if self.input.trim().is_empty() => {
                Some(format!("{} must not be empty.", self.label))
            }
            FieldKind::RequiredText => None,
            FieldKind::Count => parse_count(&self.input).err(),
        };
        self.error.is_none()
    }
}

/// Parse a non-negative whole number typed by the reader.
pub fn parse_count(input: &str) -> Result<u32, String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err("Please enter a number.".to_string());
    }
    if let Some(rest) = trimmed.strip_prefix('-') {
        if !rest.is_empty() && rest.chars().all(|ch| ch.is_ascii_digit()) {
            return Err("Negative numbers are not allowed. Please enter a non-negative number."
                .to_string());
        }
    }
    if !trimmed.chars().all(|ch| ch.is_ascii_digit()) {
        return Err("Invalid number. Please enter a whole number such as 3.".to_string());
    }
    trimmed
        .parse::<u32>()
        .map_err(|_| format!("Number is too large (maximum {}).", u32::MAX))
}

/// Which operation a form feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormKind {
    Welcome,
    Add,
    Search,
    Borrow,
    Return,
}

/// Validated values produced by a submitted form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    Welcome {
        name: String,
    },
    Add {
        title: String,
        author: String,
        publication_year: u32,
        copies: u32,
    },
    Search {
        query: String,
    },
    Borrow {
        title: String,
    },
    Return {
        title: String,
    },
}

#[derive(Debug, Clone)]
pub struct Form {
    pub kind: FormKind,
    pub fields: Vec<InputField>,
    pub focus: usize,
}

impl Form {
    pub fn new(kind: FormKind) -> Self {
        let fields = match kind {
            FormKind::Welcome => vec![InputField::new("Your name", FieldKind::Text)],
            FormKind::Add => vec![
                InputField::new("Book title", FieldKind::RequiredText),
                InputField::new("Author name", FieldKind::Text),
                InputField::new("Publication year", FieldKind::Count),
                InputField::new("Number of copies", FieldKind::Count),
            ],
            FormKind::Search => vec![InputField::new("Title to search", FieldKind::Text)],
            FormKind::Borrow => vec![InputField::new("Title to borrow", FieldKind::Text)],
            FormKind::Return => vec![InputField::new("Title to return", FieldKind::Text)],
        };
        Self {
            kind,
            fields,
            focus: 0,
        }
    }

    pub fn title(&self) -> &'static str {
        match self.kind {
            FormKind::Welcome => "Welcome",
            FormKind::Add => "Add a Book",
            FormKind::Search => "Search for a Book",
            FormKind::Borrow => "Borrow a Book",
            FormKind::Return => "Return a Book",
        }
    }

    pub fn focused(&self) -> &InputField {
        &self.fields[self.focus]
    }

    fn focused_mut(&mut self) -> &mut InputField {
        &mut self.fields[self.focus]
    }

    pub fn is_last_field(&self) -> bool {
        self.focus + 1 >= self.fields.len()
    }

    pub fn focus_next(&mut self) {
        self.focus = (self.focus + 1) % self.fields.len();
    }

    pub fn focus_prev(&mut self) {
        self.focus = (self.focus + self.fields.len() - 1) % self.fields.len();
    }

    pub fn move_cursor(&mut self, delta: isize) {
        self.focused_mut().move_cursor(delta);
    }

    pub fn move_home(&mut self) {
        self.focused_mut().move_home();
    }

    pub fn move_end(&mut self) {
        self.focused_mut().move_end();
    }

    pub fn insert(&mut self, ch: char) {
        self.focused_mut().insert(ch);
    }

    pub fn backspace(&mut self) {
        self.focused_mut().backspace();
    }

    pub fn delete(&mut self) {
        self.focused_mut().delete();
    }

    /// Validate every field. On failure the first invalid field takes focus
    /// and carries the error message.
    pub fn submit(&mut self) -> Option<Submission> {
        let mut first_invalid = None;
        for (idx, field) in self.fields.iter_mut().enumerate() {
            if !field.validate() && first_invalid.is_none() {
                first_invalid = Some(idx);
            }
        }
        if let Some(idx) = first_invalid {
            self.focus = idx;
            return None;
        }

        let text = |idx: usize| self.fields[idx].text();
        let count = |idx: usize| parse_count(&self.fields[idx].input).ok();
        let submission = match self.kind {
            FormKind::Welcome => Submission::Welcome { name: text(0) },
            FormKind::Add => Submission::Add {
                title: text(0),
                author: text(1),
                publication_year: count(2)?,
                copies: count(3)?,
            },
            FormKind::Search => Submission::Search { query: text(0) },
            FormKind::Borrow => Submission::Borrow { title: text(0) },
            FormKind::Return => Submission::Return { title: text(0) },
        };
        Some(submission)
    }

    pub fn first_error(&self) -> Option<&str> {
        self.fields.iter().find_map(|field| field.error.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn type_text(form: &mut Form, text: &str) {
        for ch in text.chars() {
            form.insert(ch);
        }
    }

    #[test]
    fn parse_count_accepts_non_negative_integers() {
        assert_eq!(parse_count("0"), Ok(0));
        assert_eq!(parse_count(" 1965 "), Ok(1965));
        assert!(parse_count("-3").unwrap_err().contains("Negative"));
        assert!(parse_count("abc").unwrap_err().contains("Invalid"));
        assert!(parse_count("1.5").unwrap_err().contains("Invalid"));
        assert!(parse_count("").is_err());
        assert!(parse_count("99999999999").unwrap_err().contains("too large"));
    }

    #[test]
    fn add_form_trims_text_and_parses_numbers() {
        let mut form = Form::new(FormKind::Add);
        type_text(&mut form, "  Dune ");
        form.focus_next();
        type_text(&mut form, "Frank Herbert");
        form.focus_next();
        type_text(&mut form, "1965");
        form.focus_next();
        type_text(&mut form, "2");

        assert_eq!(
            form.submit(),
            Some(Submission::Add {
                title: "Dune".to_string(),
                author: "Frank Herbert".to_string(),
                publication_year: 1965,
                copies: 2,
            })
        );
    }

    #[test]
    fn invalid_number_keeps_form_open_on_that_field() {
        let mut form = Form::new(FormKind::Add);
        type_text(&mut form, "Dune");
        form.focus = 2;
        type_text(&mut form, "-1");
        form.focus = 3;
        type_text(&mut form, "2");

        assert_eq!(form.submit(), None);
        assert_eq!(form.focus, 2);
        assert!(form.first_error().is_some());

        form.backspace();
        form.backspace();
        assert!(form.focused().error.is_none());
        type_text(&mut form, "1965");
        assert!(form.submit().is_some());
    }

    #[test]
    fn add_form_requires_a_title() {
        let mut form = Form::new(FormKind::Add);
        form.focus = 2;
        type_text(&mut form, "1965");
        form.focus = 3;
        type_text(&mut form, "1");
        assert_eq!(form.submit(), None);
        assert_eq!(form.focus, 0);
    }

    #[test]
    fn search_accepts_empty_query() {
        let mut form = Form::new(FormKind::Search);
        assert_eq!(
            form.submit(),
            Some(Submission::Search {
                query: String::new()
            })
        );
    }

    #[test]
    fn editing_handles_multibyte_characters() {
        let mut form = Form::new(FormKind::Borrow);
        type_text(&mut form, "Cien años");
        form.move_cursor(-1);
        form.backspace();
        form.move_home();
        form.delete();
        form.move_end();
        form.insert('!');
        assert_eq!(form.focused().input, "ien añs!");
        assert_eq!(form.focused().cursor, 8);
    }

    #[test]
    fn focus_wraps_around() {
        let mut form = Form::new(FormKind::Add);
        form.focus_prev();
        assert_eq!(form.focus, 3);
        assert!(form.is_last_field());
        form.focus_next();
        assert_eq!(form.focus, 0);
    }
}
