/// What tapping a button does.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ButtonAction {
    /// Encoded callback data (see `callback::encode`).
    Callback(String),
    /// Opens the mini-app at this URL inside Telegram.
    WebApp(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyboardButton {
    pub label: String,
    pub action: ButtonAction,
}

impl KeyboardButton {
    pub fn callback(label: impl Into<String>, data: String) -> Self {
        Self {
            label: label.into(),
            action: ButtonAction::Callback(data),
        }
    }

    pub fn web_app(label: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            action: ButtonAction::WebApp(url.into()),
        }
    }
}

/// Inline keyboard attached to a reply.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Keyboard {
    pub rows: Vec<Vec<KeyboardButton>>,
}

impl Keyboard {
    pub fn new(rows: Vec<Vec<KeyboardButton>>) -> Self {
        Self { rows }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.iter().all(|r| r.is_empty())
    }

    /// All callback payloads, row-major. Handy for tests and logging.
    pub fn callback_data(&self) -> Vec<&str> {
        self.rows
            .iter()
            .flatten()
            .filter_map(|b| match &b.action {
                ButtonAction::Callback(data) => Some(data.as_str()),
                _ => None,
            })
            .collect()
    }
}
