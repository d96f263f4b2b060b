use serde::Serialize;

/// What the transport should do with the quick-reply keyboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Keyboard {
    Keep,
    Buttons { rows: Vec<Vec<String>> },
    Remove,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reply {
    pub text: String,
    pub keyboard: Keyboard,
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            keyboard: Keyboard::Keep,
        }
    }

    pub fn with_buttons<R, B>(mut self, rows: R) -> Self
    where
        R: IntoIterator<Item = B>,
        B: IntoIterator,
        B::Item: Into<String>,
    {
        let rows = rows
            .into_iter()
            .map(|row| row.into_iter().map(Into::into).collect())
            .collect();
        self.keyboard = Keyboard::Buttons { rows };
        self
    }

    pub fn remove_keyboard(mut self) -> Self {
        self.keyboard = Keyboard::Remove;
        self
    }
}
