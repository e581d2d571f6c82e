use crate::error::Result;
use crate::input::InputSource;
use crate::registry::Prompt;
use dialoguer::{theme::ColorfulTheme, Input};

/// Asks on the controlling terminal.
pub struct TerminalInput {
    theme: ColorfulTheme,
}

impl TerminalInput {
    pub fn new() -> Self {
        Self {
            theme: ColorfulTheme::default(),
        }
    }
}

impl Default for TerminalInput {
    fn default() -> Self {
        Self::new()
    }
}

impl InputSource for TerminalInput {
    fn request(&mut self, prompt: &Prompt) -> Result<Option<String>> {
        let answer: String = Input::with_theme(&self.theme)
            .with_prompt(prompt.label)
            .allow_empty(true)
            .interact_text()
            .map_err(|dialoguer::Error::IO(e)| e)?;
        Ok(Some(answer))
    }
}
