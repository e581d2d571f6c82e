//! Input acquisition for commands that prompt before expansion.
//!
//! The dispatcher only sees [`InputSource`]; the terminal prompt lives in
//! `ui::prompt` and tests use [`ArgumentInput`]. [`ChainedInput`] lets a
//! positional argument answer before the terminal is asked.

use crate::error::{DjmakeError, Result};
use crate::registry::Prompt;
use std::collections::VecDeque;

pub trait InputSource {
    /// Returns the answer, or `None` when this source cannot supply one.
    fn request(&mut self, prompt: &Prompt) -> Result<Option<String>>;
}

/// Answers prompts from pre-supplied values, in order.
#[derive(Debug, Default)]
pub struct ArgumentInput {
    values: VecDeque<String>,
}

impl ArgumentInput {
    pub fn new<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }
}

impl InputSource for ArgumentInput {
    fn request(&mut self, _prompt: &Prompt) -> Result<Option<String>> {
        Ok(self.values.pop_front())
    }
}

/// Asks each source in turn until one answers.
pub struct ChainedInput<'a> {
    sources: Vec<&'a mut dyn InputSource>,
}

impl<'a> ChainedInput<'a> {
    pub fn new(sources: Vec<&'a mut dyn InputSource>) -> Self {
        Self { sources }
    }
}

impl InputSource for ChainedInput<'_> {
    fn request(&mut self, prompt: &Prompt) -> Result<Option<String>> {
        for source in self.sources.iter_mut() {
            if let Some(answer) = source.request(prompt)? {
                return Ok(Some(answer));
            }
        }
        Ok(None)
    }
}

/// Obtains a non-blank answer or fails with `MissingInput`.
pub fn require(source: &mut dyn InputSource, prompt: &Prompt) -> Result<String> {
    match source.request(prompt)? {
        Some(value) if !value.trim().is_empty() => Ok(value.trim().to_string()),
        _ => Err(DjmakeError::MissingInput(prompt.label.to_string())),
    }
}
