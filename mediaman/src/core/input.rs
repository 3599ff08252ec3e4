use std::fmt::Display;
use std::io;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum InputError {
    #[error("I/O failure: {0}")]
    Io(#[from] io::Error),

    #[error("Parse failure: {0}")]
    Parse(String),
}

impl InputError {
    /// Input is exhausted (stdin closed, script ran out).
    pub fn is_eof(&self) -> bool {
        matches!(self, InputError::Io(e) if e.kind() == io::ErrorKind::UnexpectedEof)
    }
}

/// Line-oriented input source; swapped for a scripted one in tests.
pub trait InputProvider {
    fn read_line(&mut self, prompt: &str) -> Result<String, InputError>;
}

pub struct InputHandler<I: InputProvider> {
    provider: I,
}

impl<I: InputProvider> InputHandler<I> {
    pub fn new(provider: I) -> Self {
        Self { provider }
    }

    pub fn get_string_trimmed(&mut self, prompt: &str) -> Result<String, InputError> {
        self.provider.read_line(prompt).map(|s| s.trim().to_string())
    }

    pub fn parse_trimmed<T>(&mut self, prompt: &str) -> Result<T, InputError>
    where
        T: FromStr,
        T::Err: Display,
    {
        let s = self.get_string_trimmed(prompt)?;
        s.parse::<T>().map_err(|e| InputError::Parse(e.to_string()))
    }

    /// Picks a 1-based entry out of `len` choices; 0 or bad input cancels.
    pub fn choose(&mut self, prompt: &str, len: usize) -> Result<Option<usize>, InputError> {
        match self.parse_trimmed::<usize>(prompt) {
            Ok(v) if v >= 1 && v <= len => Ok(Some(v - 1)),
            Ok(_) | Err(InputError::Parse(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }
}
