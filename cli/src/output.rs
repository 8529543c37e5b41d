use std::fmt::Display;

use serde::Serialize;

/// Prints results either for humans or as JSON.
pub struct Output {
    json: bool,
}

impl Output {
    pub fn new(json: bool) -> Self {
        Self { json }
    }

    /// Prints the value; `plain` is used unless JSON was requested.
    pub fn print<T>(&self, value: &T, plain: impl Display) -> serde_json::Result<()>
    where
        T: Serialize + ?Sized,
    {
        match self.json {
            true => println!("{}", serde_json::to_string_pretty(value)?),
            _ => println!("{}", plain),
        }

        Ok(())
    }
}
