use std::io::{self, Write};

use crate::error::{EnrichmentError, Result};

/// Interactive prompts for invocation parameters not supplied as flags. This
/// is the only place user input is collected; the engine and readers take
/// already-resolved values.

pub fn prompt_source() -> Result<String> {
    let value = read_line("Please enter the file path or link for the data source: ")?;
    if value.is_empty() {
        return Err(EnrichmentError::Config(
            "a source path or URL is required".to_string(),
        ));
    }
    Ok(value)
}

pub fn prompt_date_column() -> Result<String> {
    let value = read_line("Enter the column name of the raw date column in your dataset: ")?;
    if value.is_empty() {
        return Err(EnrichmentError::Config(
            "a date column name is required".to_string(),
        ));
    }
    Ok(value)
}

/// Table to read from a SQLite source. Empty input falls back to the first
/// user table in the database.
pub fn prompt_table_name(source: &str) -> Result<Option<String>> {
    let value = read_line(&format!(
        "Enter the table name to read from {} [first table]: ",
        source
    ))?;

    if value.is_empty() {
        Ok(None)
    } else {
        Ok(Some(value))
    }
}

fn read_line(prompt: &str) -> Result<String> {
    print!("{}", prompt);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;

    Ok(input.trim().to_string())
}
