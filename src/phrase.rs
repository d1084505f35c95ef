//! Secret phrase reading.

use std::env;
use std::io::{self, IsTerminal, Write};

use zeroize::Zeroizing;

use crate::error::{CeloError, ErrorKind, Result};

/// Trait for reading secret phrases from various sources.
pub trait PhraseReader {
    /// Read a phrase as arbitrary bytes.
    ///
    /// Returns the phrase wrapped in `Zeroizing` to ensure it is securely
    /// wiped from memory when dropped.
    fn read_phrase(&mut self) -> Result<Zeroizing<Vec<u8>>>;
}

/// Returns a fixed phrase (for testing).
pub struct ConstantPhraseReader {
    phrase: Zeroizing<Vec<u8>>,
}

impl ConstantPhraseReader {
    pub fn new(phrase: Vec<u8>) -> Self {
        Self {
            phrase: Zeroizing::new(phrase),
        }
    }
}

impl PhraseReader for ConstantPhraseReader {
    fn read_phrase(&mut self) -> Result<Zeroizing<Vec<u8>>> {
        Ok(Zeroizing::new((*self.phrase).clone()))
    }
}

/// Reads the phrase from an environment variable.
///
/// An unset or empty variable is an error rather than a silent empty phrase.
pub struct EnvPhraseReader {
    var: String,
}

impl EnvPhraseReader {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl PhraseReader for EnvPhraseReader {
    fn read_phrase(&mut self) -> Result<Zeroizing<Vec<u8>>> {
        match env::var(&self.var) {
            Ok(value) if !value.is_empty() => Ok(Zeroizing::new(value.into_bytes())),
            _ => Err(CeloError::with_detail(
                ErrorKind::PhraseUnavailable,
                "phrase.read_env",
                format!("environment variable {} is unset or empty", self.var),
            )),
        }
    }
}

/// Reads the phrase from the terminal with no echo, optionally asking for a
/// confirmation entry.
pub struct TerminalPhraseReader {
    confirm: bool,
    retries: u32,
}

impl TerminalPhraseReader {
    /// With `confirm` set, the phrase is requested twice and both entries
    /// must match; empty phrases are rejected. Up to three attempts.
    pub fn new(confirm: bool) -> Self {
        Self {
            confirm,
            retries: 3,
        }
    }
}

impl PhraseReader for TerminalPhraseReader {
    /// Note: terminal input is limited to UTF-8 by the rpassword library.
    fn read_phrase(&mut self) -> Result<Zeroizing<Vec<u8>>> {
        let op = "phrase.read_terminal";

        if !io::stdin().is_terminal() {
            return Err(CeloError::with_detail(
                ErrorKind::PhraseUnavailable,
                op,
                "cannot read phrase from terminal - stdin is not a terminal",
            ));
        }

        if !self.confirm {
            return prompt("Enter Phrase: ");
        }

        for attempt in 1..=self.retries {
            let first = prompt("Enter Phrase: ")?;

            if first.is_empty() {
                if attempt < self.retries {
                    // Count it as a try and ask again.
                    eprintln!("{}", ErrorKind::PhraseEmpty);
                    continue;
                }
                return Err(CeloError::new(ErrorKind::PhraseEmpty, op));
            }

            let second = prompt("Confirm Phrase: ")?;
            if first == second {
                return Ok(first);
            }

            if attempt < self.retries {
                eprintln!("{}", ErrorKind::PhraseMismatch);
            }
        }

        Err(CeloError::new(ErrorKind::PhraseMismatch, op))
    }
}

/// Writes the label to stderr and reads a line without echoing it.
fn prompt(label: &str) -> Result<Zeroizing<Vec<u8>>> {
    let op = "phrase.prompt";

    let mut stderr = io::stderr();
    stderr
        .write_all(label.as_bytes())
        .map_err(|e| CeloError::with_source(ErrorKind::Io, op, e))?;
    stderr
        .flush()
        .map_err(|e| CeloError::with_source(ErrorKind::Io, op, e))?;

    // rpassword returns a String (UTF-8 only), not zeroized.
    let phrase = rpassword::read_password()
        .map_err(|e| CeloError::with_source(ErrorKind::PhraseUnavailable, op, e))?;

    Ok(Zeroizing::new(phrase.into_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_reader_repeats_phrase() {
        let mut reader = ConstantPhraseReader::new(b"fixed phrase".to_vec());

        assert_eq!(&*reader.read_phrase().unwrap(), b"fixed phrase");
        assert_eq!(&*reader.read_phrase().unwrap(), b"fixed phrase");
    }

    #[test]
    fn env_reader_fails_on_unset_variable() {
        let mut reader = EnvPhraseReader::new("CELO_TEST_PHRASE_THAT_IS_NEVER_SET");

        let err = reader.read_phrase().expect_err("expected unavailable error");
        assert_eq!(err.kind, ErrorKind::PhraseUnavailable);
    }

    /// Tests the terminal reader. This is ignored by default and must be run
    /// explicitly and with human input:
    ///
    /// cargo test terminal_reader_interactive -- --ignored --nocapture
    #[test]
    #[ignore]
    fn terminal_reader_interactive() {
        let mut reader = TerminalPhraseReader::new(false);
        println!("\nPlease enter a test phrase:");
        let phrase = reader.read_phrase().unwrap();
        assert!(!phrase.is_empty(), "expected non-empty phrase");
    }
}
