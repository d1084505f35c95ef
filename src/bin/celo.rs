use std::path::PathBuf;

use clap::{Parser, Subcommand};
use zeroize::Zeroizing;

use celo::phrase::{EnvPhraseReader, PhraseReader, TerminalPhraseReader};
use celo::{Config, Decrypter, Encrypter, Result, file_ops};

#[derive(Parser, Debug)]
#[command(
    name = "celo",
    version,
    about = "Encrypts and decrypts files through a user-defined secret phrase"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Encrypt file(s) using a secret phrase
    #[command(alias = "e")]
    Encrypt {
        /// File names or glob patterns to encrypt
        #[arg(required = true, value_name = "FILE|PATTERN")]
        sources: Vec<String>,
        /// Exclude a file name or glob pattern from encryption
        #[arg(long, default_value = "*.celo", value_name = "PATTERN")]
        exclude: String,
        /// Overwrite an existing file with the same name
        #[arg(long)]
        overwrite: bool,
        /// Remove the source file when the operation finishes successfully
        #[arg(long = "rm-source")]
        remove_source: bool,
        /// Custom file extension for encrypted files
        #[arg(long, default_value = celo::config::DEFAULT_EXTENSION, value_name = "EXTENSION")]
        ext: String,
        /// Name of the environment variable containing the secret phrase
        #[arg(long = "phrase-env", value_name = "VAR")]
        phrase_env: Option<String>,
        /// Skip phrase confirmation; ask for the secret phrase only once
        #[arg(long = "no-confirm")]
        no_confirm: bool,
    },
    /// Decrypt file(s) using the exact same secret phrase used to encrypt
    #[command(alias = "d")]
    Decrypt {
        /// File names or glob patterns to decrypt
        #[arg(required = true, value_name = "FILE|PATTERN")]
        sources: Vec<String>,
        /// Exclude a file name or glob pattern from decryption
        #[arg(long, value_name = "PATTERN")]
        exclude: Option<String>,
        /// Overwrite an existing file with the same name
        #[arg(long)]
        overwrite: bool,
        /// Remove the encrypted file when the operation finishes successfully
        #[arg(long = "rm-source")]
        remove_source: bool,
        /// Name of the environment variable containing the secret phrase
        #[arg(long = "phrase-env", value_name = "VAR")]
        phrase_env: Option<String>,
    },
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Encrypt {
            sources,
            exclude,
            overwrite,
            remove_source,
            ext,
            phrase_env,
            no_confirm,
        } => encrypt(
            &sources,
            &exclude,
            overwrite,
            remove_source,
            ext,
            phrase_env.as_deref(),
            no_confirm,
        ),
        Commands::Decrypt {
            sources,
            exclude,
            overwrite,
            remove_source,
            phrase_env,
        } => decrypt(
            &sources,
            exclude.as_deref(),
            overwrite,
            remove_source,
            phrase_env.as_deref(),
        ),
    };

    if let Err(err) = result {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn encrypt(
    sources: &[String],
    exclude: &str,
    overwrite: bool,
    remove_source: bool,
    ext: String,
    phrase_env: Option<&str>,
    no_confirm: bool,
) -> Result<()> {
    let matches = expand_sources(sources, Some(exclude))?;
    print!("{}", format_matches(&matches));

    if matches.is_empty() {
        return Ok(());
    }

    let phrase = read_phrase(phrase_env, !no_confirm)?;

    let config = Config {
        extension: ext,
        ..Config::default()
    };
    let mut encrypter = Encrypter::with_config(config)?;

    if matches.len() == 1 {
        // Error handling is stricter when encrypting a single file: the
        // error stops execution and fails the process.
        let name = encrypter.encrypt_file(&phrase, &matches[0], overwrite, remove_source)?;
        print!("{}", format_outcomes(&[Ok(name)], "encrypted", "Encrypted Files:"));
        return Ok(());
    }

    // For multiple files each failure is isolated and only counted in the
    // summary; the process still finishes successfully.
    let results = encrypter.encrypt_files(&phrase, &matches, overwrite, remove_source);
    report_failures(&results);
    print!("{}", format_outcomes(&results, "encrypted", "Encrypted Files:"));

    Ok(())
}

fn decrypt(
    sources: &[String],
    exclude: Option<&str>,
    overwrite: bool,
    remove_source: bool,
    phrase_env: Option<&str>,
) -> Result<()> {
    let matches = expand_sources(sources, exclude)?;
    print!("{}", format_matches(&matches));

    if matches.is_empty() {
        return Ok(());
    }

    let phrase = read_phrase(phrase_env, false)?;

    let mut decrypter = Decrypter::new();

    if matches.len() == 1 {
        let name = decrypter.decrypt_file(&phrase, &matches[0], overwrite, remove_source)?;
        print!("{}", format_outcomes(&[Ok(name)], "decrypted", "Decrypted Files:"));
        return Ok(());
    }

    let results = decrypter.decrypt_files(&phrase, &matches, overwrite, remove_source);
    report_failures(&results);
    print!("{}", format_outcomes(&results, "decrypted", "Decrypted Files:"));

    Ok(())
}

/// Expands every source pattern and concatenates the matches.
///
/// Unix shells usually expand globs before the program sees them; expanding
/// again still applies the exclusion pattern and drops directories either
/// way.
fn expand_sources(sources: &[String], exclude: Option<&str>) -> Result<Vec<PathBuf>> {
    let mut matches = Vec::new();
    for pattern in sources {
        matches.extend(file_ops::glob_files(pattern, exclude)?);
    }
    Ok(matches)
}

fn read_phrase(phrase_env: Option<&str>, confirm: bool) -> Result<Zeroizing<Vec<u8>>> {
    let mut reader: Box<dyn PhraseReader> = match phrase_env {
        Some(var) => Box::new(EnvPhraseReader::new(var)),
        None => Box::new(TerminalPhraseReader::new(confirm)),
    };
    reader.read_phrase()
}

fn report_failures(results: &[Result<PathBuf>]) {
    for err in results.iter().filter_map(|r| r.as_ref().err()) {
        eprintln!("{err}");
    }
}

fn format_matches(matches: &[PathBuf]) -> String {
    let mut out = format!("{} file(s) matching criteria\n", matches.len());
    for m in matches {
        out.push_str(&format!("  {}\n", m.display()));
    }
    out
}

fn format_outcomes(results: &[Result<PathBuf>], verb: &str, heading: &str) -> String {
    let succeeded: Vec<&PathBuf> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
    let failed = results.len() - succeeded.len();

    let mut out = format!("{} file(s) {verb}. ({failed} failed)\n", succeeded.len());
    if succeeded.is_empty() {
        return out;
    }

    out.push_str(&format!("\n{heading}\n"));
    for name in succeeded {
        out.push_str(&format!("  {}\n", name.display()));
    }
    out
}
