//! Session state shared by the encryption and decryption pipelines.

use std::path::{Path, PathBuf};

use crate::cipher::Cipher;
use crate::config::Config;

/// Mutable state driven by [`Encrypter`](crate::Encrypter) and
/// [`Decrypter`](crate::Decrypter). Each pipeline owns its session by value;
/// nothing is shared, which is also why a session must not be used from
/// concurrent operations without external synchronization.
pub(crate) struct Session {
    pub(crate) config: Config,
    pub(crate) salt: Option<Vec<u8>>,
    pub(crate) nonce: Option<Vec<u8>>,
    pub(crate) ciphertext: Option<Vec<u8>>,
    /// Cipher kept around so one key can serve multiple files.
    pub(crate) cipher: Option<Cipher>,
    /// Whether the session is ready for its encrypt/decrypt step.
    pub(crate) initialized: bool,
}

impl Session {
    pub(crate) fn new(config: Config) -> Self {
        Self {
            config,
            salt: None,
            nonce: None,
            ciphertext: None,
            cipher: None,
            initialized: false,
        }
    }

    pub(crate) fn is_ready(&self) -> bool {
        self.initialized
    }

    /// Drops stored values and marks the session as not initialized.
    ///
    /// Configured sizes and the extension survive, so the session can be
    /// reused with a fresh salt and key without being rebuilt.
    pub(crate) fn wipe(&mut self) {
        self.nonce = None;
        self.ciphertext = None;

        // A new salt will be generated the next time this session is
        // initialized, which makes the derived key change as well.
        self.salt = None;
        // Since the salt will change, the cached cipher is no longer valid.
        self.cipher = None;

        self.initialized = false;
    }

    /// The configured extension with a leading dot, or `None` when file
    /// names are left untouched.
    fn dotted_extension(&self) -> Option<String> {
        let ext = &self.config.extension;
        if ext.is_empty() {
            return None;
        }

        if ext.starts_with('.') {
            Some(ext.clone())
        } else {
            Some(format!(".{ext}"))
        }
    }

    /// The name a file gets after encryption: the original name with the
    /// configured extension appended.
    pub(crate) fn encrypted_name(&self, path: &Path) -> PathBuf {
        let Some(ext) = self.dotted_extension() else {
            return path.to_path_buf();
        };

        let mut name = path.as_os_str().to_os_string();
        name.push(ext);
        PathBuf::from(name)
    }

    /// The name a file gets after decryption: the configured extension is
    /// stripped only when the name ends with it and the name is not the
    /// extension itself.
    pub(crate) fn decrypted_name(&self, path: &Path) -> PathBuf {
        let Some(ext) = self.dotted_extension() else {
            return path.to_path_buf();
        };

        // Suffix handling needs string semantics; non-UTF-8 names are
        // returned unchanged.
        let Some(name) = path.to_str() else {
            return path.to_path_buf();
        };

        if name.ends_with(&ext) && name != ext {
            PathBuf::from(&name[..name.len() - ext.len()])
        } else {
            path.to_path_buf()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> Session {
        Session::new(Config::default())
    }

    #[test]
    fn encrypted_name_appends_extension() {
        assert_eq!(
            session().encrypted_name(Path::new("book_draft.md")),
            PathBuf::from("book_draft.md.celo")
        );
    }

    #[test]
    fn encrypted_name_enforces_leading_dot() {
        let mut s = session();
        s.config.extension = "vault".to_string();
        assert_eq!(
            s.encrypted_name(Path::new("notes.txt")),
            PathBuf::from("notes.txt.vault")
        );

        s.config.extension = ".vault".to_string();
        assert_eq!(
            s.encrypted_name(Path::new("notes.txt")),
            PathBuf::from("notes.txt.vault")
        );
    }

    #[test]
    fn empty_extension_keeps_names() {
        let mut s = session();
        s.config.extension = String::new();

        assert_eq!(
            s.encrypted_name(Path::new("notes.txt")),
            PathBuf::from("notes.txt")
        );
        assert_eq!(
            s.decrypted_name(Path::new("notes.txt")),
            PathBuf::from("notes.txt")
        );
    }

    #[test]
    fn decrypted_name_strips_extension() {
        assert_eq!(
            session().decrypted_name(Path::new("book_draft.md.celo")),
            PathBuf::from("book_draft.md")
        );
    }

    #[test]
    fn decrypted_name_without_extension_is_unchanged() {
        assert_eq!(
            session().decrypted_name(Path::new("celo")),
            PathBuf::from("celo")
        );
    }

    #[test]
    fn decrypted_name_equal_to_extension_is_unchanged() {
        // A file literally named ".celo" keeps its name instead of being
        // stripped down to nothing.
        assert_eq!(
            session().decrypted_name(Path::new(".celo")),
            PathBuf::from(".celo")
        );
    }

    #[test]
    fn wipe_clears_state_but_keeps_config() {
        let mut s = session();
        s.salt = Some(vec![1; 32]);
        s.nonce = Some(vec![2; 12]);
        s.ciphertext = Some(vec![3; 64]);
        s.initialized = true;

        s.wipe();

        assert!(s.salt.is_none());
        assert!(s.nonce.is_none());
        assert!(s.ciphertext.is_none());
        assert!(s.cipher.is_none());
        assert!(!s.is_ready());
        assert_eq!(s.config, Config::default());
    }
}
