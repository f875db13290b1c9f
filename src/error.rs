//! # Error Types
//!
//! Fatal errors for the walker. Everything that can go wrong with the notation
//! itself is reported as a [`Diagnostic`](crate::diagnostic::Diagnostic) and the
//! walk continues; the variants here stop a compilation outright.
//!
//! ## Error Types
//! - `UndefinedTrack` - a macrotrack token names a track that was never defined
//! - `Document` - a YAML token tree or library config failed to deserialize
//! - `Settings` - a settings record failed range validation
//! - `Argument` - a function was called with arguments it cannot use
//!
//! ## Usage
//! ```rust
//! use scorewalk::{compile, Document, Library, WalkError};
//!
//! let document = Document::from_yaml("sections: []").unwrap();
//! let mut library = Library::default();
//! match compile(&document, &mut library) {
//!     Ok(sections) => println!("{} sections", sections.len()),
//!     Err(WalkError::UndefinedTrack { name, bar, index }) => {
//!         eprintln!("no track named {} (bar {}, token {})", name, bar, index);
//!     }
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

use thiserror::Error;

#[derive(Error, Debug)]
pub enum WalkError {
    /// A macrotrack reference to a track name that is not in the named-track table.
    ///
    /// # Example
    /// ```
    /// # use scorewalk::WalkError;
    /// let err = WalkError::UndefinedTrack {
    ///     name: "Chorus".to_string(),
    ///     bar: 3,
    ///     index: 7,
    /// };
    /// assert_eq!(err.to_string(), "Undefined track 'Chorus' at bar 3, token 7");
    /// ```
    #[error("Undefined track '{name}' at bar {bar}, token {index}")]
    UndefinedTrack {
        name: String,
        bar: usize,
        index: usize,
    },

    /// The serialized token tree or library configuration could not be read.
    #[error("Invalid document: {0}")]
    Document(#[from] serde_yaml::Error),

    /// A setting value was out of range.
    ///
    /// # Example
    /// ```
    /// # use scorewalk::WalkError;
    /// let err = WalkError::Settings {
    ///     key: "speed".to_string(),
    ///     message: "must be positive".to_string(),
    /// };
    /// assert_eq!(err.to_string(), "Invalid setting 'speed': must be positive");
    /// ```
    #[error("Invalid setting '{key}': {message}")]
    Settings { key: String, message: String },

    /// A function received the wrong kind or number of arguments.
    ///
    /// Inside a walk this is downgraded to a diagnostic on the calling token.
    #[error("Invalid argument for '{function}': {message}")]
    Argument { function: String, message: String },
}

impl WalkError {
    pub(crate) fn setting(key: &str, message: impl Into<String>) -> Self {
        WalkError::Settings {
            key: key.to_string(),
            message: message.into(),
        }
    }

    pub(crate) fn argument(function: &str, message: impl Into<String>) -> Self {
        WalkError::Argument {
            function: function.to_string(),
            message: message.into(),
        }
    }
}
