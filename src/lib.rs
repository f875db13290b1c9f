pub mod diagnostic;
pub mod error;
pub mod expr;
pub mod function;
pub mod instruments;
pub mod library;
pub mod plugin;
pub mod resolve;
pub mod section;
pub mod settings;
pub mod state;
pub mod token;
pub mod walker;

pub use diagnostic::{Diagnostic, DiagnosticKind, Position};
pub use error::*;
pub use library::{AnnotationSpec, ChordRule, Library, LibraryConfig};
pub use plugin::Plugin;
pub use section::{compile, SectionResult};
pub use settings::{Effects, Settings, SettingsOverride};
pub use state::NoteEvent;
pub use token::*;
pub use walker::{NotationMark, TrackResult};

/// Compile a YAML token tree with the default library.
/// This is the main entry point for the library.
pub fn compile_yaml(source: &str) -> Result<Vec<SectionResult>, WalkError> {
    let document = Document::from_yaml(source)?;
    let mut library = Library::default();
    compile(&document, &mut library)
}
