pub mod language_model;
pub mod version_control;

pub use language_model::LanguageModelService;
pub use version_control::VersionControlService;
