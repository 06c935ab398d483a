//! Fehlerdefinitionen für das Mapping-Modul

use thiserror::Error;

/// Fehler beim Parsen eines einzelnen `role:source`-Tokens
///
/// Verlassen nie das Parsen eines ganzen Eintrags: das Token wird geloggt und
/// übersprungen, die Rolle fällt auf das Standardlayout zurück.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MappingError {
    /// Token ohne `:` zwischen Rolle und Quelle
    #[error("Missing ':' separator in token '{0}'")]
    MissingSeparator(String),

    /// Rollenname gehört nicht zum festen Vokabular
    #[error("Unknown role: {0}")]
    UnknownRole(String),

    /// Quelle passt weder auf `bN`, `aN`, `+aN`, `-aN` noch `hN.M`
    #[error("Invalid source: {0}")]
    InvalidSource(String),
}
