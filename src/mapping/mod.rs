//! Zuordnung logischer Rollen zu physischen Eingängen
//!
//! Ein [`MappingEntry`] sagt dem Normalizer, welcher Button oder welche Achse
//! eines bestimmten Controllers welche logische Rolle spielt. Mit dem Store
//! werden Einträge als `role:source,role:source,...` ausgetauscht:
//!
//! ```text
//! a:b0,b:b1,lefttrigger:+a2,dpup:-a7,leftx:a0
//! ```
//!
//! Auflösung einer Controller-Identität: exakter Vendor/Product-Schlüssel,
//! eingebaute Namensfragmente, der generische Last-Calibrated-Schlüssel,
//! sonst nichts (der Normalizer nimmt dann das Standardlayout).

pub mod error;
pub mod known_devices;
pub mod source;

pub use error::MappingError;
pub use source::{InputSource, Role, Sign};

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info, warn};

/// Schlüssel für Controller ohne Vendor/Product-Paar
pub const LAST_CALIBRATED_KEY: &str = "last-calibrated";

/// Form eines Mappings an der Persistenzgrenze
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingRecord {
    pub key: String,
    pub name: String,
    pub mapping: String,
}

/// Geparstes Mapping für einen Controller
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MappingEntry {
    pub key: String,
    pub name: String,
    bindings: BTreeMap<Role, InputSource>,
}

impl MappingEntry {
    pub fn new(key: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            name: name.into(),
            bindings: BTreeMap::new(),
        }
    }

    /// Parst einen Definitionsstring, ungültige Tokens werden übersprungen.
    pub fn parse(key: impl Into<String>, name: impl Into<String>, definition: &str) -> Self {
        let mut entry = Self::new(key, name);
        for token in definition.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            match parse_token(token) {
                Ok((role, source)) => {
                    if let Some(previous) = entry.bindings.insert(role, source) {
                        debug!(
                            "Role {} bound twice in '{}', {} replaced by {}",
                            role, entry.key, previous, source
                        );
                    }
                }
                Err(e) => warn!("Skipping mapping token in '{}': {}", entry.key, e),
            }
        }
        entry
    }

    pub fn from_record(record: &MappingRecord) -> Self {
        Self::parse(record.key.clone(), record.name.clone(), &record.mapping)
    }

    pub fn to_record(&self) -> MappingRecord {
        MappingRecord {
            key: self.key.clone(),
            name: self.name.clone(),
            mapping: self.definition(),
        }
    }

    /// Serialisiert die Belegung zurück in die Mapping-Grammatik, in Rollenreihenfolge.
    pub fn definition(&self) -> String {
        self.bindings
            .iter()
            .map(|(role, source)| format!("{}:{}", role, source))
            .collect::<Vec<_>>()
            .join(",")
    }

    pub fn bind(&mut self, role: Role, source: InputSource) {
        self.bindings.insert(role, source);
    }

    pub fn source(&self, role: Role) -> Option<&InputSource> {
        self.bindings.get(&role)
    }

    pub fn bindings(&self) -> impl Iterator<Item = (Role, &InputSource)> {
        self.bindings.iter().map(|(role, source)| (*role, source))
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

fn parse_token(token: &str) -> Result<(Role, InputSource), MappingError> {
    let (role, source) = token
        .split_once(':')
        .ok_or_else(|| MappingError::MissingSeparator(token.to_string()))?;
    Ok((role.trim().parse()?, source.trim().parse()?))
}

/// Extrahiert einen `vvvv-pppp`-Schlüssel aus Identitäten wie
/// `"Pad Name (Vendor: 045e Product: 028e)"`.
pub fn vendor_product_key(identity: &str) -> Option<String> {
    let lower = identity.to_ascii_lowercase();
    let vendor = hex_after(&lower, "vendor:")?;
    let product = hex_after(&lower, "product:")?;
    Some(format!("{}-{}", vendor, product))
}

fn hex_after(haystack: &str, label: &str) -> Option<String> {
    let start = haystack.find(label)? + label.len();
    let digits: String = haystack[start..]
        .trim_start()
        .chars()
        .take_while(char::is_ascii_hexdigit)
        .collect();
    (!digits.is_empty()).then_some(digits)
}

/// Schlüssel, unter dem ein frisch kalibriertes Mapping gespeichert wird.
pub fn best_key(identity: &str) -> String {
    vendor_product_key(identity).unwrap_or_else(|| LAST_CALIBRATED_KEY.to_string())
}

/// Alle bekannten Mappings nach Store-Schlüssel
///
/// Wird bei jeder Normalisierung gelesen und nur geschrieben, wenn eine
/// Kalibrierung fertig ist oder gespeicherte Einträge geladen werden.
#[derive(Clone, Debug)]
pub struct MappingTable {
    entries: HashMap<String, MappingEntry>,
    known_devices: Vec<(&'static str, MappingEntry)>,
}

impl Default for MappingTable {
    fn default() -> Self {
        Self::new()
    }
}

impl MappingTable {
    /// Tabelle mit den eingebauten Geräte-Layouts.
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            known_devices: known_devices::builtin(),
        }
    }

    /// Tabelle ohne eingebaute Layouts.
    pub fn empty() -> Self {
        Self {
            entries: HashMap::new(),
            known_devices: Vec::new(),
        }
    }

    pub fn insert(&mut self, entry: MappingEntry) {
        info!(
            "Storing mapping '{}' ({}) with {} bindings",
            entry.key,
            entry.name,
            entry.len()
        );
        self.entries.insert(entry.key.clone(), entry);
    }

    pub fn load_records<'a>(&mut self, records: impl IntoIterator<Item = &'a MappingRecord>) {
        for record in records {
            self.insert(MappingEntry::from_record(record));
        }
    }

    pub fn get(&self, key: &str) -> Option<&MappingEntry> {
        self.entries.get(key)
    }

    pub fn resolve(&self, identity: &str) -> Option<&MappingEntry> {
        if let Some(entry) = vendor_product_key(identity).and_then(|key| self.entries.get(&key)) {
            return Some(entry);
        }

        let lower = identity.to_lowercase();
        if let Some((_, entry)) = self
            .known_devices
            .iter()
            .find(|(fragment, _)| lower.contains(fragment))
        {
            return Some(entry);
        }

        self.entries.get(LAST_CALIBRATED_KEY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_skips_malformed_tokens() {
        let entry = MappingEntry::parse("k", "pad", "a:b0,guide:b8,b:q1,nocolon,x:b2,, y:b3 ");
        assert_eq!(entry.len(), 3);
        assert_eq!(entry.source(Role::A), Some(&InputSource::Button(0)));
        assert_eq!(entry.source(Role::B), None);
        assert_eq!(entry.source(Role::Y), Some(&InputSource::Button(3)));
    }

    #[test]
    fn definition_round_trips_through_parse() {
        let mut recorded = MappingEntry::new("045e-028e", "Pad");
        recorded.bind(Role::A, InputSource::Button(0));
        recorded.bind(Role::LeftTrigger, InputSource::positive(2));
        recorded.bind(Role::DPadUp, InputSource::negative(7));
        recorded.bind(Role::DPadDown, InputSource::positive(7));
        recorded.bind(Role::LeftX, InputSource::Axis(0));
        recorded.bind(Role::Back, InputSource::Hat { hat: 0, mask: 1 });

        let text = recorded.definition();
        let reparsed = MappingEntry::parse("045e-028e", "Pad", &text);
        for (role, source) in recorded.bindings() {
            assert_eq!(reparsed.source(role), Some(source), "role {}", role);
        }
        assert_eq!(reparsed, recorded);
    }

    #[test]
    fn definition_uses_grammar_tokens() {
        let mut entry = MappingEntry::new("k", "n");
        entry.bind(Role::DPadLeft, InputSource::negative(6));
        entry.bind(Role::A, InputSource::Button(1));
        assert_eq!(entry.definition(), "a:b1,dpleft:-a6");
    }

    #[test]
    fn extracts_vendor_product_key() {
        let identity = "Xbox Wireless Controller (STANDARD GAMEPAD Vendor: 045e Product: 02fd)";
        assert_eq!(vendor_product_key(identity), Some("045e-02fd".to_string()));
        assert_eq!(vendor_product_key("Generic USB Joystick"), None);
        assert_eq!(best_key("Generic USB Joystick"), LAST_CALIBRATED_KEY);
    }

    #[test]
    fn resolve_prefers_vendor_product_match() {
        let mut table = MappingTable::new();
        table.insert(MappingEntry::parse("045e-028e", "Mine", "a:b5"));
        table.insert(MappingEntry::parse(LAST_CALIBRATED_KEY, "Last", "a:b9"));

        let entry = table
            .resolve("Xbox 360 Controller (Vendor: 045e Product: 028e)")
            .map(|e| e.name.as_str());
        assert_eq!(entry, Some("Mine"));
    }

    #[test]
    fn resolve_falls_back_to_fragment_then_last_calibrated() {
        let mut table = MappingTable::new();
        let by_fragment = table.resolve("8BitDo SN30 Pro (Vendor: 2dc8 Product: 6101)");
        assert!(by_fragment.is_some());

        assert!(table.resolve("Mystery Pad").is_none());
        table.insert(MappingEntry::parse(LAST_CALIBRATED_KEY, "Last", "a:b9"));
        assert_eq!(
            table.resolve("Mystery Pad").map(|e| e.name.as_str()),
            Some("Last")
        );
    }

    #[test]
    fn xbox_wireless_controller_gets_xbox_layout() {
        let table = MappingTable::new();
        let xbox = table.resolve("Xbox Wireless Controller").map(|e| e.name.as_str());
        assert_eq!(xbox, Some("Xbox (XInput)"));

        let sony = table.resolve("Wireless Controller").map(|e| e.name.as_str());
        assert_eq!(sony, Some("Sony Wireless Controller"));
    }
}
