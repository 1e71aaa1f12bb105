//! Domain identifier types with validation
//!
//! Newtype wrappers for the identifiers the platform hands out. Each type
//! validates its format on construction so adapters never build URLs from
//! malformed input.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Instance identifier
///
/// Instances are addressed by the owning party and a GUID, rendered as
/// `{partyId}/{instanceGuid}`.
///
/// # Examples
///
/// ```
/// use archivelink::domain::ids::InstanceIdentifier;
/// use std::str::FromStr;
///
/// let id = InstanceIdentifier::from_str("50001337/a4f1c8a4-2d6b-4e0b-8d4b-2b1f2a6f0c11").unwrap();
/// assert_eq!(id.party_id(), 50001337);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InstanceIdentifier {
    party_id: u64,
    instance_guid: Uuid,
}

impl InstanceIdentifier {
    /// Creates a new InstanceIdentifier from its parts
    pub fn new(party_id: u64, instance_guid: Uuid) -> Self {
        Self {
            party_id,
            instance_guid,
        }
    }

    /// Extracts the identifier from an instance URL
    ///
    /// The URL must contain `instances/{partyId}/{guid}` somewhere in its path.
    pub fn from_url(url: &str) -> Result<Self, String> {
        let parsed = url::Url::parse(url).map_err(|e| format!("Invalid instance URL '{url}': {e}"))?;
        let segments: Vec<&str> = parsed
            .path_segments()
            .map(|s| s.filter(|seg| !seg.is_empty()).collect())
            .unwrap_or_default();

        segments
            .windows(3)
            .rev()
            .find(|w| w[0] == "instances")
            .ok_or_else(|| format!("Instance URL '{url}' does not contain an instance path"))
            .and_then(|w| Self::from_str(&format!("{}/{}", w[1], w[2])))
    }

    /// Party that owns the instance
    pub fn party_id(&self) -> u64 {
        self.party_id
    }

    /// Instance GUID
    pub fn instance_guid(&self) -> Uuid {
        self.instance_guid
    }
}

impl fmt::Display for InstanceIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.party_id, self.instance_guid)
    }
}

impl FromStr for InstanceIdentifier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (party, guid) = s
            .trim()
            .split_once('/')
            .ok_or_else(|| format!("Invalid instance id '{s}'. Expected format: {{partyId}}/{{guid}}"))?;

        let party_id = party
            .parse::<u64>()
            .map_err(|_| format!("Invalid party id '{party}' in instance id '{s}'"))?;
        let instance_guid = Uuid::parse_str(guid)
            .map_err(|_| format!("Invalid instance guid '{guid}' in instance id '{s}'"))?;

        Ok(Self::new(party_id, instance_guid))
    }
}

impl Serialize for InstanceIdentifier {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for InstanceIdentifier {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_str(&s).map_err(serde::de::Error::custom)
    }
}

/// Application identifier in `{org}/{app}` form
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AppId {
    org: String,
    app: String,
}

impl AppId {
    /// Creates a new AppId from a string
    pub fn new(id: impl Into<String>) -> Result<Self, String> {
        let id = id.into();
        match id.split_once('/') {
            Some((org, app)) if !org.is_empty() && !app.is_empty() && !app.contains('/') => {
                Ok(Self {
                    org: org.to_string(),
                    app: app.to_string(),
                })
            }
            _ => Err(format!("Invalid app id '{id}'. Expected format: {{org}}/{{app}}")),
        }
    }

    /// Service owner short code
    pub fn org(&self) -> &str {
        &self.org
    }

    /// Application name
    pub fn app(&self) -> &str {
        &self.app
    }
}

impl fmt::Display for AppId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.org, self.app)
    }
}

impl FromStr for AppId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for AppId {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<AppId> for String {
    fn from(value: AppId) -> Self {
        value.to_string()
    }
}
