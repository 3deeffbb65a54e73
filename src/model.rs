use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use tracing::warn;

use crate::backend::MediaStore;
use crate::error::ViewError;

/// Fallback values for absent fields, applied only at render time.
pub mod defaults {
    pub const MISSING_TEXT: &str = "-";
    pub const PLACEHOLDER_IMAGE: &str = "placeholder.jpg";
    pub const VERIFIED_TICK: &str = "assets/tick.png";
    pub const BUSINESS_TYPE: &str = "Artisan";
    pub const ESTABLISHED: &str = "N/A";

    /// `value` when present, `-` otherwise.
    pub fn text(value: Option<&str>) -> &str {
        value.unwrap_or(MISSING_TEXT)
    }
}

/// Lifecycle state of a record.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Status {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Pending => "Pending",
            Status::Approved => "Approved",
            Status::Rejected => "Rejected",
        }
    }

    /// CSS class of the status badge.
    pub fn css_class(&self) -> &'static str {
        match self {
            Status::Pending => "status-pending",
            Status::Approved => "status-approved",
            Status::Rejected => "status-rejected",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Status::Pending),
            "approved" => Ok(Status::Approved),
            "rejected" => Ok(Status::Rejected),
            other => Err(format!("unknown status '{}'", other)),
        }
    }
}

/// Fetch scope of a list view.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StatusFilter {
    #[default]
    All,
    Only(Status),
}

impl StatusFilter {
    pub fn status(&self) -> Option<Status> {
        match self {
            StatusFilter::All => None,
            StatusFilter::Only(s) => Some(*s),
        }
    }
}

impl FromStr for StatusFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            return Ok(StatusFilter::All);
        }
        s.parse().map(StatusFilter::Only)
    }
}

/// A row the list view can hold, filter and render.
pub trait ListRecord: Clone + fmt::Debug + Send + Sync + DeserializeOwned + 'static {
    /// Singular noun used in notifications ("Artisan successfully approved.").
    const NOUN: &'static str;

    /// Column holding the identifier in the backing table.
    const ID_COLUMN: &'static str;

    fn id(&self) -> &str;

    fn name(&self) -> Option<&str>;

    /// Region-equivalent field: searchable, and required by the "has region" filter.
    fn region(&self) -> Option<&str>;

    /// Stored status; `None` renders as [`Status::Pending`].
    fn stored_status(&self) -> Option<Status> {
        None
    }

    fn status(&self) -> Status {
        self.stored_status().unwrap_or_default()
    }

    /// Resolve derived fields right after a fetch.
    fn enrich(&mut self, _media: &dyn MediaStore) {}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artisan {
    #[serde(deserialize_with = "de_id")]
    pub artisan_id: String,
    #[serde(default, deserialize_with = "de_opt_text")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "de_opt_text")]
    pub craft: Option<String>,
    #[serde(default, deserialize_with = "de_opt_text")]
    pub place: Option<String>,
    #[serde(default, deserialize_with = "de_opt_text")]
    pub phone: Option<String>,
    #[serde(default, deserialize_with = "de_opt_text")]
    pub aadhaar_last4: Option<String>,
    #[serde(default, deserialize_with = "de_opt_status")]
    pub status: Option<Status>,
    #[serde(default, deserialize_with = "de_opt_text")]
    pub lineage: Option<String>,
    #[serde(default, deserialize_with = "de_opt_text")]
    pub awards: Option<String>,
    #[serde(default, deserialize_with = "de_opt_text")]
    pub one_liner: Option<String>,
    #[serde(default, deserialize_with = "de_opt_text")]
    pub quote: Option<String>,
    #[serde(default, deserialize_with = "de_opt_text")]
    pub craft_process: Option<String>,
    #[serde(default, deserialize_with = "de_opt_text")]
    pub photo_link: Option<String>,
    #[serde(default, deserialize_with = "de_string_list")]
    pub workshop_photo_link: Vec<String>,
    #[serde(default, deserialize_with = "de_opt_text")]
    pub video_link: Option<String>,
    #[serde(default, deserialize_with = "de_opt_text")]
    pub gi_tag_info: Option<String>,
    #[serde(default, deserialize_with = "de_opt_text")]
    pub verification_notes: Option<String>,
    #[serde(default)]
    pub business_identity: Option<Value>,
    #[serde(default, deserialize_with = "de_opt_text")]
    pub aadhaar_front_url: Option<String>,
    #[serde(default, deserialize_with = "de_opt_text")]
    pub aadhaar_back_url: Option<String>,
    #[serde(default, deserialize_with = "de_string_list")]
    pub craft_photo_urls: Vec<String>,
    /// Public URL of the stored profile photo, resolved at fetch time.
    #[serde(skip_deserializing, default)]
    pub photo_url: Option<String>,
}

impl Artisan {
    pub fn is_approved(&self) -> bool {
        self.status() == Status::Approved
    }

    /// Awards split on commas, trimmed, blanks dropped.
    pub fn award_list(&self) -> Vec<&str> {
        self.awards
            .as_deref()
            .map(|a| a.split(',').map(str::trim).filter(|s| !s.is_empty()).collect())
            .unwrap_or_default()
    }

    /// Business identity, degraded to the raw value when it fails to parse.
    pub fn business_identity(&self) -> Option<BusinessIdentity> {
        let raw = self.business_identity.as_ref()?;
        match BusinessIdentity::parse(raw) {
            Ok(identity) => identity,
            Err(err) => {
                warn!(artisan_id = %self.artisan_id, %err, "using raw business identity");
                Some(BusinessIdentity::degraded(raw))
            }
        }
    }
}

impl ListRecord for Artisan {
    const NOUN: &'static str = "Artisan";
    const ID_COLUMN: &'static str = "artisan_id";

    fn id(&self) -> &str {
        &self.artisan_id
    }

    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn region(&self) -> Option<&str> {
        self.place.as_deref()
    }

    fn stored_status(&self) -> Option<Status> {
        self.status
    }

    fn enrich(&mut self, media: &dyn MediaStore) {
        let file_name = format!("photo_{}.jpg", self.artisan_id);
        self.photo_url = media
            .resolve_public_url(&self.artisan_id, &file_name)
            .map(|u| u.to_string());
    }
}

/// Card in the public craft directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Craft {
    #[serde(alias = "craft_id", deserialize_with = "de_id")]
    pub id: String,
    #[serde(default, deserialize_with = "de_opt_text")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "de_opt_text")]
    pub hero_img: Option<String>,
    #[serde(default, deserialize_with = "de_opt_text")]
    pub region: Option<String>,
}

impl ListRecord for Craft {
    const NOUN: &'static str = "Craft";
    const ID_COLUMN: &'static str = "id";

    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn region(&self) -> Option<&str> {
        self.region.as_deref()
    }
}

/// Business identity blob stored alongside an artisan.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BusinessIdentity {
    #[serde(default, deserialize_with = "de_opt_text")]
    pub name: Option<String>,
    #[serde(rename = "type", default, deserialize_with = "de_opt_text")]
    pub kind: Option<String>,
    #[serde(default, deserialize_with = "de_opt_text")]
    pub established: Option<String>,
}

impl BusinessIdentity {
    /// Parse a stored identity: either a JSON object or a JSON-encoded string.
    /// Blank strings yield `Ok(None)`.
    pub fn parse(raw: &Value) -> Result<Option<Self>, ViewError> {
        let malformed = |e: serde_json::Error| ViewError::MalformedAuxiliaryField {
            field: "business_identity",
            reason: e.to_string(),
        };
        match raw {
            Value::Null => Ok(None),
            Value::String(s) if s.trim().is_empty() => Ok(None),
            Value::String(s) => serde_json::from_str(s).map(Some).map_err(malformed),
            other => serde_json::from_value(other.clone()).map(Some).map_err(malformed),
        }
    }

    /// Display form used when the stored value is not a valid identity.
    pub fn degraded(raw: &Value) -> Self {
        let name = match raw {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        Self {
            name: Some(name),
            kind: Some(defaults::BUSINESS_TYPE.to_string()),
            established: Some(defaults::ESTABLISHED.to_string()),
        }
    }
}

fn de_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "identifier must be a string or number, got {}",
            other
        ))),
    }
}

/// Text field that also accepts numbers and booleans; null and blank strings become `None`.
fn de_opt_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) if s.trim().is_empty() => None,
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    })
}

/// Status that tolerates case differences; unknown values are treated as absent.
fn de_opt_status<'de, D>(deserializer: D) -> Result<Option<Status>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = de_opt_text(deserializer)?;
    Ok(raw.and_then(|s| match s.parse::<Status>() {
        Ok(status) => Some(status),
        Err(err) => {
            warn!(%err, "ignoring unrecognised status");
            None
        }
    }))
}

/// List of URLs: accepts an array (non-string entries skipped), a single string, or null.
fn de_string_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Array(items)) => items
            .into_iter()
            .filter_map(|v| match v {
                Value::String(s) if !s.trim().is_empty() => Some(s),
                _ => None,
            })
            .collect(),
        Some(Value::String(s)) if !s.trim().is_empty() => vec![s],
        _ => Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn status_parses_case_insensitively() {
        assert_eq!("approved".parse::<Status>().unwrap(), Status::Approved);
        assert_eq!(" Rejected ".parse::<Status>().unwrap(), Status::Rejected);
        assert!("archived".parse::<Status>().is_err());
        assert_eq!("All".parse::<StatusFilter>().unwrap(), StatusFilter::All);
        assert_eq!(
            "pending".parse::<StatusFilter>().unwrap(),
            StatusFilter::Only(Status::Pending)
        );
    }

    #[test]
    fn artisan_tolerates_loose_rows() {
        let artisan: Artisan = serde_json::from_value(json!({
            "artisan_id": 42,
            "name": "Raju",
            "place": "",
            "aadhaar_last4": 1234,
            "status": "APPROVED",
            "workshop_photo_link": ["a.jpg", null, "b.jpg"],
            "craft_photo_urls": "c.jpg",
            "unknown_column": true
        }))
        .unwrap();
        assert_eq!(artisan.artisan_id, "42");
        assert_eq!(artisan.place, None);
        assert_eq!(artisan.aadhaar_last4.as_deref(), Some("1234"));
        assert_eq!(artisan.status(), Status::Approved);
        assert_eq!(artisan.workshop_photo_link, vec!["a.jpg", "b.jpg"]);
        assert_eq!(artisan.craft_photo_urls, vec!["c.jpg"]);
    }

    #[test]
    fn absent_or_unknown_status_renders_pending() {
        let artisan: Artisan =
            serde_json::from_value(json!({ "artisan_id": "A1", "status": "archived" })).unwrap();
        assert_eq!(artisan.status, None);
        assert_eq!(artisan.status(), Status::Pending);
    }

    #[test]
    fn awards_are_split_and_trimmed() {
        let artisan: Artisan = serde_json::from_value(json!({
            "artisan_id": "A1",
            "awards": "National Award 2019,  State Award ,,"
        }))
        .unwrap();
        assert_eq!(artisan.award_list(), vec!["National Award 2019", "State Award"]);
    }

    #[test]
    fn business_identity_from_string_and_object() {
        let from_str = BusinessIdentity::parse(&json!(
            r#"{"name":"Loom House","type":"Cooperative","established":1998}"#
        ))
        .unwrap()
        .unwrap();
        assert_eq!(from_str.name.as_deref(), Some("Loom House"));
        assert_eq!(from_str.kind.as_deref(), Some("Cooperative"));
        assert_eq!(from_str.established.as_deref(), Some("1998"));

        let from_obj =
            BusinessIdentity::parse(&json!({ "name": "Loom House", "type": "Shop" })).unwrap();
        assert_eq!(from_obj.unwrap().established, None);

        assert_eq!(BusinessIdentity::parse(&json!("  ")).unwrap(), None);
    }

    #[test]
    fn malformed_business_identity_degrades_to_raw() {
        let raw = json!("Loom House Pvt Ltd");
        assert!(matches!(
            BusinessIdentity::parse(&raw),
            Err(ViewError::MalformedAuxiliaryField { .. })
        ));

        let artisan: Artisan = serde_json::from_value(json!({
            "artisan_id": "A1",
            "business_identity": "Loom House Pvt Ltd"
        }))
        .unwrap();
        let identity = artisan.business_identity().unwrap();
        assert_eq!(identity.name.as_deref(), Some("Loom House Pvt Ltd"));
        assert_eq!(identity.kind.as_deref(), Some(defaults::BUSINESS_TYPE));
        assert_eq!(identity.established.as_deref(), Some(defaults::ESTABLISHED));
    }
}
