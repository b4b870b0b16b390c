use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::error::EngineError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Category {
    Theft,
    Assault,
    Robbery,
    Harassment,
    Vandalism,
    Fraud,
    Other,
}

impl Category {
    pub const ALL: [Category; 7] = [
        Category::Theft,
        Category::Assault,
        Category::Robbery,
        Category::Harassment,
        Category::Vandalism,
        Category::Fraud,
        Category::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Theft => "Theft",
            Category::Assault => "Assault",
            Category::Robbery => "Robbery",
            Category::Harassment => "Harassment",
            Category::Vandalism => "Vandalism",
            Category::Fraud => "Fraud",
            Category::Other => "Other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Category::ALL
            .iter()
            .copied()
            .find(|c| c.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| EngineError::invalid(format!("unknown category: {}", s)))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum ReportStatus {
    #[default]
    Pending,
    Investigating,
    Resolved,
}

impl ReportStatus {
    pub const ALL: [ReportStatus; 3] = [
        ReportStatus::Pending,
        ReportStatus::Investigating,
        ReportStatus::Resolved,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReportStatus::Pending => "Pending",
            ReportStatus::Investigating => "Investigating",
            ReportStatus::Resolved => "Resolved",
        }
    }
}

impl fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportStatus {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        ReportStatus::ALL
            .iter()
            .copied()
            .find(|st| st.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| EngineError::invalid(format!("unknown report status: {}", s)))
    }
}

/// Distress progression. Only forward moves are legal; `Responded` is terminal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum DistressStatus {
    #[default]
    Active,
    Dispatched,
    Responded,
}

impl DistressStatus {
    pub const ALL: [DistressStatus; 3] = [
        DistressStatus::Active,
        DistressStatus::Dispatched,
        DistressStatus::Responded,
    ];

    fn rank(&self) -> u8 {
        match self {
            DistressStatus::Active => 0,
            DistressStatus::Dispatched => 1,
            DistressStatus::Responded => 2,
        }
    }

    pub fn can_advance_to(&self, target: DistressStatus) -> bool {
        target.rank() > self.rank()
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, DistressStatus::Responded)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DistressStatus::Active => "Active",
            DistressStatus::Dispatched => "Dispatched",
            DistressStatus::Responded => "Responded",
        }
    }
}

impl fmt::Display for DistressStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DistressStatus {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        DistressStatus::ALL
            .iter()
            .copied()
            .find(|st| st.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| EngineError::invalid(format!("unknown distress status: {}", s)))
    }
}

/// An already-authenticated caller, as handed to the engine by the identity layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub id: String,
    pub display_name: Option<String>,
}

impl Principal {
    pub fn new(id: impl Into<String>, display_name: Option<String>) -> Self {
        Self {
            id: id.into(),
            display_name,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Author {
    Anonymous,
    Identified { id: String, name: String },
}

impl Author {
    /// Resolved once at creation and stored as-is.
    pub fn resolve(principal: &Principal, anonymous: bool) -> Self {
        if anonymous {
            return Author::Anonymous;
        }
        let name = principal
            .display_name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or("User")
            .to_string();
        Author::Identified {
            id: principal.id.clone(),
            name,
        }
    }

    pub fn display_name(&self) -> &str {
        match self {
            Author::Anonymous => "Anonymous",
            Author::Identified { name, .. } => name,
        }
    }

    pub fn id(&self) -> Option<&str> {
        match self {
            Author::Anonymous => None,
            Author::Identified { id, .. } => Some(id),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, EngineError> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(EngineError::invalid(format!(
                "latitude out of range: {}",
                latitude
            )));
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(EngineError::invalid(format!(
                "longitude out of range: {}",
                longitude
            )));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    pub fn label(&self) -> String {
        format!("Lat: {:.4}, Lng: {:.4}", self.latitude, self.longitude)
    }
}

/// Human address filled in by the reverse-geocoding collaborator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Address {
    pub street_address: Option<String>,
    pub region: Option<String>,
    pub area: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum AttachmentKind {
    Image,
    Pdf,
    Other,
}

impl AttachmentKind {
    pub fn infer(uri: &str) -> Self {
        let path = uri.split(['?', '#']).next().unwrap_or(uri).to_lowercase();
        let ext = path.rsplit('.').next().unwrap_or("");
        match ext {
            "pdf" => AttachmentKind::Pdf,
            "png" | "jpg" | "jpeg" | "gif" | "webp" | "heic" => AttachmentKind::Image,
            _ => AttachmentKind::Other,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Attachment {
    pub uri: String,
    pub kind: AttachmentKind,
}

/// Reserved suspect/victim entry; reports are created with none.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct PartyRecord {
    pub name: Option<String>,
    pub note: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewReport {
    pub category: Category,
    pub description: String,
    pub reporter: Author,
    pub location: Option<Coordinate>,
    pub media_urls: Vec<String>,
    pub diary: Option<Attachment>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Report {
    pub id: String,
    pub category: Category,
    pub description: String,
    pub reporter: Author,
    pub created_at: DateTime<Utc>,
    pub location: Option<Coordinate>,
    #[serde(default)]
    pub address: Option<Address>,
    pub status: ReportStatus,
    #[serde(default)]
    pub media_urls: Vec<String>,
    #[serde(default)]
    pub diary: Option<Attachment>,
    #[serde(default)]
    pub suspects: Vec<PartyRecord>,
    #[serde(default)]
    pub victims: Vec<PartyRecord>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Report {
    pub fn location_label(&self) -> &str {
        self.address
            .as_ref()
            .and_then(|a| a.region.as_deref().or(a.street_address.as_deref()))
            .unwrap_or("Unknown Location")
    }

    pub fn region(&self) -> &str {
        self.address
            .as_ref()
            .and_then(|a| a.region.as_deref())
            .unwrap_or("Unknown")
    }
}

/// Contact details copied onto a distress signal at creation time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Contact {
    pub name: String,
    pub phone: String,
    #[serde(default)]
    pub email: Option<String>,
}

impl Contact {
    pub fn snapshot(name: Option<&str>, phone: Option<&str>, email: Option<&str>) -> Self {
        fn non_blank(v: Option<&str>) -> Option<&str> {
            v.map(str::trim).filter(|s| !s.is_empty())
        }
        Self {
            name: non_blank(name).unwrap_or("User").to_string(),
            phone: non_blank(phone).unwrap_or("N/A").to_string(),
            email: non_blank(email).map(str::to_string),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DistressSignal {
    pub id: String,
    pub originator_id: String,
    pub contact: Contact,
    pub created_at: DateTime<Utc>,
    pub location: Coordinate,
    pub location_label: String,
    pub status: DistressStatus,
    #[serde(default)]
    pub dispatched_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub responded_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteDirection {
    Up,
    Down,
}

impl VoteDirection {
    pub fn value(&self) -> i64 {
        match self {
            VoteDirection::Up => 1,
            VoteDirection::Down => -1,
        }
    }
}

impl TryFrom<i64> for VoteDirection {
    type Error = EngineError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(VoteDirection::Up),
            -1 => Ok(VoteDirection::Down),
            other => Err(EngineError::invalid(format!(
                "vote direction must be +1 or -1, got {}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Tip {
    pub id: String,
    pub report_id: String,
    pub text: String,
    pub author: Author,
    pub created_at: DateTime<Utc>,
    pub tally: i64,
    #[serde(default)]
    pub votes: BTreeMap<String, i64>,
}

impl Tip {
    pub fn vote_of(&self, voter_id: &str) -> i64 {
        self.votes.get(voter_id).copied().unwrap_or(0)
    }

    pub fn tally_is_consistent(&self) -> bool {
        self.votes.values().sum::<i64>() == self.tally
    }
}

#[derive(Debug, Clone, Default)]
pub struct ReportFilter {
    pub status: Option<ReportStatus>,
    pub category: Option<Category>,
    pub reporter_id: Option<String>,
    pub since: Option<DateTime<Utc>>,
    pub search: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Default)]
pub struct DistressFilter {
    pub status: Option<DistressStatus>,
    pub originator_id: Option<String>,
    pub limit: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_only_distress_moves() {
        use DistressStatus::*;
        assert!(Active.can_advance_to(Dispatched));
        assert!(Active.can_advance_to(Responded));
        assert!(Dispatched.can_advance_to(Responded));
        assert!(!Dispatched.can_advance_to(Dispatched));
        assert!(!Dispatched.can_advance_to(Active));
        assert!(!Responded.can_advance_to(Active));
        assert!(!Responded.can_advance_to(Responded));
        assert!(!Active.can_advance_to(Active));
    }

    #[test]
    fn status_parsing_is_case_insensitive() {
        assert_eq!(
            "investigating".parse::<ReportStatus>().unwrap(),
            ReportStatus::Investigating
        );
        assert!("Closed".parse::<ReportStatus>().is_err());
        assert_eq!(" fraud ".parse::<Category>().unwrap(), Category::Fraud);
        assert!("Murder".parse::<Category>().is_err());
    }

    #[test]
    fn author_falls_back_to_user() {
        let p = Principal::new("u1", Some("  ".into()));
        assert_eq!(
            Author::resolve(&p, false),
            Author::Identified {
                id: "u1".into(),
                name: "User".into()
            }
        );
        assert_eq!(Author::resolve(&p, true), Author::Anonymous);
        assert_eq!(Author::Anonymous.display_name(), "Anonymous");
    }

    #[test]
    fn coordinate_bounds() {
        assert!(Coordinate::new(23.81, 90.41).is_ok());
        assert!(Coordinate::new(91.0, 0.0).is_err());
        assert!(Coordinate::new(0.0, f64::NAN).is_err());
        let c = Coordinate::new(23.810331, 90.412521).unwrap();
        assert_eq!(c.label(), "Lat: 23.8103, Lng: 90.4125");
    }

    #[test]
    fn vote_direction_from_int() {
        assert_eq!(VoteDirection::try_from(1).unwrap(), VoteDirection::Up);
        assert_eq!(VoteDirection::try_from(-1).unwrap(), VoteDirection::Down);
        assert!(VoteDirection::try_from(0).is_err());
        assert!(VoteDirection::try_from(2).is_err());
    }

    #[test]
    fn attachment_kind_by_extension() {
        assert_eq!(
            AttachmentKind::infer("https://cdn/x/gd.PDF?sig=1"),
            AttachmentKind::Pdf
        );
        assert_eq!(AttachmentKind::infer("a/b.jpeg"), AttachmentKind::Image);
        assert_eq!(AttachmentKind::infer("a/b"), AttachmentKind::Other);
    }
}
