//! Content types, properties and enumeration domains
//!
//! A property names one filterable or sortable field of a remote object.
//! Which properties exist on which content type, and how each one is
//! serialized, is owned by the [`PropertyCatalog`](super::PropertyCatalog).

use std::fmt;

use serde::{Deserialize, Serialize};

/// Remote category of queryable object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Sensors,
    Devices,
    Groups,
    Probes,
    Logs,
    Channels,
}

impl ContentType {
    /// Returns the content name used on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Sensors => "sensors",
            ContentType::Devices => "devices",
            ContentType::Groups => "groups",
            ContentType::Probes => "probes",
            ContentType::Logs => "messages",
            ContentType::Channels => "channels",
        }
    }

    /// Parses a wire content name
    pub fn from_remote(name: &str) -> Option<Self> {
        match name {
            "sensors" => Some(ContentType::Sensors),
            "devices" => Some(ContentType::Devices),
            "groups" => Some(ContentType::Groups),
            "probes" => Some(ContentType::Probes),
            "messages" => Some(ContentType::Logs),
            "channels" => Some(ContentType::Channels),
            _ => None,
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifier of a field on a remote object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Property {
    Id,
    ParentId,
    Name,
    Status,
    Message,
    Tags,
    Active,
    Priority,
    Host,
    Device,
    Group,
    Probe,
    Position,
    LastValue,
    Interval,
    Uptime,
    LastUp,
    Unit,
    DateTime,
    StartDate,
    EndDate,
}

impl Property {
    /// Property name
    pub fn as_str(&self) -> &'static str {
        match self {
            Property::Id => "Id",
            Property::ParentId => "ParentId",
            Property::Name => "Name",
            Property::Status => "Status",
            Property::Message => "Message",
            Property::Tags => "Tags",
            Property::Active => "Active",
            Property::Priority => "Priority",
            Property::Host => "Host",
            Property::Device => "Device",
            Property::Group => "Group",
            Property::Probe => "Probe",
            Property::Position => "Position",
            Property::LastValue => "LastValue",
            Property::Interval => "Interval",
            Property::Uptime => "Uptime",
            Property::LastUp => "LastUp",
            Property::Unit => "Unit",
            Property::DateTime => "DateTime",
            Property::StartDate => "StartDate",
            Property::EndDate => "EndDate",
        }
    }
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Enumeration family a value or property belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnumDomain {
    Status,
    Priority,
}

impl EnumDomain {
    /// Content type name
    pub fn as_str(&self) -> &'static str {
        match self {
            EnumDomain::Status => "Status",
            EnumDomain::Priority => "Priority",
        }
    }
}

impl fmt::Display for EnumDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a property's values are represented and serialized
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyKind {
    Integer,
    Float,
    String,
    Bool,
    /// Whole seconds
    Duration,
    Timestamp,
    Enumeration(EnumDomain),
    /// Array of strings; `Contains` means "any element contains"
    StringArray,
}

impl PropertyKind {
    /// Whether values are arrays
    pub fn is_array(&self) -> bool {
        matches!(self, PropertyKind::StringArray)
    }
}

/// An enumeration with a canonical remote representation
pub trait RemoteEnum: Copy {
    /// Domain every variant belongs to
    const DOMAIN: EnumDomain;

    /// Variant name as shown to callers
    fn name(&self) -> &'static str;

    /// Canonical string the remote service filters on
    fn remote_value(&self) -> &'static str;
}

/// Object status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    Unknown,
    Collecting,
    Up,
    Warning,
    Down,
    NoProbe,
    PausedByUser,
    PausedByDependency,
    PausedBySchedule,
    Unusual,
    PausedByLicense,
    PausedUntil,
    DownAcknowledged,
    DownPartial,
}

impl RemoteEnum for Status {
    const DOMAIN: EnumDomain = EnumDomain::Status;

    fn name(&self) -> &'static str {
        match self {
            Status::Unknown => "Unknown",
            Status::Collecting => "Collecting",
            Status::Up => "Up",
            Status::Warning => "Warning",
            Status::Down => "Down",
            Status::NoProbe => "NoProbe",
            Status::PausedByUser => "PausedByUser",
            Status::PausedByDependency => "PausedByDependency",
            Status::PausedBySchedule => "PausedBySchedule",
            Status::Unusual => "Unusual",
            Status::PausedByLicense => "PausedByLicense",
            Status::PausedUntil => "PausedUntil",
            Status::DownAcknowledged => "DownAcknowledged",
            Status::DownPartial => "DownPartial",
        }
    }

    fn remote_value(&self) -> &'static str {
        match self {
            Status::Unknown => "1",
            Status::Collecting => "2",
            Status::Up => "3",
            Status::Warning => "4",
            Status::Down => "5",
            Status::NoProbe => "6",
            Status::PausedByUser => "7",
            Status::PausedByDependency => "8",
            Status::PausedBySchedule => "9",
            Status::Unusual => "10",
            Status::PausedByLicense => "11",
            Status::PausedUntil => "12",
            Status::DownAcknowledged => "13",
            Status::DownPartial => "14",
        }
    }
}

/// Object priority (one to five stars)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Priority {
    One,
    Two,
    Three,
    Four,
    Five,
}

impl RemoteEnum for Priority {
    const DOMAIN: EnumDomain = EnumDomain::Priority;

    fn name(&self) -> &'static str {
        match self {
            Priority::One => "One",
            Priority::Two => "Two",
            Priority::Three => "Three",
            Priority::Four => "Four",
            Priority::Five => "Five",
        }
    }

    fn remote_value(&self) -> &'static str {
        match self {
            Priority::One => "1",
            Priority::Two => "2",
            Priority::Three => "3",
            Priority::Four => "4",
            Priority::Five => "5",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type_round_trip() {
        for content in [
            ContentType::Sensors,
            ContentType::Devices,
            ContentType::Groups,
            ContentType::Probes,
            ContentType::Logs,
            ContentType::Channels,
        ] {
            assert_eq!(ContentType::from_remote(content.as_str()), Some(content));
        }
        assert_eq!(ContentType::from_remote("tickets"), None);
    }

    #[test]
    fn test_enum_remote_values() {
        assert_eq!(Status::Down.remote_value(), "5");
        assert_eq!(Status::Down.name(), "Down");
        assert_eq!(Priority::Five.remote_value(), "5");
        assert_eq!(Status::DOMAIN, EnumDomain::Status);
        assert_ne!(Status::DOMAIN, Priority::DOMAIN);
    }
}
