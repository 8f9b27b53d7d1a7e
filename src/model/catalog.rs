//! Property catalog
//!
//! The catalog is the seam to the domain-model layer: it maps each content
//! type to the properties it exposes, their wire column names and kinds, and
//! which of them the remote service can filter or sort on.

use super::filter::serialize_value;
use super::literal::Literal;
use super::property::{ContentType, EnumDomain, Property, PropertyKind};

/// Static description of one property on one content type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertyDescriptor {
    pub property: Property,
    /// Wire column name
    pub column: &'static str,
    pub kind: PropertyKind,
    /// Whether the remote service accepts filters on this property
    pub filterable: bool,
    /// Whether the remote service can sort on this property
    pub sortable: bool,
}

impl PropertyDescriptor {
    pub const fn new(
        property: Property,
        column: &'static str,
        kind: PropertyKind,
        filterable: bool,
        sortable: bool,
    ) -> Self {
        Self {
            property,
            column,
            kind,
            filterable,
            sortable,
        }
    }
}

/// Read-only mapping from content types to their properties
pub trait PropertyCatalog {
    /// Every property the content type exposes, in declaration order
    fn properties(&self, content: ContentType) -> Vec<PropertyDescriptor>;

    /// Columns requested when the caller does not select any
    fn default_columns(&self, content: ContentType) -> Vec<Property>;

    /// Looks up one property
    fn descriptor(&self, content: ContentType, property: Property) -> Option<PropertyDescriptor> {
        self.properties(content)
            .into_iter()
            .find(|d| d.property == property)
    }

    /// Properties the remote service can filter on
    fn supported_properties(&self, content: ContentType) -> Vec<Property> {
        self.properties(content)
            .into_iter()
            .filter(|d| d.filterable)
            .map(|d| d.property)
            .collect()
    }

    /// Wire column name of a property
    fn column_name(&self, content: ContentType, property: Property) -> Option<&'static str> {
        self.descriptor(content, property).map(|d| d.column)
    }

    /// Reverse lookup from a wire column name
    fn property_for_column(&self, content: ContentType, column: &str) -> Option<Property> {
        self.properties(content)
            .into_iter()
            .find(|d| d.column == column)
            .map(|d| d.property)
    }

    /// Serializes a literal for a property
    fn remote_value(&self, descriptor: &PropertyDescriptor, literal: &Literal) -> Option<String> {
        serialize_value(descriptor.kind, literal)
    }
}

use PropertyKind::{Bool, Duration, Float, Integer, StringArray, Timestamp};

const STATUS: PropertyKind = PropertyKind::Enumeration(EnumDomain::Status);
const PRIORITY: PropertyKind = PropertyKind::Enumeration(EnumDomain::Priority);
const TEXT: PropertyKind = PropertyKind::String;

const SENSORS: &[PropertyDescriptor] = &[
    PropertyDescriptor::new(Property::Id, "objid", Integer, true, true),
    PropertyDescriptor::new(Property::ParentId, "parentid", Integer, true, true),
    PropertyDescriptor::new(Property::Name, "name", TEXT, true, true),
    PropertyDescriptor::new(Property::Status, "status", STATUS, true, true),
    PropertyDescriptor::new(Property::Message, "message", TEXT, true, true),
    PropertyDescriptor::new(Property::Tags, "tags", StringArray, true, false),
    PropertyDescriptor::new(Property::Active, "active", Bool, true, true),
    PropertyDescriptor::new(Property::Priority, "priority", PRIORITY, true, true),
    PropertyDescriptor::new(Property::Device, "device", TEXT, true, true),
    PropertyDescriptor::new(Property::Group, "group", TEXT, true, true),
    PropertyDescriptor::new(Property::Probe, "probe", TEXT, true, true),
    PropertyDescriptor::new(Property::LastValue, "lastvalue", Float, true, true),
    PropertyDescriptor::new(Property::Interval, "interval", Duration, true, true),
    PropertyDescriptor::new(Property::Uptime, "uptime", Float, true, true),
    PropertyDescriptor::new(Property::LastUp, "lastup", Timestamp, true, true),
    PropertyDescriptor::new(Property::Position, "position", Integer, false, true),
];

const DEVICES: &[PropertyDescriptor] = &[
    PropertyDescriptor::new(Property::Id, "objid", Integer, true, true),
    PropertyDescriptor::new(Property::ParentId, "parentid", Integer, true, true),
    PropertyDescriptor::new(Property::Name, "name", TEXT, true, true),
    PropertyDescriptor::new(Property::Status, "status", STATUS, true, true),
    PropertyDescriptor::new(Property::Message, "message", TEXT, true, true),
    PropertyDescriptor::new(Property::Tags, "tags", StringArray, true, false),
    PropertyDescriptor::new(Property::Active, "active", Bool, true, true),
    PropertyDescriptor::new(Property::Priority, "priority", PRIORITY, true, true),
    PropertyDescriptor::new(Property::Host, "host", TEXT, true, true),
    PropertyDescriptor::new(Property::Group, "group", TEXT, true, true),
    PropertyDescriptor::new(Property::Probe, "probe", TEXT, true, true),
    PropertyDescriptor::new(Property::Position, "position", Integer, false, true),
];

const GROUPS: &[PropertyDescriptor] = &[
    PropertyDescriptor::new(Property::Id, "objid", Integer, true, true),
    PropertyDescriptor::new(Property::ParentId, "parentid", Integer, true, true),
    PropertyDescriptor::new(Property::Name, "name", TEXT, true, true),
    PropertyDescriptor::new(Property::Status, "status", STATUS, true, true),
    PropertyDescriptor::new(Property::Message, "message", TEXT, true, true),
    PropertyDescriptor::new(Property::Tags, "tags", StringArray, true, false),
    PropertyDescriptor::new(Property::Active, "active", Bool, true, true),
    PropertyDescriptor::new(Property::Priority, "priority", PRIORITY, true, true),
    PropertyDescriptor::new(Property::Probe, "probe", TEXT, true, true),
    PropertyDescriptor::new(Property::Position, "position", Integer, false, true),
];

const PROBES: &[PropertyDescriptor] = &[
    PropertyDescriptor::new(Property::Id, "objid", Integer, true, true),
    PropertyDescriptor::new(Property::Name, "name", TEXT, true, true),
    PropertyDescriptor::new(Property::Status, "status", STATUS, true, true),
    PropertyDescriptor::new(Property::Message, "message", TEXT, true, true),
    PropertyDescriptor::new(Property::Tags, "tags", StringArray, true, false),
    PropertyDescriptor::new(Property::Active, "active", Bool, true, true),
    PropertyDescriptor::new(Property::Priority, "priority", PRIORITY, true, true),
];

const LOGS: &[PropertyDescriptor] = &[
    PropertyDescriptor::new(Property::Id, "id", Integer, true, false),
    PropertyDescriptor::new(Property::Name, "name", TEXT, true, true),
    PropertyDescriptor::new(Property::Status, "status", STATUS, true, true),
    PropertyDescriptor::new(Property::Message, "message", TEXT, false, false),
    PropertyDescriptor::new(Property::DateTime, "datetime", Timestamp, true, true),
    PropertyDescriptor::new(Property::StartDate, "dstart", Timestamp, true, false),
    PropertyDescriptor::new(Property::EndDate, "dend", Timestamp, true, false),
    PropertyDescriptor::new(Property::Device, "device", TEXT, true, true),
    PropertyDescriptor::new(Property::Group, "group", TEXT, true, true),
    PropertyDescriptor::new(Property::Probe, "probe", TEXT, true, true),
];

const CHANNELS: &[PropertyDescriptor] = &[
    PropertyDescriptor::new(Property::Id, "objid", Integer, true, true),
    PropertyDescriptor::new(Property::Name, "name", TEXT, true, true),
    PropertyDescriptor::new(Property::LastValue, "lastvalue", Float, false, true),
    PropertyDescriptor::new(Property::Unit, "unit", TEXT, false, false),
];

/// Built-in catalog for the standard content types
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardCatalog;

impl StandardCatalog {
    fn table(content: ContentType) -> &'static [PropertyDescriptor] {
        match content {
            ContentType::Sensors => SENSORS,
            ContentType::Devices => DEVICES,
            ContentType::Groups => GROUPS,
            ContentType::Probes => PROBES,
            ContentType::Logs => LOGS,
            ContentType::Channels => CHANNELS,
        }
    }
}

impl PropertyCatalog for StandardCatalog {
    fn properties(&self, content: ContentType) -> Vec<PropertyDescriptor> {
        Self::table(content).to_vec()
    }

    fn default_columns(&self, content: ContentType) -> Vec<Property> {
        match content {
            ContentType::Logs => vec![
                Property::Id,
                Property::Name,
                Property::Status,
                Property::Message,
                Property::DateTime,
            ],
            ContentType::Channels => vec![
                Property::Id,
                Property::Name,
                Property::LastValue,
                Property::Unit,
            ],
            other => Self::table(other)
                .iter()
                .filter(|d| !matches!(d.property, Property::StartDate | Property::EndDate))
                .map(|d| d.property)
                .collect(),
        }
    }

    fn descriptor(&self, content: ContentType, property: Property) -> Option<PropertyDescriptor> {
        Self::table(content)
            .iter()
            .find(|d| d.property == property)
            .copied()
    }
}
