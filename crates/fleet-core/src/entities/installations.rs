//! Installation types, installations, amenities and event types.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::entity::{set_if, Entity, FieldSpec, RecordMeta, Reference};
use crate::error::DomainError;
use crate::validate::{Checker, Validate, MAX_DESCRIPTION_LEN, MAX_NAME_LEN};

fn trimmed(s: Option<String>) -> Option<String> {
    s.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

// -- InstallationType ---------------------------------------------------------

/// Category of installation (terminal, depot, workshop, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InstallationType {
    /// Identifier, status and timestamps.
    #[serde(flatten)]
    pub meta: RecordMeta,
    /// Display name.
    pub name: String,
    /// Short code.
    pub code: String,
    /// Free text.
    pub description: Option<String>,
}

/// Create payload for [`InstallationType`].
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateInstallationType {
    /// Display name.
    pub name: String,
    /// Short code.
    pub code: String,
    /// Free text.
    pub description: Option<String>,
    /// Defaults to `true`.
    pub active: Option<bool>,
}

/// Update payload for [`InstallationType`].
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateInstallationType {
    /// Display name.
    pub name: Option<String>,
    /// Short code.
    pub code: Option<String>,
    /// Free text.
    pub description: Option<String>,
    /// Status flag.
    pub active: Option<bool>,
}

impl Validate for CreateInstallationType {
    fn validate(&self) -> Result<(), DomainError> {
        Checker::new()
            .text("name", &self.name, MAX_NAME_LEN)
            .code("code", &self.code)
            .optional_text("description", self.description.as_deref(), MAX_DESCRIPTION_LEN)
            .finish()
    }
}

impl Validate for UpdateInstallationType {
    fn validate(&self) -> Result<(), DomainError> {
        let mut c = Checker::new();
        if let Some(name) = &self.name {
            c.text("name", name, MAX_NAME_LEN);
        }
        if let Some(code) = &self.code {
            c.code("code", code);
        }
        c.optional_text("description", self.description.as_deref(), MAX_DESCRIPTION_LEN)
            .finish()
    }
}

impl Entity for InstallationType {
    type Create = CreateInstallationType;
    type Update = UpdateInstallationType;

    const RESOURCE: &'static str = "installation-types";
    const TABLE: &'static str = "installation_types";
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::text("name", "name").searchable().unique(),
        FieldSpec::text("code", "code").searchable().unique(),
        FieldSpec::text("description", "description").searchable(),
    ];

    fn meta(&self) -> &RecordMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut RecordMeta {
        &mut self.meta
    }

    fn from_create(meta: RecordMeta, input: CreateInstallationType) -> Result<Self, DomainError> {
        Ok(Self {
            meta: meta.with_active(input.active),
            name: input.name.trim().to_string(),
            code: input.code.trim().to_string(),
            description: trimmed(input.description),
        })
    }

    fn apply_update(&mut self, input: UpdateInstallationType) -> Result<(), DomainError> {
        set_if(&mut self.name, input.name.map(|s| s.trim().to_string()));
        set_if(&mut self.code, input.code.map(|s| s.trim().to_string()));
        if input.description.is_some() {
            self.description = trimmed(input.description);
        }
        set_if(&mut self.meta.active, input.active);
        Ok(())
    }
}

// -- Installation -------------------------------------------------------------

/// A physical site: terminal, depot, workshop, office.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Installation {
    /// Identifier, status and timestamps.
    #[serde(flatten)]
    pub meta: RecordMeta,
    /// Display name.
    pub name: String,
    /// Street address.
    pub address: String,
    /// Free text.
    pub description: Option<String>,
    /// Classification.
    pub installation_type_id: Option<i64>,
}

/// Create payload for [`Installation`].
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateInstallation {
    /// Display name.
    pub name: String,
    /// Street address.
    pub address: String,
    /// Free text.
    pub description: Option<String>,
    /// Classification.
    pub installation_type_id: Option<i64>,
    /// Defaults to `true`.
    pub active: Option<bool>,
}

/// Update payload for [`Installation`].
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateInstallation {
    /// Display name.
    pub name: Option<String>,
    /// Street address.
    pub address: Option<String>,
    /// Free text.
    pub description: Option<String>,
    /// Classification.
    pub installation_type_id: Option<i64>,
    /// Status flag.
    pub active: Option<bool>,
}

impl Validate for CreateInstallation {
    fn validate(&self) -> Result<(), DomainError> {
        let mut c = Checker::new();
        c.text("name", &self.name, MAX_NAME_LEN)
            .text("address", &self.address, MAX_NAME_LEN)
            .optional_text("description", self.description.as_deref(), MAX_DESCRIPTION_LEN);
        if let Some(id) = self.installation_type_id {
            c.id("installationTypeId", id);
        }
        c.finish()
    }
}

impl Validate for UpdateInstallation {
    fn validate(&self) -> Result<(), DomainError> {
        let mut c = Checker::new();
        if let Some(name) = &self.name {
            c.text("name", name, MAX_NAME_LEN);
        }
        if let Some(address) = &self.address {
            c.text("address", address, MAX_NAME_LEN);
        }
        if let Some(id) = self.installation_type_id {
            c.id("installationTypeId", id);
        }
        c.optional_text("description", self.description.as_deref(), MAX_DESCRIPTION_LEN)
            .finish()
    }
}

impl Entity for Installation {
    type Create = CreateInstallation;
    type Update = UpdateInstallation;

    const RESOURCE: &'static str = "installations";
    const TABLE: &'static str = "installations";
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::text("name", "name").searchable().unique(),
        FieldSpec::text("address", "address").searchable(),
        FieldSpec::text("description", "description").searchable(),
        FieldSpec::integer("installationTypeId", "installation_type_id"),
    ];

    fn meta(&self) -> &RecordMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut RecordMeta {
        &mut self.meta
    }

    fn from_create(meta: RecordMeta, input: CreateInstallation) -> Result<Self, DomainError> {
        Ok(Self {
            meta: meta.with_active(input.active),
            name: input.name.trim().to_string(),
            address: input.address.trim().to_string(),
            description: trimmed(input.description),
            installation_type_id: input.installation_type_id,
        })
    }

    fn apply_update(&mut self, input: UpdateInstallation) -> Result<(), DomainError> {
        set_if(&mut self.name, input.name.map(|s| s.trim().to_string()));
        set_if(&mut self.address, input.address.map(|s| s.trim().to_string()));
        if input.description.is_some() {
            self.description = trimmed(input.description);
        }
        if input.installation_type_id.is_some() {
            self.installation_type_id = input.installation_type_id;
        }
        set_if(&mut self.meta.active, input.active);
        Ok(())
    }

    fn references(&self) -> Vec<Reference> {
        self.installation_type_id
            .map(|id| Reference::new("installationTypeId", "installation-types", id))
            .into_iter()
            .collect()
    }
}

// -- Amenity ------------------------------------------------------------------

/// A service offered at an installation or on board (wifi, restrooms, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Amenity {
    /// Identifier, status and timestamps.
    #[serde(flatten)]
    pub meta: RecordMeta,
    /// Display name.
    pub name: String,
    /// Grouping, e.g. `comfort`, `accessibility`.
    pub category: String,
    /// Free text.
    pub description: Option<String>,
    /// Icon identifier for the admin UI.
    pub icon_name: Option<String>,
}

/// Create payload for [`Amenity`].
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateAmenity {
    /// Display name.
    pub name: String,
    /// Grouping.
    pub category: String,
    /// Free text.
    pub description: Option<String>,
    /// Icon identifier.
    pub icon_name: Option<String>,
    /// Defaults to `true`.
    pub active: Option<bool>,
}

/// Update payload for [`Amenity`].
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAmenity {
    /// Display name.
    pub name: Option<String>,
    /// Grouping.
    pub category: Option<String>,
    /// Free text.
    pub description: Option<String>,
    /// Icon identifier.
    pub icon_name: Option<String>,
    /// Status flag.
    pub active: Option<bool>,
}

impl Validate for CreateAmenity {
    fn validate(&self) -> Result<(), DomainError> {
        Checker::new()
            .text("name", &self.name, MAX_NAME_LEN)
            .text("category", &self.category, 100)
            .optional_text("description", self.description.as_deref(), MAX_DESCRIPTION_LEN)
            .optional_text("iconName", self.icon_name.as_deref(), 100)
            .finish()
    }
}

impl Validate for UpdateAmenity {
    fn validate(&self) -> Result<(), DomainError> {
        let mut c = Checker::new();
        if let Some(name) = &self.name {
            c.text("name", name, MAX_NAME_LEN);
        }
        if let Some(category) = &self.category {
            c.text("category", category, 100);
        }
        c.optional_text("description", self.description.as_deref(), MAX_DESCRIPTION_LEN)
            .optional_text("iconName", self.icon_name.as_deref(), 100)
            .finish()
    }
}

impl Entity for Amenity {
    type Create = CreateAmenity;
    type Update = UpdateAmenity;

    const RESOURCE: &'static str = "amenities";
    const TABLE: &'static str = "amenities";
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::text("name", "name").searchable().unique(),
        FieldSpec::text("category", "category"),
        FieldSpec::text("description", "description").searchable(),
        FieldSpec::text("iconName", "icon_name"),
    ];

    fn meta(&self) -> &RecordMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut RecordMeta {
        &mut self.meta
    }

    fn from_create(meta: RecordMeta, input: CreateAmenity) -> Result<Self, DomainError> {
        Ok(Self {
            meta: meta.with_active(input.active),
            name: input.name.trim().to_string(),
            category: input.category.trim().to_lowercase(),
            description: trimmed(input.description),
            icon_name: trimmed(input.icon_name),
        })
    }

    fn apply_update(&mut self, input: UpdateAmenity) -> Result<(), DomainError> {
        set_if(&mut self.name, input.name.map(|s| s.trim().to_string()));
        set_if(&mut self.category, input.category.map(|s| s.trim().to_lowercase()));
        if input.description.is_some() {
            self.description = trimmed(input.description);
        }
        if input.icon_name.is_some() {
            self.icon_name = trimmed(input.icon_name);
        }
        set_if(&mut self.meta.active, input.active);
        Ok(())
    }
}

// -- EventType ----------------------------------------------------------------

/// A kind of operational event recorded at installations (refuel, wash, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EventType {
    /// Identifier, status and timestamps.
    #[serde(flatten)]
    pub meta: RecordMeta,
    /// Display name.
    pub name: String,
    /// Short code.
    pub code: String,
    /// Free text.
    pub description: Option<String>,
    /// Expected duration in minutes.
    pub base_time: i64,
    /// The event records a cost.
    pub needs_cost: bool,
    /// The event records a quantity.
    pub needs_quantity: bool,
    /// The event is raised by an external integration.
    pub integration: bool,
}

/// Create payload for [`EventType`].
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateEventType {
    /// Display name.
    pub name: String,
    /// Short code.
    pub code: String,
    /// Free text.
    pub description: Option<String>,
    /// Expected duration in minutes.
    #[serde(default)]
    pub base_time: i64,
    /// The event records a cost.
    #[serde(default)]
    pub needs_cost: bool,
    /// The event records a quantity.
    #[serde(default)]
    pub needs_quantity: bool,
    /// Raised by an external integration.
    #[serde(default)]
    pub integration: bool,
    /// Defaults to `true`.
    pub active: Option<bool>,
}

/// Update payload for [`EventType`].
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEventType {
    /// Display name.
    pub name: Option<String>,
    /// Short code.
    pub code: Option<String>,
    /// Free text.
    pub description: Option<String>,
    /// Expected duration in minutes.
    pub base_time: Option<i64>,
    /// The event records a cost.
    pub needs_cost: Option<bool>,
    /// The event records a quantity.
    pub needs_quantity: Option<bool>,
    /// Raised by an external integration.
    pub integration: Option<bool>,
    /// Status flag.
    pub active: Option<bool>,
}

/// Upper bound for [`EventType::base_time`]: one day.
const MAX_BASE_TIME: i64 = 24 * 60;

impl Validate for CreateEventType {
    fn validate(&self) -> Result<(), DomainError> {
        Checker::new()
            .text("name", &self.name, MAX_NAME_LEN)
            .code("code", &self.code)
            .optional_text("description", self.description.as_deref(), MAX_DESCRIPTION_LEN)
            .range_i64("baseTime", self.base_time, 0, MAX_BASE_TIME)
            .finish()
    }
}

impl Validate for UpdateEventType {
    fn validate(&self) -> Result<(), DomainError> {
        let mut c = Checker::new();
        if let Some(name) = &self.name {
            c.text("name", name, MAX_NAME_LEN);
        }
        if let Some(code) = &self.code {
            c.code("code", code);
        }
        if let Some(t) = self.base_time {
            c.range_i64("baseTime", t, 0, MAX_BASE_TIME);
        }
        c.optional_text("description", self.description.as_deref(), MAX_DESCRIPTION_LEN)
            .finish()
    }
}

impl Entity for EventType {
    type Create = CreateEventType;
    type Update = UpdateEventType;

    const RESOURCE: &'static str = "event-types";
    const TABLE: &'static str = "event_types";
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::text("name", "name").searchable(),
        FieldSpec::text("code", "code").searchable().unique(),
        FieldSpec::text("description", "description").searchable(),
        FieldSpec::integer("baseTime", "base_time"),
        FieldSpec::boolean("needsCost", "needs_cost"),
        FieldSpec::boolean("needsQuantity", "needs_quantity"),
        FieldSpec::boolean("integration", "integration"),
    ];

    fn meta(&self) -> &RecordMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut RecordMeta {
        &mut self.meta
    }

    fn from_create(meta: RecordMeta, input: CreateEventType) -> Result<Self, DomainError> {
        Ok(Self {
            meta: meta.with_active(input.active),
            name: input.name.trim().to_string(),
            code: input.code.trim().to_string(),
            description: trimmed(input.description),
            base_time: input.base_time,
            needs_cost: input.needs_cost,
            needs_quantity: input.needs_quantity,
            integration: input.integration,
        })
    }

    fn apply_update(&mut self, input: UpdateEventType) -> Result<(), DomainError> {
        set_if(&mut self.name, input.name.map(|s| s.trim().to_string()));
        set_if(&mut self.code, input.code.map(|s| s.trim().to_string()));
        if input.description.is_some() {
            self.description = trimmed(input.description);
        }
        set_if(&mut self.base_time, input.base_time);
        set_if(&mut self.needs_cost, input.needs_cost);
        set_if(&mut self.needs_quantity, input.needs_quantity);
        set_if(&mut self.integration, input.integration);
        set_if(&mut self.meta.active, input.active);
        Ok(())
    }
}
