//! Route nodes (stops) and the labels attached to them.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::entity::{set_if, Entity, FieldSpec, RecordMeta, Reference};
use crate::error::DomainError;
use crate::validate::{Checker, Validate, MAX_DESCRIPTION_LEN, MAX_NAME_LEN};

// -- Label --------------------------------------------------------------------

/// A colored tag applied to nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Label {
    /// Identifier, status and timestamps.
    #[serde(flatten)]
    pub meta: RecordMeta,
    /// Display name.
    pub name: String,
    /// Free text.
    pub description: Option<String>,
    /// `#RRGGBB`.
    pub color: String,
}

/// Create payload for [`Label`].
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateLabel {
    /// Display name.
    pub name: String,
    /// Free text.
    pub description: Option<String>,
    /// `#RRGGBB`.
    pub color: String,
    /// Defaults to `true`.
    pub active: Option<bool>,
}

/// Update payload for [`Label`].
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateLabel {
    /// Display name.
    pub name: Option<String>,
    /// Free text.
    pub description: Option<String>,
    /// `#RRGGBB`.
    pub color: Option<String>,
    /// Status flag.
    pub active: Option<bool>,
}

impl Validate for CreateLabel {
    fn validate(&self) -> Result<(), DomainError> {
        Checker::new()
            .text("name", &self.name, MAX_NAME_LEN)
            .hex_color("color", &self.color)
            .optional_text("description", self.description.as_deref(), MAX_DESCRIPTION_LEN)
            .finish()
    }
}

impl Validate for UpdateLabel {
    fn validate(&self) -> Result<(), DomainError> {
        let mut c = Checker::new();
        if let Some(name) = &self.name {
            c.text("name", name, MAX_NAME_LEN);
        }
        if let Some(color) = &self.color {
            c.hex_color("color", color);
        }
        c.optional_text("description", self.description.as_deref(), MAX_DESCRIPTION_LEN)
            .finish()
    }
}

impl Entity for Label {
    type Create = CreateLabel;
    type Update = UpdateLabel;

    const RESOURCE: &'static str = "labels";
    const TABLE: &'static str = "labels";
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::text("name", "name").searchable().unique(),
        FieldSpec::text("description", "description").searchable(),
        FieldSpec::text("color", "color"),
    ];

    fn meta(&self) -> &RecordMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut RecordMeta {
        &mut self.meta
    }

    fn from_create(meta: RecordMeta, input: CreateLabel) -> Result<Self, DomainError> {
        Ok(Self {
            meta: meta.with_active(input.active),
            name: input.name.trim().to_string(),
            description: input.description.filter(|d| !d.trim().is_empty()),
            color: input.color.to_uppercase(),
        })
    }

    fn apply_update(&mut self, input: UpdateLabel) -> Result<(), DomainError> {
        set_if(&mut self.name, input.name.map(|s| s.trim().to_string()));
        if input.description.is_some() {
            self.description = input.description.filter(|d| !d.trim().is_empty());
        }
        set_if(&mut self.color, input.color.map(|c| c.to_uppercase()));
        set_if(&mut self.meta.active, input.active);
        Ok(())
    }
}

// -- Node ---------------------------------------------------------------------

/// A stop on the network: where passengers board or alight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    /// Identifier, status and timestamps.
    #[serde(flatten)]
    pub meta: RecordMeta,
    /// Short code, unique network-wide.
    pub code: String,
    /// Display name.
    pub name: String,
    /// City the node is in.
    pub city_id: i64,
    /// Installation hosting the node, if any.
    pub installation_id: Option<i64>,
    /// Passengers may board here.
    pub allows_boarding: bool,
    /// Passengers may alight here.
    pub allows_alighting: bool,
}

/// Create payload for [`Node`].
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateNode {
    /// Short code.
    pub code: String,
    /// Display name.
    pub name: String,
    /// City the node is in.
    pub city_id: i64,
    /// Hosting installation.
    pub installation_id: Option<i64>,
    /// Defaults to `true`.
    pub allows_boarding: Option<bool>,
    /// Defaults to `true`.
    pub allows_alighting: Option<bool>,
    /// Defaults to `true`.
    pub active: Option<bool>,
}

/// Update payload for [`Node`].
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateNode {
    /// Short code.
    pub code: Option<String>,
    /// Display name.
    pub name: Option<String>,
    /// City the node is in.
    pub city_id: Option<i64>,
    /// Hosting installation.
    pub installation_id: Option<i64>,
    /// Passengers may board here.
    pub allows_boarding: Option<bool>,
    /// Passengers may alight here.
    pub allows_alighting: Option<bool>,
    /// Status flag.
    pub active: Option<bool>,
}

impl Validate for CreateNode {
    fn validate(&self) -> Result<(), DomainError> {
        let mut c = Checker::new();
        c.code("code", &self.code)
            .text("name", &self.name, MAX_NAME_LEN)
            .id("cityId", self.city_id);
        if let Some(id) = self.installation_id {
            c.id("installationId", id);
        }
        c.finish()
    }
}

impl Validate for UpdateNode {
    fn validate(&self) -> Result<(), DomainError> {
        let mut c = Checker::new();
        if let Some(code) = &self.code {
            c.code("code", code);
        }
        if let Some(name) = &self.name {
            c.text("name", name, MAX_NAME_LEN);
        }
        if let Some(id) = self.city_id {
            c.id("cityId", id);
        }
        if let Some(id) = self.installation_id {
            c.id("installationId", id);
        }
        c.finish()
    }
}

impl Entity for Node {
    type Create = CreateNode;
    type Update = UpdateNode;

    const RESOURCE: &'static str = "nodes";
    const TABLE: &'static str = "nodes";
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::text("code", "code").searchable().unique(),
        FieldSpec::text("name", "name").searchable(),
        FieldSpec::integer("cityId", "city_id"),
        FieldSpec::integer("installationId", "installation_id"),
        FieldSpec::boolean("allowsBoarding", "allows_boarding"),
        FieldSpec::boolean("allowsAlighting", "allows_alighting"),
    ];

    fn meta(&self) -> &RecordMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut RecordMeta {
        &mut self.meta
    }

    fn from_create(meta: RecordMeta, input: CreateNode) -> Result<Self, DomainError> {
        Ok(Self {
            meta: meta.with_active(input.active),
            code: input.code.trim().to_string(),
            name: input.name.trim().to_string(),
            city_id: input.city_id,
            installation_id: input.installation_id,
            allows_boarding: input.allows_boarding.unwrap_or(true),
            allows_alighting: input.allows_alighting.unwrap_or(true),
        })
    }

    fn apply_update(&mut self, input: UpdateNode) -> Result<(), DomainError> {
        set_if(&mut self.code, input.code.map(|s| s.trim().to_string()));
        set_if(&mut self.name, input.name.map(|s| s.trim().to_string()));
        set_if(&mut self.city_id, input.city_id);
        if input.installation_id.is_some() {
            self.installation_id = input.installation_id;
        }
        set_if(&mut self.allows_boarding, input.allows_boarding);
        set_if(&mut self.allows_alighting, input.allows_alighting);
        set_if(&mut self.meta.active, input.active);
        Ok(())
    }

    fn references(&self) -> Vec<Reference> {
        let mut refs = vec![Reference::new("cityId", "cities", self.city_id)];
        if let Some(id) = self.installation_id {
            refs.push(Reference::new("installationId", "installations", id));
        }
        refs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn node_defaults_to_boarding_and_alighting() {
        let node = Node::from_create(
            RecordMeta::new(1, None, Utc::now()),
            CreateNode {
                code: "GDL-01".into(),
                name: "Guadalajara Central".into(),
                city_id: 2,
                installation_id: Some(5),
                allows_boarding: None,
                allows_alighting: Some(false),
                active: None,
            },
        )
        .unwrap();
        assert!(node.allows_boarding);
        assert!(!node.allows_alighting);
        let resources: Vec<_> = node.references().iter().map(|r| r.resource).collect();
        assert_eq!(resources, vec!["cities", "installations"]);
    }

    #[test]
    fn label_color_must_be_hex() {
        let input = CreateLabel {
            name: "Express".into(),
            description: None,
            color: "blue".into(),
            active: None,
        };
        assert!(input.validate().is_err());
    }

    #[test]
    fn label_color_is_uppercased() {
        let label = Label::from_create(
            RecordMeta::new(1, None, Utc::now()),
            CreateLabel {
                name: "Express".into(),
                description: None,
                color: "#ff00aa".into(),
                active: None,
            },
        )
        .unwrap();
        assert_eq!(label.color, "#FF00AA");
    }
}
