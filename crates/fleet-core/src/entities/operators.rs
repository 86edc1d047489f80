//! Transporters (operating companies) and the bus lines they run.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::entity::{set_if, Entity, FieldSpec, RecordMeta, Reference};
use crate::error::DomainError;
use crate::validate::{Checker, Validate, MAX_DESCRIPTION_LEN, MAX_NAME_LEN};

const MAX_URL_LEN: usize = 500;
const MAX_PHONE_LEN: usize = 30;

fn trimmed(s: Option<String>) -> Option<String> {
    s.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

// -- Transporter --------------------------------------------------------------

/// A company operating buses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Transporter {
    /// Identifier, status and timestamps.
    #[serde(flatten)]
    pub meta: RecordMeta,
    /// Legal or trade name.
    pub name: String,
    /// Short code.
    pub code: String,
    /// Free text.
    pub description: Option<String>,
    /// Public website.
    pub website: Option<String>,
    /// Contact e-mail.
    pub email: Option<String>,
    /// Contact phone.
    pub phone: Option<String>,
    /// City of the head office.
    pub headquarter_city_id: Option<i64>,
}

/// Create payload for [`Transporter`].
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateTransporter {
    /// Legal or trade name.
    pub name: String,
    /// Short code.
    pub code: String,
    /// Free text.
    pub description: Option<String>,
    /// Public website.
    pub website: Option<String>,
    /// Contact e-mail.
    pub email: Option<String>,
    /// Contact phone.
    pub phone: Option<String>,
    /// City of the head office.
    pub headquarter_city_id: Option<i64>,
    /// Defaults to `true`.
    pub active: Option<bool>,
}

/// Update payload for [`Transporter`].
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTransporter {
    /// Legal or trade name.
    pub name: Option<String>,
    /// Short code.
    pub code: Option<String>,
    /// Free text.
    pub description: Option<String>,
    /// Public website.
    pub website: Option<String>,
    /// Contact e-mail.
    pub email: Option<String>,
    /// Contact phone.
    pub phone: Option<String>,
    /// City of the head office.
    pub headquarter_city_id: Option<i64>,
    /// Status flag.
    pub active: Option<bool>,
}

fn check_contact(
    c: &mut Checker,
    website: Option<&str>,
    email: Option<&str>,
    phone: Option<&str>,
) {
    if let Some(url) = website.filter(|s| !s.trim().is_empty()) {
        c.url("website", url).optional_text("website", Some(url), MAX_URL_LEN);
    }
    if let Some(email) = email.filter(|s| !s.trim().is_empty()) {
        c.email("email", email);
    }
    c.optional_text("phone", phone, MAX_PHONE_LEN);
}

impl Validate for CreateTransporter {
    fn validate(&self) -> Result<(), DomainError> {
        let mut c = Checker::new();
        c.text("name", &self.name, MAX_NAME_LEN)
            .code("code", &self.code)
            .optional_text("description", self.description.as_deref(), MAX_DESCRIPTION_LEN);
        check_contact(
            &mut c,
            self.website.as_deref(),
            self.email.as_deref(),
            self.phone.as_deref(),
        );
        if let Some(id) = self.headquarter_city_id {
            c.id("headquarterCityId", id);
        }
        c.finish()
    }
}

impl Validate for UpdateTransporter {
    fn validate(&self) -> Result<(), DomainError> {
        let mut c = Checker::new();
        if let Some(name) = &self.name {
            c.text("name", name, MAX_NAME_LEN);
        }
        if let Some(code) = &self.code {
            c.code("code", code);
        }
        c.optional_text("description", self.description.as_deref(), MAX_DESCRIPTION_LEN);
        check_contact(
            &mut c,
            self.website.as_deref(),
            self.email.as_deref(),
            self.phone.as_deref(),
        );
        if let Some(id) = self.headquarter_city_id {
            c.id("headquarterCityId", id);
        }
        c.finish()
    }
}

impl Entity for Transporter {
    type Create = CreateTransporter;
    type Update = UpdateTransporter;

    const RESOURCE: &'static str = "transporters";
    const TABLE: &'static str = "transporters";
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::text("name", "name").searchable().unique(),
        FieldSpec::text("code", "code").searchable().unique(),
        FieldSpec::text("description", "description"),
        FieldSpec::text("website", "website"),
        FieldSpec::text("email", "email"),
        FieldSpec::text("phone", "phone"),
        FieldSpec::integer("headquarterCityId", "headquarter_city_id"),
    ];

    fn meta(&self) -> &RecordMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut RecordMeta {
        &mut self.meta
    }

    fn from_create(meta: RecordMeta, input: CreateTransporter) -> Result<Self, DomainError> {
        Ok(Self {
            meta: meta.with_active(input.active),
            name: input.name.trim().to_string(),
            code: input.code.trim().to_uppercase(),
            description: trimmed(input.description),
            website: trimmed(input.website),
            email: trimmed(input.email).map(|e| e.to_lowercase()),
            phone: trimmed(input.phone),
            headquarter_city_id: input.headquarter_city_id,
        })
    }

    fn apply_update(&mut self, input: UpdateTransporter) -> Result<(), DomainError> {
        set_if(&mut self.name, input.name.map(|s| s.trim().to_string()));
        set_if(&mut self.code, input.code.map(|s| s.trim().to_uppercase()));
        if input.description.is_some() {
            self.description = trimmed(input.description);
        }
        if input.website.is_some() {
            self.website = trimmed(input.website);
        }
        if input.email.is_some() {
            self.email = trimmed(input.email).map(|e| e.to_lowercase());
        }
        if input.phone.is_some() {
            self.phone = trimmed(input.phone);
        }
        if input.headquarter_city_id.is_some() {
            self.headquarter_city_id = input.headquarter_city_id;
        }
        set_if(&mut self.meta.active, input.active);
        Ok(())
    }

    fn references(&self) -> Vec<Reference> {
        self.headquarter_city_id
            .map(|id| Reference::new("headquarterCityId", "cities", id))
            .into_iter()
            .collect()
    }
}

// -- BusLine ------------------------------------------------------------------

/// A commercial line: a transporter selling one service type under a brand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BusLine {
    /// Identifier, status and timestamps.
    #[serde(flatten)]
    pub meta: RecordMeta,
    /// Display name.
    pub name: String,
    /// Short code.
    pub code: String,
    /// Operating company.
    pub transporter_id: i64,
    /// Class of service.
    pub service_type_id: i64,
    /// Free text.
    pub description: Option<String>,
}

/// Create payload for [`BusLine`].
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateBusLine {
    /// Display name.
    pub name: String,
    /// Short code.
    pub code: String,
    /// Operating company.
    pub transporter_id: i64,
    /// Class of service.
    pub service_type_id: i64,
    /// Free text.
    pub description: Option<String>,
    /// Defaults to `true`.
    pub active: Option<bool>,
}

/// Update payload for [`BusLine`].
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBusLine {
    /// Display name.
    pub name: Option<String>,
    /// Short code.
    pub code: Option<String>,
    /// Operating company.
    pub transporter_id: Option<i64>,
    /// Class of service.
    pub service_type_id: Option<i64>,
    /// Free text.
    pub description: Option<String>,
    /// Status flag.
    pub active: Option<bool>,
}

impl Validate for CreateBusLine {
    fn validate(&self) -> Result<(), DomainError> {
        Checker::new()
            .text("name", &self.name, MAX_NAME_LEN)
            .code("code", &self.code)
            .id("transporterId", self.transporter_id)
            .id("serviceTypeId", self.service_type_id)
            .optional_text("description", self.description.as_deref(), MAX_DESCRIPTION_LEN)
            .finish()
    }
}

impl Validate for UpdateBusLine {
    fn validate(&self) -> Result<(), DomainError> {
        let mut c = Checker::new();
        if let Some(name) = &self.name {
            c.text("name", name, MAX_NAME_LEN);
        }
        if let Some(code) = &self.code {
            c.code("code", code);
        }
        if let Some(id) = self.transporter_id {
            c.id("transporterId", id);
        }
        if let Some(id) = self.service_type_id {
            c.id("serviceTypeId", id);
        }
        c.optional_text("description", self.description.as_deref(), MAX_DESCRIPTION_LEN)
            .finish()
    }
}

impl Entity for BusLine {
    type Create = CreateBusLine;
    type Update = UpdateBusLine;

    const RESOURCE: &'static str = "bus-lines";
    const TABLE: &'static str = "bus_lines";
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::text("name", "name").searchable(),
        FieldSpec::text("code", "code").searchable().unique(),
        FieldSpec::integer("transporterId", "transporter_id"),
        FieldSpec::integer("serviceTypeId", "service_type_id"),
        FieldSpec::text("description", "description"),
    ];

    fn meta(&self) -> &RecordMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut RecordMeta {
        &mut self.meta
    }

    fn from_create(meta: RecordMeta, input: CreateBusLine) -> Result<Self, DomainError> {
        Ok(Self {
            meta: meta.with_active(input.active),
            name: input.name.trim().to_string(),
            code: input.code.trim().to_string(),
            transporter_id: input.transporter_id,
            service_type_id: input.service_type_id,
            description: trimmed(input.description),
        })
    }

    fn apply_update(&mut self, input: UpdateBusLine) -> Result<(), DomainError> {
        set_if(&mut self.name, input.name.map(|s| s.trim().to_string()));
        set_if(&mut self.code, input.code.map(|s| s.trim().to_string()));
        set_if(&mut self.transporter_id, input.transporter_id);
        set_if(&mut self.service_type_id, input.service_type_id);
        if input.description.is_some() {
            self.description = trimmed(input.description);
        }
        set_if(&mut self.meta.active, input.active);
        Ok(())
    }

    fn references(&self) -> Vec<Reference> {
        vec![
            Reference::new("transporterId", "transporters", self.transporter_id),
            Reference::new("serviceTypeId", "service-types", self.service_type_id),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn transporter_contact_validation() {
        let input = CreateTransporter {
            name: "Autobuses del Norte".into(),
            code: "ADN".into(),
            description: None,
            website: Some("www.example".into()),
            email: Some("contact@".into()),
            phone: None,
            headquarter_city_id: Some(0),
            active: None,
        };
        let err = input.validate().unwrap_err();
        let fields: Vec<_> = err
            .field_errors()
            .unwrap()
            .iter()
            .map(|e| e.field.as_str())
            .collect();
        assert_eq!(fields, vec!["website", "email", "headquarterCityId"]);
    }

    #[test]
    fn blank_optional_contact_is_accepted() {
        let input = CreateTransporter {
            name: "Autobuses del Norte".into(),
            code: "adn".into(),
            description: None,
            website: Some(" ".into()),
            email: Some("".into()),
            phone: None,
            headquarter_city_id: None,
            active: None,
        };
        assert!(input.validate().is_ok());
        let t = Transporter::from_create(RecordMeta::new(1, None, Utc::now()), input).unwrap();
        assert_eq!(t.website, None);
        assert_eq!(t.code, "ADN");
    }

    #[test]
    fn bus_line_references_both_parents() {
        let line = BusLine::from_create(
            RecordMeta::new(1, None, Utc::now()),
            CreateBusLine {
                name: "Norte Plus".into(),
                code: "NP".into(),
                transporter_id: 2,
                service_type_id: 3,
                description: None,
                active: None,
            },
        )
        .unwrap();
        let refs = line.references();
        assert_eq!(refs[0].resource, "transporters");
        assert_eq!(refs[1].id, 3);
    }
}
