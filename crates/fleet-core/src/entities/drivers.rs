//! Drivers.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::entity::{set_if, Entity, FieldSpec, RecordMeta};
use crate::error::DomainError;
use crate::validate::{Checker, Validate, MAX_CODE_LEN, MAX_NAME_LEN};

/// Employment state of a driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DriverStatus {
    /// Available for assignment.
    #[default]
    Active,
    /// Not currently driving.
    Inactive,
    /// Barred from driving.
    Suspended,
    /// On leave.
    OnLeave,
}

/// A licensed bus driver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Driver {
    /// Identifier, status and timestamps.
    #[serde(flatten)]
    pub meta: RecordMeta,
    /// Employee key.
    pub driver_key: String,
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// Contact e-mail.
    pub email: String,
    /// Contact phone.
    pub phone: Option<String>,
    /// Driving license number.
    pub license_number: String,
    /// License class, e.g. `E`.
    pub license_class: String,
    /// Employment state.
    pub status: DriverStatus,
}

/// Create payload for [`Driver`].
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateDriver {
    /// Employee key.
    pub driver_key: String,
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// Contact e-mail.
    pub email: String,
    /// Contact phone.
    pub phone: Option<String>,
    /// Driving license number.
    pub license_number: String,
    /// License class.
    pub license_class: String,
    /// Defaults to `active`.
    pub status: Option<DriverStatus>,
    /// Defaults to `true`.
    pub active: Option<bool>,
}

/// Update payload for [`Driver`].
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDriver {
    /// Employee key.
    pub driver_key: Option<String>,
    /// Given name.
    pub first_name: Option<String>,
    /// Family name.
    pub last_name: Option<String>,
    /// Contact e-mail.
    pub email: Option<String>,
    /// Contact phone.
    pub phone: Option<String>,
    /// Driving license number.
    pub license_number: Option<String>,
    /// License class.
    pub license_class: Option<String>,
    /// Employment state.
    pub status: Option<DriverStatus>,
    /// Status flag.
    pub active: Option<bool>,
}

const MAX_PHONE_LEN: usize = 30;
const MAX_LICENSE_LEN: usize = 50;

impl Validate for CreateDriver {
    fn validate(&self) -> Result<(), DomainError> {
        Checker::new()
            .code("driverKey", &self.driver_key)
            .text("firstName", &self.first_name, MAX_NAME_LEN)
            .text("lastName", &self.last_name, MAX_NAME_LEN)
            .email("email", &self.email)
            .optional_text("phone", self.phone.as_deref(), MAX_PHONE_LEN)
            .text("licenseNumber", &self.license_number, MAX_LICENSE_LEN)
            .text("licenseClass", &self.license_class, MAX_CODE_LEN)
            .finish()
    }
}

impl Validate for UpdateDriver {
    fn validate(&self) -> Result<(), DomainError> {
        let mut c = Checker::new();
        if let Some(v) = &self.driver_key {
            c.code("driverKey", v);
        }
        if let Some(v) = &self.first_name {
            c.text("firstName", v, MAX_NAME_LEN);
        }
        if let Some(v) = &self.last_name {
            c.text("lastName", v, MAX_NAME_LEN);
        }
        if let Some(v) = &self.email {
            c.email("email", v);
        }
        if let Some(v) = &self.license_number {
            c.text("licenseNumber", v, MAX_LICENSE_LEN);
        }
        if let Some(v) = &self.license_class {
            c.text("licenseClass", v, MAX_CODE_LEN);
        }
        c.optional_text("phone", self.phone.as_deref(), MAX_PHONE_LEN)
            .finish()
    }
}

impl Entity for Driver {
    type Create = CreateDriver;
    type Update = UpdateDriver;

    const RESOURCE: &'static str = "drivers";
    const TABLE: &'static str = "drivers";
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::text("driverKey", "driver_key").searchable().unique(),
        FieldSpec::text("firstName", "first_name").searchable(),
        FieldSpec::text("lastName", "last_name").searchable(),
        FieldSpec::text("email", "email").searchable().unique(),
        FieldSpec::text("phone", "phone"),
        FieldSpec::text("licenseNumber", "license_number").unique(),
        FieldSpec::text("licenseClass", "license_class"),
        FieldSpec::text("status", "status"),
    ];

    fn meta(&self) -> &RecordMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut RecordMeta {
        &mut self.meta
    }

    fn from_create(meta: RecordMeta, input: CreateDriver) -> Result<Self, DomainError> {
        Ok(Self {
            meta: meta.with_active(input.active),
            driver_key: input.driver_key.trim().to_string(),
            first_name: input.first_name.trim().to_string(),
            last_name: input.last_name.trim().to_string(),
            email: input.email.trim().to_lowercase(),
            phone: input
                .phone
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty()),
            license_number: input.license_number.trim().to_string(),
            license_class: input.license_class.trim().to_uppercase(),
            status: input.status.unwrap_or_default(),
        })
    }

    fn apply_update(&mut self, input: UpdateDriver) -> Result<(), DomainError> {
        set_if(&mut self.driver_key, input.driver_key.map(|s| s.trim().to_string()));
        set_if(&mut self.first_name, input.first_name.map(|s| s.trim().to_string()));
        set_if(&mut self.last_name, input.last_name.map(|s| s.trim().to_string()));
        set_if(&mut self.email, input.email.map(|s| s.trim().to_lowercase()));
        if let Some(phone) = input.phone {
            let phone = phone.trim().to_string();
            self.phone = (!phone.is_empty()).then_some(phone);
        }
        set_if(
            &mut self.license_number,
            input.license_number.map(|s| s.trim().to_string()),
        );
        set_if(
            &mut self.license_class,
            input.license_class.map(|s| s.trim().to_uppercase()),
        );
        set_if(&mut self.status, input.status);
        set_if(&mut self.meta.active, input.active);
        Ok(())
    }
}
