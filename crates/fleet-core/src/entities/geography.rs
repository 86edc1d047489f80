//! Countries, states and cities.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::entity::{set_if, Entity, FieldSpec, RecordMeta, Reference};
use crate::error::DomainError;
use crate::validate::{Checker, Validate, MAX_NAME_LEN};

// -- Country ------------------------------------------------------------------

/// A country.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Country {
    /// Identifier, status and timestamps.
    #[serde(flatten)]
    pub meta: RecordMeta,
    /// Display name.
    pub name: String,
    /// ISO-style short code, e.g. `MX`.
    pub code: String,
}

/// Create payload for [`Country`].
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateCountry {
    /// Display name.
    pub name: String,
    /// Short code.
    pub code: String,
    /// Defaults to `true`.
    pub active: Option<bool>,
}

/// Update payload for [`Country`].
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCountry {
    /// Display name.
    pub name: Option<String>,
    /// Short code.
    pub code: Option<String>,
    /// Status flag.
    pub active: Option<bool>,
}

impl Validate for CreateCountry {
    fn validate(&self) -> Result<(), DomainError> {
        Checker::new()
            .text("name", &self.name, MAX_NAME_LEN)
            .code("code", &self.code)
            .finish()
    }
}

impl Validate for UpdateCountry {
    fn validate(&self) -> Result<(), DomainError> {
        let mut c = Checker::new();
        if let Some(name) = &self.name {
            c.text("name", name, MAX_NAME_LEN);
        }
        if let Some(code) = &self.code {
            c.code("code", code);
        }
        c.finish()
    }
}

impl Entity for Country {
    type Create = CreateCountry;
    type Update = UpdateCountry;

    const RESOURCE: &'static str = "countries";
    const TABLE: &'static str = "countries";
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::text("name", "name").searchable().unique(),
        FieldSpec::text("code", "code").searchable().unique(),
    ];

    fn meta(&self) -> &RecordMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut RecordMeta {
        &mut self.meta
    }

    fn from_create(meta: RecordMeta, input: CreateCountry) -> Result<Self, DomainError> {
        Ok(Self {
            meta: meta.with_active(input.active),
            name: input.name.trim().to_string(),
            code: input.code.trim().to_string(),
        })
    }

    fn apply_update(&mut self, input: UpdateCountry) -> Result<(), DomainError> {
        set_if(&mut self.name, input.name.map(|s| s.trim().to_string()));
        set_if(&mut self.code, input.code.map(|s| s.trim().to_string()));
        set_if(&mut self.meta.active, input.active);
        Ok(())
    }
}

// -- State --------------------------------------------------------------------

/// A state or province within a country.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct State {
    /// Identifier, status and timestamps.
    #[serde(flatten)]
    pub meta: RecordMeta,
    /// Display name.
    pub name: String,
    /// Short code, e.g. `JAL`.
    pub code: String,
    /// Owning country.
    pub country_id: i64,
}

/// Create payload for [`State`].
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateState {
    /// Display name.
    pub name: String,
    /// Short code.
    pub code: String,
    /// Owning country.
    pub country_id: i64,
    /// Defaults to `true`.
    pub active: Option<bool>,
}

/// Update payload for [`State`].
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateState {
    /// Display name.
    pub name: Option<String>,
    /// Short code.
    pub code: Option<String>,
    /// Owning country.
    pub country_id: Option<i64>,
    /// Status flag.
    pub active: Option<bool>,
}

impl Validate for CreateState {
    fn validate(&self) -> Result<(), DomainError> {
        Checker::new()
            .text("name", &self.name, MAX_NAME_LEN)
            .code("code", &self.code)
            .id("countryId", self.country_id)
            .finish()
    }
}

impl Validate for UpdateState {
    fn validate(&self) -> Result<(), DomainError> {
        let mut c = Checker::new();
        if let Some(name) = &self.name {
            c.text("name", name, MAX_NAME_LEN);
        }
        if let Some(code) = &self.code {
            c.code("code", code);
        }
        if let Some(id) = self.country_id {
            c.id("countryId", id);
        }
        c.finish()
    }
}

impl Entity for State {
    type Create = CreateState;
    type Update = UpdateState;

    const RESOURCE: &'static str = "states";
    const TABLE: &'static str = "states";
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::text("name", "name").searchable().unique(),
        FieldSpec::text("code", "code").searchable().unique(),
        FieldSpec::integer("countryId", "country_id"),
    ];

    fn meta(&self) -> &RecordMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut RecordMeta {
        &mut self.meta
    }

    fn from_create(meta: RecordMeta, input: CreateState) -> Result<Self, DomainError> {
        Ok(Self {
            meta: meta.with_active(input.active),
            name: input.name.trim().to_string(),
            code: input.code.trim().to_string(),
            country_id: input.country_id,
        })
    }

    fn apply_update(&mut self, input: UpdateState) -> Result<(), DomainError> {
        set_if(&mut self.name, input.name.map(|s| s.trim().to_string()));
        set_if(&mut self.code, input.code.map(|s| s.trim().to_string()));
        set_if(&mut self.country_id, input.country_id);
        set_if(&mut self.meta.active, input.active);
        Ok(())
    }

    fn references(&self) -> Vec<Reference> {
        vec![Reference::new("countryId", "countries", self.country_id)]
    }
}

// -- City ---------------------------------------------------------------------

/// A city within a state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct City {
    /// Identifier, status and timestamps.
    #[serde(flatten)]
    pub meta: RecordMeta,
    /// Display name.
    pub name: String,
    /// URL-safe unique name, derived from `name` when not given.
    pub slug: String,
    /// Owning state.
    pub state_id: i64,
    /// IANA time zone, e.g. `America/Mexico_City`.
    pub timezone: String,
    /// Latitude in degrees.
    pub latitude: Option<f64>,
    /// Longitude in degrees.
    pub longitude: Option<f64>,
}

/// Create payload for [`City`].
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateCity {
    /// Display name.
    pub name: String,
    /// Optional explicit slug.
    pub slug: Option<String>,
    /// Owning state.
    pub state_id: i64,
    /// IANA time zone.
    pub timezone: String,
    /// Latitude in degrees.
    pub latitude: Option<f64>,
    /// Longitude in degrees.
    pub longitude: Option<f64>,
    /// Defaults to `true`.
    pub active: Option<bool>,
}

/// Update payload for [`City`].
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCity {
    /// Display name.
    pub name: Option<String>,
    /// Slug.
    pub slug: Option<String>,
    /// Owning state.
    pub state_id: Option<i64>,
    /// IANA time zone.
    pub timezone: Option<String>,
    /// Latitude in degrees.
    pub latitude: Option<f64>,
    /// Longitude in degrees.
    pub longitude: Option<f64>,
    /// Status flag.
    pub active: Option<bool>,
}

/// Lowercase, ASCII-alphanumeric words joined by `-`.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.trim().chars() {
        let c = match c {
            'á' | 'à' | 'ä' | 'â' | 'Á' => 'a',
            'é' | 'è' | 'ë' | 'ê' | 'É' => 'e',
            'í' | 'ì' | 'ï' | 'î' | 'Í' => 'i',
            'ó' | 'ò' | 'ö' | 'ô' | 'Ó' => 'o',
            'ú' | 'ù' | 'ü' | 'û' | 'Ú' => 'u',
            'ñ' | 'Ñ' => 'n',
            other => other,
        };
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.ends_with('-') && !slug.is_empty() {
            slug.push('-');
        }
    }
    slug.trim_end_matches('-').to_string()
}

fn check_slug(c: &mut Checker, slug: &str) {
    let before = c.errors().len();
    c.text("slug", slug, MAX_NAME_LEN);
    let valid = slug
        .chars()
        .all(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '-');
    if c.errors().len() == before && !valid {
        c.push(
            crate::error::FieldError::new(
                "slug",
                crate::error::FieldErrorCode::InvalidFormat,
                "slug may only contain lowercase letters, digits and '-'",
            )
            .with_value(slug),
        );
    }
}

fn check_coordinates(c: &mut Checker, latitude: Option<f64>, longitude: Option<f64>) {
    if let Some(lat) = latitude {
        c.range_f64("latitude", lat, -90.0, 90.0);
    }
    if let Some(lng) = longitude {
        c.range_f64("longitude", lng, -180.0, 180.0);
    }
}

impl Validate for CreateCity {
    fn validate(&self) -> Result<(), DomainError> {
        let mut c = Checker::new();
        c.text("name", &self.name, MAX_NAME_LEN)
            .id("stateId", self.state_id)
            .text("timezone", &self.timezone, 64);
        match &self.slug {
            Some(slug) => check_slug(&mut c, slug),
            None if !self.name.trim().is_empty() && slugify(&self.name).is_empty() => {
                check_slug(&mut c, "")
            }
            None => {}
        }
        check_coordinates(&mut c, self.latitude, self.longitude);
        c.finish()
    }
}

impl Validate for UpdateCity {
    fn validate(&self) -> Result<(), DomainError> {
        let mut c = Checker::new();
        if let Some(name) = &self.name {
            c.text("name", name, MAX_NAME_LEN);
        }
        if let Some(slug) = &self.slug {
            check_slug(&mut c, slug);
        }
        if let Some(id) = self.state_id {
            c.id("stateId", id);
        }
        if let Some(tz) = &self.timezone {
            c.text("timezone", tz, 64);
        }
        check_coordinates(&mut c, self.latitude, self.longitude);
        c.finish()
    }
}

impl Entity for City {
    type Create = CreateCity;
    type Update = UpdateCity;

    const RESOURCE: &'static str = "cities";
    const TABLE: &'static str = "cities";
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::text("name", "name").searchable(),
        FieldSpec::text("slug", "slug").searchable().unique(),
        FieldSpec::integer("stateId", "state_id"),
        FieldSpec::text("timezone", "timezone"),
        FieldSpec::float("latitude", "latitude"),
        FieldSpec::float("longitude", "longitude"),
    ];

    fn meta(&self) -> &RecordMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut RecordMeta {
        &mut self.meta
    }

    fn from_create(meta: RecordMeta, input: CreateCity) -> Result<Self, DomainError> {
        let slug = input
            .slug
            .map(|s| s.trim().to_string())
            .unwrap_or_else(|| slugify(&input.name));
        Ok(Self {
            meta: meta.with_active(input.active),
            name: input.name.trim().to_string(),
            slug,
            state_id: input.state_id,
            timezone: input.timezone.trim().to_string(),
            latitude: input.latitude,
            longitude: input.longitude,
        })
    }

    fn apply_update(&mut self, input: UpdateCity) -> Result<(), DomainError> {
        set_if(&mut self.name, input.name.map(|s| s.trim().to_string()));
        set_if(&mut self.slug, input.slug.map(|s| s.trim().to_string()));
        set_if(&mut self.state_id, input.state_id);
        set_if(&mut self.timezone, input.timezone.map(|s| s.trim().to_string()));
        if input.latitude.is_some() {
            self.latitude = input.latitude;
        }
        if input.longitude.is_some() {
            self.longitude = input.longitude;
        }
        set_if(&mut self.meta.active, input.active);
        Ok(())
    }

    fn references(&self) -> Vec<Reference> {
        vec![Reference::new("stateId", "states", self.state_id)]
    }
}
