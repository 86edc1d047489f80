//! Service types, bus models, seat diagrams and buses.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::entity::{set_if, Entity, FieldSpec, RecordMeta, Reference};
use crate::error::{DomainError, FieldError, FieldErrorCode};
use crate::seat_layout::{SeatLayout, MAX_FLOORS};
use crate::validate::{Checker, Validate, MAX_CODE_LEN, MAX_DESCRIPTION_LEN, MAX_NAME_LEN};

/// Earliest accepted model/manufacturing year.
pub const MIN_YEAR: i64 = 1900;
/// Latest accepted model/manufacturing year.
pub const MAX_YEAR: i64 = 2100;
/// Upper bound for seating capacities.
pub const MAX_CAPACITY: i64 = 200;

fn trimmed(s: Option<String>) -> Option<String> {
    s.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

// -- ServiceType --------------------------------------------------------------

/// Class of service sold on a line (economy, executive, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ServiceType {
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

/// Create payload for [`ServiceType`].
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateServiceType {
    /// Display name.
    pub name: String,
    /// Short code.
    pub code: String,
    /// Free text.
    pub description: Option<String>,
    /// Defaults to `true`.
    pub active: Option<bool>,
}

/// Update payload for [`ServiceType`].
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateServiceType {
    /// Display name.
    pub name: Option<String>,
    /// Short code.
    pub code: Option<String>,
    /// Free text.
    pub description: Option<String>,
    /// Status flag.
    pub active: Option<bool>,
}

impl Validate for CreateServiceType {
    fn validate(&self) -> Result<(), DomainError> {
        Checker::new()
            .text("name", &self.name, MAX_NAME_LEN)
            .code("code", &self.code)
            .optional_text("description", self.description.as_deref(), MAX_DESCRIPTION_LEN)
            .finish()
    }
}

impl Validate for UpdateServiceType {
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

impl Entity for ServiceType {
    type Create = CreateServiceType;
    type Update = UpdateServiceType;

    const RESOURCE: &'static str = "service-types";
    const TABLE: &'static str = "service_types";
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

    fn from_create(meta: RecordMeta, input: CreateServiceType) -> Result<Self, DomainError> {
        Ok(Self {
            meta: meta.with_active(input.active),
            name: input.name.trim().to_string(),
            code: input.code.trim().to_string(),
            description: trimmed(input.description),
        })
    }

    fn apply_update(&mut self, input: UpdateServiceType) -> Result<(), DomainError> {
        set_if(&mut self.name, input.name.map(|s| s.trim().to_string()));
        set_if(&mut self.code, input.code.map(|s| s.trim().to_string()));
        if input.description.is_some() {
            self.description = trimmed(input.description);
        }
        set_if(&mut self.meta.active, input.active);
        Ok(())
    }
}

// -- BusModel -----------------------------------------------------------------

/// A manufacturer's bus model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BusModel {
    /// Identifier, status and timestamps.
    #[serde(flatten)]
    pub meta: RecordMeta,
    /// Manufacturer name.
    pub manufacturer: String,
    /// Model name.
    pub model: String,
    /// Model year.
    pub year: i64,
    /// Passenger seats.
    pub seating_capacity: i64,
    /// Decks (1 or 2).
    pub num_floors: i64,
    /// Engine description, e.g. `diesel`.
    pub engine_type: Option<String>,
}

/// Create payload for [`BusModel`].
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateBusModel {
    /// Manufacturer name.
    pub manufacturer: String,
    /// Model name.
    pub model: String,
    /// Model year.
    pub year: i64,
    /// Passenger seats.
    pub seating_capacity: i64,
    /// Defaults to 1.
    pub num_floors: Option<i64>,
    /// Engine description.
    pub engine_type: Option<String>,
    /// Defaults to `true`.
    pub active: Option<bool>,
}

/// Update payload for [`BusModel`].
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBusModel {
    /// Manufacturer name.
    pub manufacturer: Option<String>,
    /// Model name.
    pub model: Option<String>,
    /// Model year.
    pub year: Option<i64>,
    /// Passenger seats.
    pub seating_capacity: Option<i64>,
    /// Decks.
    pub num_floors: Option<i64>,
    /// Engine description.
    pub engine_type: Option<String>,
    /// Status flag.
    pub active: Option<bool>,
}

impl Validate for CreateBusModel {
    fn validate(&self) -> Result<(), DomainError> {
        let mut c = Checker::new();
        c.text("manufacturer", &self.manufacturer, MAX_NAME_LEN)
            .text("model", &self.model, MAX_NAME_LEN)
            .range_i64("year", self.year, MIN_YEAR, MAX_YEAR)
            .range_i64("seatingCapacity", self.seating_capacity, 1, MAX_CAPACITY)
            .optional_text("engineType", self.engine_type.as_deref(), 100);
        if let Some(floors) = self.num_floors {
            c.range_i64("numFloors", floors, 1, MAX_FLOORS as i64);
        }
        c.finish()
    }
}

impl Validate for UpdateBusModel {
    fn validate(&self) -> Result<(), DomainError> {
        let mut c = Checker::new();
        if let Some(v) = &self.manufacturer {
            c.text("manufacturer", v, MAX_NAME_LEN);
        }
        if let Some(v) = &self.model {
            c.text("model", v, MAX_NAME_LEN);
        }
        if let Some(v) = self.year {
            c.range_i64("year", v, MIN_YEAR, MAX_YEAR);
        }
        if let Some(v) = self.seating_capacity {
            c.range_i64("seatingCapacity", v, 1, MAX_CAPACITY);
        }
        if let Some(v) = self.num_floors {
            c.range_i64("numFloors", v, 1, MAX_FLOORS as i64);
        }
        c.optional_text("engineType", self.engine_type.as_deref(), 100)
            .finish()
    }
}

impl Entity for BusModel {
    type Create = CreateBusModel;
    type Update = UpdateBusModel;

    const RESOURCE: &'static str = "bus-models";
    const TABLE: &'static str = "bus_models";
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::text("manufacturer", "manufacturer").searchable(),
        FieldSpec::text("model", "model").searchable(),
        FieldSpec::integer("year", "year"),
        FieldSpec::integer("seatingCapacity", "seating_capacity"),
        FieldSpec::integer("numFloors", "num_floors"),
        FieldSpec::text("engineType", "engine_type"),
    ];

    fn meta(&self) -> &RecordMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut RecordMeta {
        &mut self.meta
    }

    fn from_create(meta: RecordMeta, input: CreateBusModel) -> Result<Self, DomainError> {
        Ok(Self {
            meta: meta.with_active(input.active),
            manufacturer: input.manufacturer.trim().to_string(),
            model: input.model.trim().to_string(),
            year: input.year,
            seating_capacity: input.seating_capacity,
            num_floors: input.num_floors.unwrap_or(1),
            engine_type: trimmed(input.engine_type),
        })
    }

    fn apply_update(&mut self, input: UpdateBusModel) -> Result<(), DomainError> {
        set_if(&mut self.manufacturer, input.manufacturer.map(|s| s.trim().to_string()));
        set_if(&mut self.model, input.model.map(|s| s.trim().to_string()));
        set_if(&mut self.year, input.year);
        set_if(&mut self.seating_capacity, input.seating_capacity);
        set_if(&mut self.num_floors, input.num_floors);
        if input.engine_type.is_some() {
            self.engine_type = trimmed(input.engine_type);
        }
        set_if(&mut self.meta.active, input.active);
        Ok(())
    }
}

// -- SeatDiagram --------------------------------------------------------------

/// A seat map template: the grid of seats, hallways and facilities of a bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SeatDiagram {
    /// Identifier, status and timestamps.
    #[serde(flatten)]
    pub meta: RecordMeta,
    /// Display name.
    pub name: String,
    /// Model the diagram was drawn for.
    pub bus_model_id: Option<i64>,
    /// Seats the diagram may hold.
    pub max_capacity: i64,
    /// Decks in the layout.
    pub num_floors: i64,
    /// Seats in the layout; derived.
    pub total_seats: i64,
    /// The grid.
    #[schema(value_type = Object)]
    pub layout: SeatLayout,
}

/// Create payload for [`SeatDiagram`].
///
/// Either `layout` is supplied, or a regular grid is generated from
/// `rowsPerFloor` and `seatsPerRow`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateSeatDiagram {
    /// Display name.
    pub name: String,
    /// Model the diagram was drawn for.
    pub bus_model_id: Option<i64>,
    /// Seats the diagram may hold.
    pub max_capacity: i64,
    /// Defaults to 1.
    pub num_floors: Option<i64>,
    /// Explicit grid.
    #[schema(value_type = Option<Object>)]
    pub layout: Option<SeatLayout>,
    /// Rows per floor of a generated grid; defaults to 10.
    pub rows_per_floor: Option<i64>,
    /// Seats per row of a generated grid; defaults to 4.
    pub seats_per_row: Option<i64>,
    /// Defaults to `true`.
    pub active: Option<bool>,
}

/// Update payload for [`SeatDiagram`]. The grid itself is edited through
/// the layout endpoints.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSeatDiagram {
    /// Display name.
    pub name: Option<String>,
    /// Model the diagram was drawn for.
    pub bus_model_id: Option<i64>,
    /// Seats the diagram may hold.
    pub max_capacity: Option<i64>,
    /// Status flag.
    pub active: Option<bool>,
}

const DEFAULT_ROWS_PER_FLOOR: i64 = 10;
const DEFAULT_SEATS_PER_ROW: i64 = 4;

impl Validate for CreateSeatDiagram {
    fn validate(&self) -> Result<(), DomainError> {
        let mut c = Checker::new();
        c.text("name", &self.name, MAX_NAME_LEN)
            .range_i64("maxCapacity", self.max_capacity, 1, MAX_CAPACITY);
        if let Some(id) = self.bus_model_id {
            c.id("busModelId", id);
        }
        if let Some(floors) = self.num_floors {
            c.range_i64("numFloors", floors, 1, MAX_FLOORS as i64);
        }
        if self.layout.is_none() {
            if let Some(rows) = self.rows_per_floor {
                c.range_i64("rowsPerFloor", rows, 1, 20);
            }
            if let Some(seats) = self.seats_per_row {
                c.range_i64("seatsPerRow", seats, 2, 6);
            }
        }
        c.finish()
    }
}

impl Validate for UpdateSeatDiagram {
    fn validate(&self) -> Result<(), DomainError> {
        let mut c = Checker::new();
        if let Some(name) = &self.name {
            c.text("name", name, MAX_NAME_LEN);
        }
        if let Some(id) = self.bus_model_id {
            c.id("busModelId", id);
        }
        if let Some(cap) = self.max_capacity {
            c.range_i64("maxCapacity", cap, 1, MAX_CAPACITY);
        }
        c.finish()
    }
}

impl SeatDiagram {
    /// Replace the grid, renumbering seats and refreshing derived counts.
    ///
    /// The layout must satisfy the grid rules and its seat count must not
    /// exceed `maxCapacity`. On error the diagram is left unchanged.
    pub fn set_layout(&mut self, mut layout: SeatLayout) -> Result<(), DomainError> {
        layout.validate()?;
        layout.renumber();
        check_capacity(layout.total_seats() as i64, self.max_capacity)?;
        self.num_floors = layout.floors.len() as i64;
        self.total_seats = layout.total_seats() as i64;
        self.layout = layout;
        Ok(())
    }

    /// Apply an edit to a copy of the grid and keep it if the result is valid.
    pub fn edit_layout<F>(&mut self, edit: F) -> Result<(), DomainError>
    where
        F: FnOnce(&mut SeatLayout) -> Result<(), crate::seat_layout::LayoutError>,
    {
        let mut layout = self.layout.clone();
        edit(&mut layout)?;
        self.set_layout(layout)
    }
}

fn check_capacity(total_seats: i64, max_capacity: i64) -> Result<(), DomainError> {
    if total_seats > max_capacity {
        return Err(DomainError::Validation(vec![FieldError::new(
            "totalSeats",
            FieldErrorCode::OutOfRange,
            format!("layout has {total_seats} seats but maxCapacity is {max_capacity}"),
        )
        .with_value(total_seats)]));
    }
    Ok(())
}

impl Entity for SeatDiagram {
    type Create = CreateSeatDiagram;
    type Update = UpdateSeatDiagram;

    const RESOURCE: &'static str = "seat-diagrams";
    const TABLE: &'static str = "seat_diagrams";
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::text("name", "name").searchable().unique(),
        FieldSpec::integer("busModelId", "bus_model_id"),
        FieldSpec::integer("maxCapacity", "max_capacity"),
        FieldSpec::integer("numFloors", "num_floors"),
        FieldSpec::integer("totalSeats", "total_seats"),
        FieldSpec::json("layout", "layout"),
    ];

    fn meta(&self) -> &RecordMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut RecordMeta {
        &mut self.meta
    }

    fn from_create(meta: RecordMeta, input: CreateSeatDiagram) -> Result<Self, DomainError> {
        let layout = match input.layout {
            Some(layout) => layout,
            None => SeatLayout::generate(
                input.num_floors.unwrap_or(1) as usize,
                input.rows_per_floor.unwrap_or(DEFAULT_ROWS_PER_FLOOR) as usize,
                input.seats_per_row.unwrap_or(DEFAULT_SEATS_PER_ROW) as usize,
            )?,
        };
        if let Some(floors) = input.num_floors {
            if floors != layout.floors.len() as i64 {
                return Err(DomainError::field(
                    "numFloors",
                    FieldErrorCode::InvalidOption,
                    format!("numFloors is {floors} but the layout has {} floors", layout.floors.len()),
                ));
            }
        }
        let mut diagram = Self {
            meta: meta.with_active(input.active),
            name: input.name.trim().to_string(),
            bus_model_id: input.bus_model_id,
            max_capacity: input.max_capacity,
            num_floors: 0,
            total_seats: 0,
            layout: SeatLayout { floors: Vec::new() },
        };
        diagram.set_layout(layout)?;
        Ok(diagram)
    }

    fn apply_update(&mut self, input: UpdateSeatDiagram) -> Result<(), DomainError> {
        if let Some(cap) = input.max_capacity {
            check_capacity(self.total_seats, cap)?;
            self.max_capacity = cap;
        }
        set_if(&mut self.name, input.name.map(|s| s.trim().to_string()));
        if input.bus_model_id.is_some() {
            self.bus_model_id = input.bus_model_id;
        }
        set_if(&mut self.meta.active, input.active);
        Ok(())
    }

    fn references(&self) -> Vec<Reference> {
        self.bus_model_id
            .map(|id| Reference::new("busModelId", "bus-models", id))
            .into_iter()
            .collect()
    }
}

// -- Bus ----------------------------------------------------------------------

/// Operational state of a bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum BusStatus {
    /// In service.
    #[default]
    Active,
    /// Scheduled maintenance.
    Maintenance,
    /// Unscheduled repair.
    Repair,
    /// Temporarily unavailable.
    OutOfService,
    /// Permanently withdrawn.
    Retired,
}

/// A vehicle in the fleet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Bus {
    /// Identifier, status and timestamps.
    #[serde(flatten)]
    pub meta: RecordMeta,
    /// Government registration number.
    pub registration_number: String,
    /// Internal fleet number.
    pub economic_number: String,
    /// License plate.
    pub license_plate: String,
    /// Chassis serial number.
    pub serial_number: Option<String>,
    /// Model of the bus.
    pub bus_model_id: i64,
    /// Seat map in use.
    pub seat_diagram_id: Option<i64>,
    /// Manufacturing year.
    pub year: i64,
    /// Operational state.
    pub status: BusStatus,
}

/// Create payload for [`Bus`].
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateBus {
    /// Government registration number.
    pub registration_number: String,
    /// Internal fleet number.
    pub economic_number: String,
    /// License plate.
    pub license_plate: String,
    /// Chassis serial number.
    pub serial_number: Option<String>,
    /// Model of the bus.
    pub bus_model_id: i64,
    /// Seat map in use.
    pub seat_diagram_id: Option<i64>,
    /// Manufacturing year.
    pub year: i64,
    /// Defaults to `active`.
    pub status: Option<BusStatus>,
    /// Defaults to `true`.
    pub active: Option<bool>,
}

/// Update payload for [`Bus`].
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBus {
    /// Government registration number.
    pub registration_number: Option<String>,
    /// Internal fleet number.
    pub economic_number: Option<String>,
    /// License plate.
    pub license_plate: Option<String>,
    /// Chassis serial number.
    pub serial_number: Option<String>,
    /// Model of the bus.
    pub bus_model_id: Option<i64>,
    /// Seat map in use.
    pub seat_diagram_id: Option<i64>,
    /// Manufacturing year.
    pub year: Option<i64>,
    /// Operational state.
    pub status: Option<BusStatus>,
    /// Status flag.
    pub active: Option<bool>,
}

impl Validate for CreateBus {
    fn validate(&self) -> Result<(), DomainError> {
        let mut c = Checker::new();
        c.text("registrationNumber", &self.registration_number, 50)
            .text("economicNumber", &self.economic_number, MAX_CODE_LEN)
            .text("licensePlate", &self.license_plate, MAX_CODE_LEN)
            .optional_text("serialNumber", self.serial_number.as_deref(), 50)
            .id("busModelId", self.bus_model_id)
            .range_i64("year", self.year, MIN_YEAR, MAX_YEAR);
        if let Some(id) = self.seat_diagram_id {
            c.id("seatDiagramId", id);
        }
        c.finish()
    }
}

impl Validate for UpdateBus {
    fn validate(&self) -> Result<(), DomainError> {
        let mut c = Checker::new();
        if let Some(v) = &self.registration_number {
            c.text("registrationNumber", v, 50);
        }
        if let Some(v) = &self.economic_number {
            c.text("economicNumber", v, MAX_CODE_LEN);
        }
        if let Some(v) = &self.license_plate {
            c.text("licensePlate", v, MAX_CODE_LEN);
        }
        if let Some(v) = self.bus_model_id {
            c.id("busModelId", v);
        }
        if let Some(v) = self.seat_diagram_id {
            c.id("seatDiagramId", v);
        }
        if let Some(v) = self.year {
            c.range_i64("year", v, MIN_YEAR, MAX_YEAR);
        }
        c.optional_text("serialNumber", self.serial_number.as_deref(), 50)
            .finish()
    }
}

impl Entity for Bus {
    type Create = CreateBus;
    type Update = UpdateBus;

    const RESOURCE: &'static str = "buses";
    const TABLE: &'static str = "buses";
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::text("registrationNumber", "registration_number")
            .searchable()
            .unique(),
        FieldSpec::text("economicNumber", "economic_number")
            .searchable()
            .unique(),
        FieldSpec::text("licensePlate", "license_plate")
            .searchable()
            .unique(),
        FieldSpec::text("serialNumber", "serial_number"),
        FieldSpec::integer("busModelId", "bus_model_id"),
        FieldSpec::integer("seatDiagramId", "seat_diagram_id"),
        FieldSpec::integer("year", "year"),
        FieldSpec::text("status", "status"),
    ];

    fn meta(&self) -> &RecordMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut RecordMeta {
        &mut self.meta
    }

    fn from_create(meta: RecordMeta, input: CreateBus) -> Result<Self, DomainError> {
        Ok(Self {
            meta: meta.with_active(input.active),
            registration_number: input.registration_number.trim().to_string(),
            economic_number: input.economic_number.trim().to_string(),
            license_plate: input.license_plate.trim().to_uppercase(),
            serial_number: trimmed(input.serial_number),
            bus_model_id: input.bus_model_id,
            seat_diagram_id: input.seat_diagram_id,
            year: input.year,
            status: input.status.unwrap_or_default(),
        })
    }

    fn apply_update(&mut self, input: UpdateBus) -> Result<(), DomainError> {
        set_if(
            &mut self.registration_number,
            input.registration_number.map(|s| s.trim().to_string()),
        );
        set_if(
            &mut self.economic_number,
            input.economic_number.map(|s| s.trim().to_string()),
        );
        set_if(
            &mut self.license_plate,
            input.license_plate.map(|s| s.trim().to_uppercase()),
        );
        if input.serial_number.is_some() {
            self.serial_number = trimmed(input.serial_number);
        }
        set_if(&mut self.bus_model_id, input.bus_model_id);
        if input.seat_diagram_id.is_some() {
            self.seat_diagram_id = input.seat_diagram_id;
        }
        set_if(&mut self.year, input.year);
        set_if(&mut self.status, input.status);
        set_if(&mut self.meta.active, input.active);
        Ok(())
    }

    fn references(&self) -> Vec<Reference> {
        let mut refs = vec![Reference::new("busModelId", "bus-models", self.bus_model_id)];
        if let Some(id) = self.seat_diagram_id {
            refs.push(Reference::new("seatDiagramId", "seat-diagrams", id));
        }
        refs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seat_layout::{ColumnSide, LayoutError};
    use chrono::Utc;

    fn diagram(max_capacity: i64) -> Result<SeatDiagram, DomainError> {
        SeatDiagram::from_create(
            RecordMeta::new(1, None, Utc::now()),
            CreateSeatDiagram {
                name: "Standard 40".into(),
                bus_model_id: None,
                max_capacity,
                num_floors: None,
                layout: None,
                rows_per_floor: Some(10),
                seats_per_row: Some(4),
                active: None,
            },
        )
    }

    #[test]
    fn generated_diagram_tracks_total_seats() {
        let d = diagram(44).unwrap();
        assert_eq!(d.total_seats, 40);
        assert_eq!(d.num_floors, 1);
        assert_eq!(d.layout.find_seat(40).map(|p| p.row), Some(9));
    }

    #[test]
    fn capacity_is_enforced_on_create() {
        let err = diagram(30).unwrap_err();
        assert_eq!(err.field_errors().unwrap()[0].field, "totalSeats");
    }

    #[test]
    fn edit_layout_rolls_back_on_capacity_overflow() {
        let mut d = diagram(44).unwrap();
        let before = d.layout.clone();
        let err = d
            .edit_layout(|l| l.add_column(1, ColumnSide::Right))
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
        assert_eq!(d.layout, before);
        assert_eq!(d.total_seats, 40);
    }

    #[test]
    fn edit_layout_surfaces_grid_rules() {
        let mut d = diagram(44).unwrap();
        let err = d.edit_layout(|l| l.remove_row(1, 50)).unwrap_err();
        assert!(matches!(
            err,
            DomainError::Layout(LayoutError::RowOutOfRange(50))
        ));
    }

    #[test]
    fn edit_layout_renumbers() {
        let mut d = diagram(44).unwrap();
        d.edit_layout(|l| l.remove_row(1, 0)).unwrap();
        assert_eq!(d.total_seats, 36);
        assert!(d.layout.find_seat(37).is_none());
    }

    #[test]
    fn lowering_capacity_below_seats_is_rejected() {
        let mut d = diagram(44).unwrap();
        let err = d
            .apply_update(UpdateSeatDiagram {
                max_capacity: Some(20),
                ..Default::default()
            })
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
        assert_eq!(d.max_capacity, 44);
    }

    #[test]
    fn num_floors_must_match_layout() {
        let layout = SeatLayout::generate(2, 2, 2).unwrap();
        let err = SeatDiagram::from_create(
            RecordMeta::new(1, None, Utc::now()),
            CreateSeatDiagram {
                name: "Double".into(),
                bus_model_id: None,
                max_capacity: 50,
                num_floors: Some(1),
                layout: Some(layout),
                rows_per_floor: None,
                seats_per_row: None,
                active: None,
            },
        )
        .unwrap_err();
        assert_eq!(err.field_errors().unwrap()[0].field, "numFloors");
    }

    #[test]
    fn bus_status_serializes_snake_case() {
        let json = serde_json::to_value(BusStatus::OutOfService).unwrap();
        assert_eq!(json, "out_of_service");
        let parsed: BusStatus = serde_json::from_value("retired".into()).unwrap();
        assert_eq!(parsed, BusStatus::Retired);
        assert!(serde_json::from_value::<BusStatus>("scrapped".into()).is_err());
    }

    #[test]
    fn bus_references_follow_optional_diagram() {
        let bus = Bus::from_create(
            RecordMeta::new(3, None, Utc::now()),
            CreateBus {
                registration_number: "REG-1".into(),
                economic_number: "E-100".into(),
                license_plate: "abc-123".into(),
                serial_number: None,
                bus_model_id: 7,
                seat_diagram_id: None,
                year: 2020,
                status: None,
                active: None,
            },
        )
        .unwrap();
        assert_eq!(bus.license_plate, "ABC-123");
        assert_eq!(bus.status, BusStatus::Active);
        assert_eq!(bus.references().len(), 1);
    }

    #[test]
    fn bus_model_year_bounds() {
        let input = CreateBusModel {
            manufacturer: "Volvo".into(),
            model: "9700".into(),
            year: 1850,
            seating_capacity: 0,
            num_floors: Some(3),
            engine_type: None,
            active: None,
        };
        let err = input.validate().unwrap_err();
        let fields: Vec<_> = err
            .field_errors()
            .unwrap()
            .iter()
            .map(|e| e.field.as_str())
            .collect();
        assert_eq!(fields, vec!["year", "seatingCapacity", "numFloors"]);
    }
}
