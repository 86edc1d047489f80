//! # Inventory Records
//!
//! One record type per resource, each with a `Create…` and `Update…`
//! payload. Records flatten their [`RecordMeta`](crate::entity::RecordMeta)
//! so the JSON form is a single camelCase object.

pub mod drivers;
pub mod fleet;
pub mod geography;
pub mod installations;
pub mod nodes;
pub mod operators;

pub use drivers::{CreateDriver, Driver, DriverStatus, UpdateDriver};
pub use fleet::{
    Bus, BusModel, BusStatus, CreateBus, CreateBusModel, CreateSeatDiagram, CreateServiceType,
    SeatDiagram, ServiceType, UpdateBus, UpdateBusModel, UpdateSeatDiagram, UpdateServiceType,
};
pub use geography::{
    slugify, City, Country, CreateCity, CreateCountry, CreateState, State, UpdateCity,
    UpdateCountry, UpdateState,
};
pub use installations::{
    Amenity, CreateAmenity, CreateEventType, CreateInstallation, CreateInstallationType,
    EventType, Installation, InstallationType, UpdateAmenity, UpdateEventType,
    UpdateInstallation, UpdateInstallationType,
};
pub use nodes::{CreateLabel, CreateNode, Label, Node, UpdateLabel, UpdateNode};
pub use operators::{
    BusLine, CreateBusLine, CreateTransporter, Transporter, UpdateBusLine, UpdateTransporter,
};

use crate::entity::Entity;

/// Resource path and table of every record type.
pub const RESOURCES: &[(&str, &str)] = &[
    (Country::RESOURCE, Country::TABLE),
    (State::RESOURCE, State::TABLE),
    (City::RESOURCE, City::TABLE),
    (InstallationType::RESOURCE, InstallationType::TABLE),
    (Installation::RESOURCE, Installation::TABLE),
    (Amenity::RESOURCE, Amenity::TABLE),
    (EventType::RESOURCE, EventType::TABLE),
    (Label::RESOURCE, Label::TABLE),
    (Node::RESOURCE, Node::TABLE),
    (ServiceType::RESOURCE, ServiceType::TABLE),
    (BusModel::RESOURCE, BusModel::TABLE),
    (SeatDiagram::RESOURCE, SeatDiagram::TABLE),
    (Bus::RESOURCE, Bus::TABLE),
    (Driver::RESOURCE, Driver::TABLE),
    (Transporter::RESOURCE, Transporter::TABLE),
    (BusLine::RESOURCE, BusLine::TABLE),
];

/// Table backing a resource path.
pub fn table_for(resource: &str) -> Option<&'static str> {
    RESOURCES
        .iter()
        .find(|(r, _)| *r == resource)
        .map(|(_, table)| *table)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_reference_targets_a_known_resource() {
        let now = chrono::Utc::now();
        let node = Node::from_create(
            crate::entity::RecordMeta::new(1, None, now),
            CreateNode {
                code: "N1".into(),
                name: "Node".into(),
                city_id: 1,
                installation_id: Some(1),
                allows_boarding: None,
                allows_alighting: None,
                active: None,
            },
        )
        .unwrap();
        for reference in node.references() {
            assert!(table_for(reference.resource).is_some(), "{}", reference.resource);
        }
        assert_eq!(table_for("installation-types"), Some("installation_types"));
        assert_eq!(table_for("garages"), None);
    }

    #[test]
    fn resources_are_unique() {
        let mut names: Vec<_> = RESOURCES.iter().map(|(r, _)| *r).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), RESOURCES.len());
    }
}
