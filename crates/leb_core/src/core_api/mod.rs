mod actor_catalog;
mod engine;
mod types;

pub use actor_catalog::{ActorCatalog, ActorCatalogEntry};
pub use engine::{Engine, Session};
pub use types::{
    ActorEntry, ControlEntry, DependencyEntry, GridEntry, ParameterEntry, PointEntry,
    RoomSnapshot, SwitchEntry, TileEntry,
};
