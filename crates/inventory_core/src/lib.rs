pub mod domain;
pub mod events;
pub mod oplog;
pub mod ports;
pub mod reconcile;
pub mod stats;

pub use domain::{
    DocumentType, Material, MaterialPatch, NewMaterial, NewUser, User, UserCredentials,
    UserPatch, UserRole, ValidationError,
};
pub use events::{Actor, DomainEvent, EventSink, NullSink, OperationKind};
pub use oplog::{OperationEntry, OperationLog};
pub use ports::{MaterialFilter, MaterialStore, PortError, PortResult, SessionStore, UserStore};
pub use reconcile::{plan_batch, BatchPlan, RawRow, RowDecision, RowError, Target};
pub use stats::{compute, InventoryStats};
