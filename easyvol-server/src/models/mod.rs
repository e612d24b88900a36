//! Domain models: validated field newtypes, status vocabularies, pagination

pub(crate) mod de;
mod fields;
mod pagination;
mod status;
mod validation;

pub use fields::{ItemCode, PersonName, TaxCode};
pub use pagination::{Paginated, Pagination, PaginationParams};
pub use status::{
    Attendance, EventStatus, EventType, FeeRequestStatus, GuardianType, MemberStatus,
    MovementType, RadioStatus, SchedulerStatus, TemplateKind, VehicleStatus,
};
pub use validation::ValidationError;
