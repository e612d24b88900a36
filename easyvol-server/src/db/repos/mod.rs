//! Repositories: one thin struct per entity holding a pool reference
//!
//! List queries return one page plus the overall total in a single query
//! (`COUNT(*) OVER()`), never one query per row.

mod activity;
mod documents;
mod events;
mod fees;
mod junior_members;
mod meetings;
mod members;
mod radios;
mod scheduler;
mod templates;
mod training;
mod users;
mod vehicles;
mod warehouse;

pub use activity::{ActivityEntry, ActivityFilter, ActivityRepo};
pub use documents::{Document, DocumentRepo};
pub use events::{Event, EventFilter, EventInput, EventParticipant, EventRepo, EventVehicle};
pub use fees::{
    FeeRepo, FeeRequest, FeeRequestCounts, FeeRequestFilter, FeeRequestInput, MemberFee,
};
pub use junior_members::{Guardian, GuardianInput, JuniorMember, JuniorMemberRepo};
pub use meetings::{Meeting, MeetingAttachment, MeetingInput, MeetingRepo, Participant};
pub use members::{Member, MemberAttachment, MemberFilter, MemberInput, MemberRepo};
pub use radios::{Radio, RadioAssignment, RadioInput, RadioRepo};
pub use scheduler::{
    SchedulerCounts, SchedulerFilter, SchedulerItem, SchedulerItemInput, SchedulerRepo,
};
pub use templates::{PrintTemplate, PrintTemplateInput, TemplateRepo};
pub use training::{TrainingAttendance, TrainingCourse, TrainingCourseInput, TrainingRepo};
pub use users::{Role, User, UserInput, UserRepo};
pub use vehicles::{Vehicle, VehicleDocument, VehicleInput, VehicleRepo};
pub use warehouse::{
    WarehouseFilter, WarehouseItem, WarehouseItemInput, WarehouseMovement, WarehouseRepo,
};

/// Database error type shared by all repositories
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("not found: {resource} '{id}'")]
    NotFound { resource: &'static str, id: String },

    #[error("conflict: {reason}")]
    Conflict { reason: String },
}

impl DbError {
    pub(crate) fn not_found(resource: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            resource,
            id: id.to_string(),
        }
    }

    pub(crate) fn conflict(reason: impl Into<String>) -> Self {
        Self::Conflict {
            reason: reason.into(),
        }
    }
}
