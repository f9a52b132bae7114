mod record;
mod transition;

pub use record::{JobRecord, JobStatus, ObjectEntry, owner_job_id};
pub use transition::{
    Detection, EventKind, JobChange, JobSnapshot, NotificationEvent, TransitionDetector,
    job_id_from_subject,
};
