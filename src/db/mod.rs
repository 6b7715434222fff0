pub mod appointments;
pub mod consultants;
