mod appointment;
mod consultant;

pub use appointment::{Appointment, AppointmentStatus, resolve_interval};
pub use consultant::Consultant;
