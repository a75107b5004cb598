pub mod controller;
pub mod model;
pub mod router;
pub mod service;

pub use router::{init_student_tickets_router, init_teacher_tickets_router};
