pub mod attendance;
pub mod auth;
pub mod classes;
pub mod students;
pub mod subjects;
pub mod teachers;
pub mod tickets;
