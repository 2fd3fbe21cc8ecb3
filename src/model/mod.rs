pub mod attendance;
pub mod institution;
pub mod role;
pub mod student;
