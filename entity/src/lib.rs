//! sea-orm entities for the tutoring marketplace schema.

pub mod reviews;
pub mod string_list;
pub mod student_profiles;
pub mod tutor_profiles;
pub mod users;

pub use string_list::StringList;
