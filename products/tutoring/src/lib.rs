//! Tutoring marketplace services.
//!
//! Each service owns a cloned [`Store`] handle and returns
//! [`ServiceError`]s that the HTTP layer maps onto status codes.

pub mod accounts;
pub mod error;
pub mod images;
pub mod reviews;
pub mod seed;
pub mod students;
pub mod tutors;
mod validate;

pub use accounts::{AccountService, AuthSession, Credentials, Registration, UserSummary};
pub use error::{ServiceError, ServiceResult};
pub use images::{CloudinaryConfig, CloudinaryStore, ImageService, ImageStore, UploadedImage};
pub use platform_db::Store;
pub use reviews::{
    CanReview, NewReview, RatingSummary, ReviewPatch, ReviewService, ReviewWithStudent,
    ReviewWithTutor,
};
pub use students::{StudentProfileInput, StudentService};
pub use tutors::{DirectoryFilter, PublicTutor, TutorProfileInput, TutorService};
