#![forbid(unsafe_code)]

pub mod app_services;
pub mod attempts;
pub mod error;
pub mod identity;
pub mod quiz_service;
pub mod result_service;
pub mod samples;

pub use quiz_core::Clock;

pub use app_services::AppServices;
pub use attempts::{Attempt, AttemptService, AttemptSnapshot, SessionTimer};
pub use error::{AppServicesError, AttemptError, QuizServiceError, ResultServiceError};
pub use identity::{IdentityProvider, StaticIdentity};
pub use quiz_service::QuizService;
pub use result_service::ResultService;
