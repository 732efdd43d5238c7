//! Data models module
//!
//! This module contains all data structures used throughout the application

/// Declares a string-backed enum stored as TEXT in the database.
macro_rules! text_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = crate::utils::errors::CampusEventsError;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(crate::utils::errors::CampusEventsError::InvalidInput(
                        format!("Unknown {}: {}", stringify!($name), other)
                    )),
                }
            }
        }
    };
}

pub mod user;
pub mod event;
pub mod order;
pub mod stakeholder;
pub mod certificate;
pub mod gallery;
pub mod issue;
pub mod feedback;
pub mod task;

// Re-export commonly used models
pub use user::{User, UserRole, UpsertUserRequest, UpdateUserRequest, UpdateRoleRequest};
pub use event::{Event, EventStatus, EventDetail, EventQuery, CreateEventRequest, UpdateEventRequest};
pub use order::{Order, OrderStatus, Ticket, TicketStatus, TicketWithEvent, OrderWithTickets, CreateOrderRequest, ScanRequest, ScanOutcome, ScanResult, QrPayloadResponse};
pub use stakeholder::{Stakeholder, StakeholderRole, StakeholderQuery, CreateStakeholderRequest, UpdateStakeholderRequest, ImportStakeholdersRequest, ImportResult};
pub use certificate::{CertificateTemplate, CertificateLayout, Certificate, RenderedCertificate, CreateTemplateRequest, UpdateTemplateRequest, GenerationSummary, CertificateVerification};
pub use gallery::{PhotoGallery, GalleryPhoto, GalleryWithPhotos, CreateGalleryRequest, UpdateGalleryRequest, AddPhotoRequest};
pub use issue::{Issue, IssueSeverity, IssueStatus, CreateIssueRequest, UpdateIssueStatusRequest};
pub use feedback::{FeedbackForm, FeedbackQuestion, QuestionKind, AnswerValue, FeedbackResponse, CreateFeedbackFormRequest, SubmitFeedbackRequest, FeedbackSummary, QuestionSummary};
pub use task::{EventTask, TaskStatus, CreateTaskRequest, UpdateTaskRequest};
