//! Database repositories module
//!
//! This module contains all repository implementations for data access

pub mod user;
pub mod event;
pub mod ticket;
pub mod stakeholder;
pub mod certificate;
pub mod gallery;
pub mod issue;
pub mod feedback;
pub mod task;
pub mod admin;

// Re-export repositories
pub use user::UserRepository;
pub use event::EventRepository;
pub use ticket::{TicketRepository, NewOrder, TicketStats};
pub use stakeholder::StakeholderRepository;
pub use certificate::CertificateRepository;
pub use gallery::GalleryRepository;
pub use issue::IssueRepository;
pub use feedback::FeedbackRepository;
pub use task::TaskRepository;
pub use admin::AdminRepository;
