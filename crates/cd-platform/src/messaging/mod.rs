//! WhatsApp gateway administration

pub mod api;

pub use api::{messaging_router, MessagingState};
