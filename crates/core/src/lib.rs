//! Core traits and types for the lead qualification engine
//!
//! This crate provides the foundational types shared by every other crate:
//! - Lead, session and message records
//! - The qualification vocabulary (steps, categories, canonical answers)
//! - Capability traits for storage, messaging, completion and notification
//! - Error types

pub mod conversation;
pub mod error;
pub mod lead;
pub mod notification;
pub mod qualification;
pub mod traits;

pub use conversation::{
    CollectedInfo, ConversationSession, Message, MessageDirection, MessageType, SessionContext,
    SessionStatus, TranscriptEntry, TranscriptRole,
};
pub use error::{Error, Result};
pub use lead::{normalize_phone, Lead, LeadStatus};
pub use notification::{NotificationAnswers, NotificationPayload};
pub use qualification::{
    completion_marker, parse_completion_marker, strip_completion_marker, AnswerMap,
    CanonicalAnswer, Category, QualificationResult, QualificationStep, COMPLETION_MARKER,
};

pub use traits::{
    ChannelOutcome, Completion, CompletionModel, DeliveryReceipt, InboundMessage, LeadStore,
    MessageStore, MessageTransport, NotificationChannel, SessionStore,
};
