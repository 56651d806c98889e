//! Matchwire wire protocol
//!
//! Typed events for the bidirectional chat transport. Every event the
//! gateway understands is a variant of [`ClientEvent`] (outbound) or
//! [`ServerEvent`] (inbound), with a concrete payload shape — there is no
//! stringly-typed dispatch anywhere above this crate.
//!
//! # Wire format
//!
//! Events travel as JSON text frames in the dialect the deployed mobile
//! gateway speaks: a kebab-case `event` name plus a camelCase `data`
//! payload. [`ClientEvent::to_wire`] and [`ServerEvent::from_wire`] are the
//! only places that format exists; everything else works with the enums.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod event;
mod message;
mod wire;

pub use event::{
    ClientEvent, ErrorKind, ErrorNotice, EventKind, OutboundMessage, PresenceEntry, ServerEvent,
};
pub use message::{MatchId, Message, MessageId, MessageKind, UserId};
pub use wire::WireError;
