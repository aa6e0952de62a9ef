//! Core data model types: the inbound email, its parts, and the outbound notification.

pub mod address;
pub mod attachment;
pub mod mail;
pub mod notification;
