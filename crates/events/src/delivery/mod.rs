//! Outbound delivery channels.
//!
//! Only email is supported; [`email::Mailer`] is the seam the notification
//! service sends through.

pub mod email;
