//! Slotwatch Poller - the appointment polling state machine.
//!
//! One cycle: open an isolated session, load the page, get past the CAPTCHA,
//! fill the booking form, classify availability, then alert or sleep. The
//! session is always closed before the cycle ends.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

pub mod artifacts;
pub mod availability;
pub mod challenge;
pub mod error;
pub mod form;
pub mod gate;
pub mod poller;

pub use artifacts::{ArtifactKind, ArtifactStore};
pub use availability::{check_availability, Availability};
pub use challenge::SiteChallenge;
pub use error::{PollError, Result};
pub use form::fill_booking_form;
pub use gate::{NoPause, OperatorGate, StdinGate};
pub use poller::{AppointmentPoller, CycleOutcome, PollCycle};
