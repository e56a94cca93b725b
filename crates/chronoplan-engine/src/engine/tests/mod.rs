//! End-to-end scheduling tests. Each module builds a small project through
//! the public API, solves it, and checks exact instants against hand- or
//! reference-computed expectations.

mod util;

mod alap_backward;
mod booking_atomicity;
mod csv_reports;
mod efficiency;
mod managers;
mod milestones;
mod properties;
mod timezones;
