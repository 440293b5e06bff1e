//! Domain model: events, registrations, payments and the pure projections over them.

pub mod event;
pub mod installment;
pub mod money;
pub mod payment;
pub mod ports;
pub mod registration;
pub mod report;
