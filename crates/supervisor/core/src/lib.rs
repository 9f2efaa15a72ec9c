//! Supervisor side of the managed-mode protocol.
//!
//! Holds the client used to talk to a managed node, the actor that relays its events and
//! commands, and the reset machinery that brings a diverged node back in line with the
//! supervisor's own view of the chain.

pub mod event;

pub mod syncnode;
