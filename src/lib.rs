//! # Toolgate - Policy-Gated Tool Authorization Pipeline
//!
//! Gates a set of privileged document-store tools behind a three-stage
//! pipeline:
//! - Credential lifecycle: on-disk OAuth token, validity check, refresh
//! - Intent classification: one prompt maps to at most one registered tool
//! - Policy decision: external engine authorizes identity + role + tool
//!
//! ## Architecture
//!
//! The pipeline is a synchronous cooperative loop; one user turn runs to
//! completion before the next line of input is read:
//! ```text
//!   Auth>/Task> input
//!        │
//!        ▼
//!   ┌──────────────────────────────────────────────┐
//!   │              Pipeline (session)              │
//!   │  ┌──────────┐ ┌──────────┐ ┌─────────────┐   │
//!   │  │Credential│ │ Identity │ │    Tool     │   │
//!   │  │  Store   │ │ Resolver │ │  Registry   │   │
//!   │  └──────────┘ └──────────┘ └─────────────┘   │
//!   │  ┌──────────┐ ┌──────────┐ ┌─────────────┐   │
//!   │  │ Intent   │ │  Policy  │ │  Execution  │   │
//!   │  │Classifier│ │  Client  │ │Collaborator │   │
//!   │  └──────────┘ └──────────┘ └─────────────┘   │
//!   └──────────────────────────────────────────────┘
//! ```
//!
//! Everything fails closed: expired or malformed credentials degrade to
//! "unauthenticated", malformed classifier output to "no match", and any
//! policy-engine failure to "deny". No error terminates the session loop;
//! only explicit user cancellation does.

// Enforce strict safety at compile time
#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]
#![warn(rust_2018_idioms)]

// Re-export public API
pub mod agents;
pub mod classify;
pub mod credentials;
pub mod identity;
pub mod pipeline;
pub mod policy;
pub mod tools;
pub mod types;

// Internal utilities
pub mod observability;

pub use types::{Config, Error, Result};
