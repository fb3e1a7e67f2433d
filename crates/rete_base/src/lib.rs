#![cfg_attr(docsrs, feature(doc_cfg))]

//! # rete-base
//!
//! Pure structural layer for the front-end compilation core of a
//! CLIPS-family forward-chaining rule interpreter.
//!
//! This crate provides the foundational types every other crate in the
//! workspace builds on:
//!
//! - [`atoms::AtomInterner`] — the hash-consed, reference-counted atom
//!   tables (symbols, strings, instance names, floats, integers, bitmaps,
//!   external addresses) with ephemeral-sweep reclamation
//! - [`Span`] — source location tracking
//! - [`SpannedError`]/[`Result`]/[`error::ErrorKind`] — errors with source
//!   positions and a taxonomy kind
//! - [`router::Router`] — the diagnostic output channel abstraction
//! - [`environment::Environment`] — the single root handle owning every
//!   table
//!
//! # Design Principles
//!
//! This crate has **no knowledge of rule surface syntax**. It provides only
//! generic, reusable infrastructure that the scanner, expression, constraint,
//! module, and network-generation crates build upon.
//!
//! # Example
//!
//! ```
//! use rete_base::{AtomInterner, Span};
//!
//! let mut atoms = AtomInterner::new();
//! atoms.add_symbol("hello");
//! let span = Span::new(0, 5);
//! assert!(atoms.find_symbol("hello").is_some());
//! assert_eq!(span.start, 0);
//! ```

pub mod atoms;
pub mod environment;
pub mod error;
pub mod hash;
pub mod router;
pub mod span;

pub use atoms::{AtomCategory, AtomInterner, AtomRef, AtomValue};
pub use environment::{Environment, EnvironmentConfig};
pub use error::{ErrorKind, Result, SpannedError};
pub use router::{Channel, LogRouter, RecordingRouter, Router};
pub use span::Span;
