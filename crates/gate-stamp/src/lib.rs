//! # gate-stamp
//!
//! Per-purchase watermark stamping for docgate-rs.
//!
//! Takes master PDF bytes plus purchase metadata and produces a new PDF with
//! a visible attribution line on every page. Pure transformation: the master
//! bytes are never mutated, and a document that cannot be stamped is never
//! returned unmarked.
//!
//! ```rust,ignore
//! use gate_stamp::{stamp_document, StampMeta};
//! use chrono::Utc;
//!
//! let meta = StampMeta::new("buyer@example.com", "cs_123", Utc::now());
//! let stamped = stamp_document(&master_bytes, &meta)?;
//! ```

pub mod stamp;

pub use stamp::{stamp_document, StampMeta};
