// SPDX-FileCopyrightText: 2026 Rekindle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Sequence templates, lead classification, and follow-up materialization.
//!
//! Templates are immutable at run time and selected once per lead at
//! enrollment based on classification. The engine crate drives the resulting
//! steps through the compliance gate and the dispatcher.

pub mod classify;
pub mod sequencer;
pub mod templates;

pub use classify::{LeadClassification, classify};
pub use sequencer::{PlannedStep, defer_is_stale, materialize};
pub use templates::{SequenceStep, SequenceTemplate, TemplateName, TemplateRegistry};
