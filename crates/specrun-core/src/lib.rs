//! specrun-core: scenario model and equality engine for HTTP conformance runs
//!
//! This crate provides the wire-format validators, the format-aware equality
//! engine, the scenario model with its mock-side request validation, and the
//! registry that loads scenario fixtures. It performs no network I/O.

pub mod compare;
pub mod config;
pub mod fixtures;
pub mod format;
pub mod registry;
pub mod scenario;
pub mod schema;
pub mod selection;
pub mod verdict;

pub use compare::{Mismatch, MismatchSubject, compare_body, rewrite_pagination_link};
pub use config::{Config, ConfigError};
pub use format::{CollectionFormat, DateFormat, FormatError, validate_value_format};
pub use registry::{FixtureFile, LoadError, RegistryBuilder, ScenarioRegistry, load_scenarios};
pub use scenario::{
    Body, HttpVerb, MockMethod, MockRequest, MockResponse, RequestCheck, RequestSpec,
    ResponseSpec, Scenario, ScenarioKind, ValidationError,
};
pub use selection::{Selection, SelectionError};
pub use verdict::{FailureKind, MethodOutcome, RunReport, Verdict, VerdictStatus};
