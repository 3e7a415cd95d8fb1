//! Error types for building and simulating circuits.

use std::fmt;

use thiserror::Error;

use crate::circuit_sim::Ticks;
use crate::pin::PinDirection;

/// What part of an address failed to resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Missing {
    Instance,
    Pin,
}

impl fmt::Display for Missing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Missing::Instance => write!(f, "no such instance"),
            Missing::Pin => write!(f, "no such pin"),
        }
    }
}

/// Which entry of a component description an address came from, counted
/// from zero within its section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Site {
    Connection(usize),
    Input(usize),
    Output(usize),
}

impl fmt::Display for Site {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Site::Connection(i) => write!(f, "connection #{i}"),
            Site::Input(i) => write!(f, "input mapping #{i}"),
            Site::Output(i) => write!(f, "output mapping #{i}"),
        }
    }
}

/// Errors raised while resolving a component description into a known type.
///
/// Every variant names the component whose definition is at fault. A build
/// error aborts the whole project load.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BuildError {
    #[error("duplicate component name `{name}`")]
    DuplicateType { name: String },

    #[error("component `{component}`: duplicate instance name `{instance}`")]
    DuplicateInstance { component: String, instance: String },

    #[error("component `{component}`: duplicate {direction} pin `{pin}`")]
    DuplicatePin {
        component: String,
        direction: PinDirection,
        pin: String,
    },

    #[error("component `{component}`: instance `{instance}` has unknown type `{type_name}`")]
    UnknownType {
        component: String,
        instance: String,
        type_name: String,
    },

    #[error(
        "component `{component}`, {site}: malformed address `{address}`, expected `instance.pin`"
    )]
    MalformedAddress {
        component: String,
        site: Site,
        address: String,
    },

    #[error("component `{component}`, {site}: cannot resolve {direction} `{address}`: {missing}")]
    UnresolvedAddress {
        component: String,
        site: Site,
        address: String,
        direction: PinDirection,
        missing: Missing,
    },

    #[error("component `{component}`: input `{address}` is driven by both {first} and {second}")]
    ConflictingInput {
        component: String,
        address: String,
        first: String,
        second: String,
    },

    #[error("component `{component}`: test row {row} has {found} values, expected {expected}")]
    TestVectorShape {
        component: String,
        row: usize,
        found: usize,
        expected: usize,
    },

    #[error("component `{component}`: test row {row} column {column} is {value}, expected 0 or 1")]
    TestVectorValue {
        component: String,
        row: usize,
        column: usize,
        value: u8,
    },
}

/// Errors from loading a project out of its textual description.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to parse project description: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error(transparent)]
    Build(#[from] BuildError),
}

/// Errors raised while driving a built circuit.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SimError {
    #[error("circuit did not settle within {max_ticks} ticks")]
    DidNotConverge { max_ticks: Ticks },

    #[error("unknown component `{name}`")]
    UnknownComponent { name: String },

    #[error("`{component}` has no {direction} pin `{pin}`")]
    UnknownPin {
        component: String,
        direction: PinDirection,
        pin: String,
    },

    #[error("`{component}` expects {expected} input values, got {found}")]
    VectorShape {
        component: String,
        expected: usize,
        found: usize,
    },
}
