mod core;

pub use crate::core::{
    errors, utils, Axis, Builtin, Gate, GateLibrary, QuantumRegister, Representation, StateExport,
};
