//! Stand-in capture devices and detector for running the monitor without
//! hardware or a model.

pub mod camera;
pub mod microphone;
pub mod script;
