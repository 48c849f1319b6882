//! Ports: the seams where caller-supplied behaviour plugs into the engine.

pub mod processor;

pub use self::processor::Processor;
