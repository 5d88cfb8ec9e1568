// Serial module - serialport backed link and port enumeration
pub mod client;
pub mod enumerator;

pub use client::{SerialLineReader, SerialOpener};
pub use enumerator::SystemPortEnumerator;
