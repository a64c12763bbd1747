//! The interface to the front end: interned names, construction of typed
//! modules, and the demonstration modules the driver can load.

pub mod builder;
pub mod demos;
pub mod intern;
