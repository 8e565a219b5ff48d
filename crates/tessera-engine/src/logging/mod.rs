//! Logger installation for binaries and tests. Library code only talks to the `log`
//! facade.

mod init;

pub use init::{LoggingConfig, init_logging};
