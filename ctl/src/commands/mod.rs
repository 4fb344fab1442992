mod crl;
mod info;
mod init;
mod issue;
mod list;
mod revoke;

pub use crl::{CrlParams, crl};
pub use info::info;
pub use init::{InitParams, init};
pub use issue::{IssueParams, issue};
pub use list::list;
pub use revoke::{RevokeParams, revoke};
