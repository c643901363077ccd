pub mod ident;
pub mod logging;
pub mod secure;
