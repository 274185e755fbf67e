//! Command handlers, one module per subcommand.

pub mod baselines;
pub mod children;
pub mod completion;
pub mod delivering;
pub mod promote;
pub mod recommended;
pub mod show;
pub mod siblings;
pub mod tag;
pub mod version;
