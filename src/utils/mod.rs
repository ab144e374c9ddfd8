pub mod fs;
pub mod naming;
pub(crate) mod process;
