pub mod cli;
mod convert;
mod list;
mod logging;
mod merge;
