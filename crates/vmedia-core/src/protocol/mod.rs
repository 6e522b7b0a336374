//! Protocol module - OEM command catalog and response parsing.

pub mod catalog;
pub mod command;
pub mod constants;
pub mod response;

pub use command::{BootDevice, CommandError, IpmiCommand, MediaType, RawCommand};
pub use response::{RawResponse, ResponseError};
