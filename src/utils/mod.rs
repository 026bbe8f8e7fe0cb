//! Utility modules for target handling

pub mod address_parser;
pub mod file_input;

pub use address_parser::{parse_addresses_simple, AddressParser};
pub use file_input::{read_lines, resolve_domains};
