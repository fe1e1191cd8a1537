// Wire protocol for the live page-editing session.

pub mod frames;

pub use frames::{parse_inbound, ClientFrame, Inbound, PageId, ServerFrame};
