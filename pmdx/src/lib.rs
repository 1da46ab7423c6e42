pub mod component;
pub mod config;
pub mod document;
pub mod parser;

pub use component::{AttrList, ComponentKind};
pub use config::{Config, ConfigEntry};
pub use document::{Block, Column, ComponentInvocation, Document, Page};
pub use parser::{ParseError, Parser};
