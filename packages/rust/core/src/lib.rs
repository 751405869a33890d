//! Core conversion pipeline for tabledown.
//!
//! Sniffs the encoding and delimiter of a delimited text file, classifies
//! its header, and hands each row to the Markdown renderers, writing one
//! document per row (see [`pipeline::convert_file`]).

pub mod delimiter;
pub mod emitter;
pub mod encoding;
pub mod pipeline;
pub mod schema;
