//! Boundary to the external conversion capability
//!
//! The batch processor never talks to the OCR backend directly; it goes through
//! the [`Converter`] trait so the backend can be swapped or scripted in tests.
//!
//! - [`HttpConverter`]: talks to a remote OCR server over HTTP
//! - [`render_document`]: joins per-page text into one markdown output
//!
//! ## Usage
//!
//! ```no_run
//! use ocr_batch::config::ConverterConfig;
//! use ocr_batch::converter::{Converter, HttpConverter, render_document};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let converter = HttpConverter::new(&ConverterConfig::default())?;
//!
//! let bytes = std::fs::read("report.pdf")?;
//! let pages = converter
//!     .convert_document("report.pdf", bytes, "Convert the document to markdown.")
//!     .await?;
//! println!("{}", render_document(&pages));
//! # Ok(())
//! # }
//! ```

mod http;
mod pages;
mod traits;

pub use http::HttpConverter;
pub use pages::{PAGE_SPLIT_MARKER, render_document};
pub use traits::Converter;
