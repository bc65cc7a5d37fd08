//! PE image access and the header-level loading stages.
//!
//! # Architecture
//!
//! The file on disk is never parsed in place. Instead the loader builds the image the way
//! it would look once mapped: a zero-filled buffer of `size_of_image` bytes holding the
//! header prefix at offset 0 and every section at its virtual address. All later lookups are
//! RVAs into that buffer.
//!
//! # Key Components
//!
//! ## Reading
//! - [`io`] - Little-endian reads of primitive values from byte slices
//! - [`parser::Parser`] - Sequential reader that reports short reads as out-of-bounds errors
//!   for the structure it was created for
//!
//! ## Image
//! - [`image::RawImage`] - Owned image buffer with region-aware slicing and the
//!   bounded-string validator
//!
//! ## Headers
//! - [`headers`] - DOS header, file header, optional header (PE32 / PE32+), data directory
//!   entries, section headers and their flag sets
//! - [`regions`] - Locates and decodes the header structures inside the header prefix
//!
//! The header loader and the section materializer are internal stages driven by
//! [`crate::Context`].
//!
//! # Examples
//!
//! ```rust,no_run
//! use readpe::Context;
//!
//! let context = Context::from_file("sample.dll")?;
//! let image = context.image();
//!
//! println!("image: 0x{:X} bytes, headers: 0x{:X} bytes", image.len(), image.header_len());
//! if let Some(name) = image.string(0x2040) {
//!     println!("string at 0x2040: {}", name);
//! }
//! # Ok::<(), readpe::Error>(())
//! ```

pub mod headers;
pub mod image;
pub mod io;
pub mod parser;
pub mod regions;

pub(crate) mod loader;
pub(crate) mod sections;
