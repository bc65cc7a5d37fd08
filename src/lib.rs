// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![deny(unsafe_code)]

//! # readpe
//!
//! A loader for Portable Executable (PE32 and PE32+) images that validates every structure
//! before handing it out. The image is laid out in memory the way the Windows loader would
//! map it, and the DOS header, NT header, section table, export table, import table and base
//! relocation table are resolved against that layout.
//!
//! ## Features
//!
//! - **Bounds checked throughout** - every offset and size is checked in 64-bit arithmetic
//!   against the region it must live in, before anything is decoded
//! - **All or nothing** - loading yields a complete [`Context`] or an [`Error`] naming the
//!   offending structure and index, never a half-resolved image
//! - **PE32 and PE32+** - the layout is chosen once from the machine field
//! - **Immutable once loaded** - a [`Context`] is `Send + Sync` and can be queried from any
//!   number of threads
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use readpe::prelude::*;
//!
//! let context = Context::from_file("tests/samples/sample.dll")?;
//!
//! for section in context.sections() {
//!     println!("{:<8} 0x{:08X}", section.name_str(), section.virtual_address);
//! }
//!
//! if let Some(imports) = context.imports() {
//!     for descriptor in &imports.descriptors {
//!         println!("{}: {} functions", descriptor.module_name, descriptor.thunk_count);
//!     }
//! }
//! # Ok::<(), readpe::Error>(())
//! ```
//!
//! ## Loading Pipeline
//!
//! 1. **Header loader** reads the DOS header, NT signature, file header and optional header,
//!    allocates a zero-filled buffer of `size_of_image` bytes and copies the
//!    `size_of_headers` prefix into it
//! 2. **Region resolver** locates the DOS stub, NT header, data directory and section table
//!    inside that prefix
//! 3. **Section materializer** copies each section's raw data to its virtual address
//! 4. **Directory resolvers** walk the export, import and relocation tables, validating every
//!   cross reference against the full image
//!
//! Which resolvers run, and the largest image accepted, is controlled by [`LoadConfig`].
//!
//! ## Error Handling
//!
//! ```rust,no_run
//! use readpe::{Context, Error, Structure};
//!
//! match Context::from_file("suspicious.exe") {
//!     Ok(context) => println!("{} image", context.architecture()),
//!     Err(Error::OutOfBounds { structure: Structure::ImportTable, index, message }) => {
//!         println!("bad import descriptor {:?}: {}", index, message)
//!     }
//!     Err(e) => println!("Error: {}", e),
//! }
//! ```

#[macro_use]
pub(crate) mod error;

/// Shared functionality which is used in unit- and integration-tests
#[cfg(test)]
pub(crate) mod test;

/// Convenient re-exports of the most commonly used types.
///
/// # Example
///
/// ```rust,no_run
/// use readpe::prelude::*;
///
/// let context = Context::from_file_with("sample.dll", &LoadConfig::headers_only())?;
/// println!("{}", context.file_header().number_of_sections);
/// # Ok::<(), readpe::Error>(())
/// ```
pub mod prelude;

/// Raw image access, header records and the header-level parts of the loading pipeline.
///
/// - [`file::io`] - little-endian reads from byte slices
/// - [`file::parser::Parser`] - sequential reader tagged with the structure being parsed
/// - [`file::image::RawImage`] - the bounds-checked image buffer and string validator
/// - [`file::headers`] - DOS, file, optional and section header records
/// - [`file::regions`] - header locations inside the header prefix
pub mod file;

/// Resolvers for the export, import and base relocation tables.
pub mod directories;

/// Options controlling which resolvers run and the largest image accepted.
pub mod config;

/// Human-readable rendering of a loaded image.
pub mod output;

mod context;

/// A type alias for [`std::result::Result<T, Error>`] where the error type is always [`Error`].
///
/// # Examples
///
/// ```rust,no_run
/// use readpe::{Context, Result};
///
/// fn load(path: &str) -> Result<Context> {
///     Context::from_file(path)
/// }
/// ```
pub type Result<T> = std::result::Result<T, Error>;

/// `readpe` Error type
///
/// # Examples
///
/// ```rust,no_run
/// use readpe::{Context, Error};
///
/// match Context::from_file("crafted.exe") {
///     Ok(_) => println!("Loaded successfully"),
///     Err(Error::FileError(e)) => println!("I/O: {}", e),
///     Err(Error::Malformed { message, .. }) => println!("Malformed: {}", message),
///     Err(Error::OutOfBounds { structure, .. }) => println!("{} out of bounds", structure),
/// }
/// ```
pub use error::Error;

/// The structure an [`Error::OutOfBounds`] refers to
pub use error::Structure;

/// A loaded and fully validated image.
///
/// See [`Context`] for the query API.
///
/// # Example
///
/// ```rust,no_run
/// use readpe::Context;
///
/// let context = Context::from_file("sample.dll")?;
/// println!("{} sections", context.sections().len());
/// # Ok::<(), readpe::Error>(())
/// ```
pub use context::Context;

/// Loading options
pub use config::LoadConfig;

/// The bounds-checked image buffer
pub use file::image::RawImage;
