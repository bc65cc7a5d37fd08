use thiserror::Error;

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

macro_rules! out_of_bounds_error {
    // Single string version
    ($structure:expr, $index:expr, $msg:expr) => {
        crate::Error::OutOfBounds {
            structure: $structure,
            index: $index,
            message: $msg.to_string(),
        }
    };

    // Format string with arguments version
    ($structure:expr, $index:expr, $fmt:expr, $($arg:tt)*) => {
        crate::Error::OutOfBounds {
            structure: $structure,
            index: $index,
            message: format!($fmt, $($arg)*),
        }
    };
}

/// The structure an [`Error::OutOfBounds`] refers to.
///
/// Every bounds failure is tagged with the structure that was being resolved, so a
/// caller can tell a broken section table from a broken import table without
/// re-walking the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum Structure {
    /// The fixed 64-byte DOS header at offset 0
    #[strum(to_string = "DOS header")]
    DosHeader,
    /// The bytes between the DOS header and the NT header
    #[strum(to_string = "DOS stub")]
    DosStub,
    /// Signature, file header and optional header
    #[strum(to_string = "NT header")]
    NtHeader,
    /// The data directory array at the end of the optional header
    #[strum(to_string = "data directory")]
    DataDirectory,
    /// The section header array
    #[strum(to_string = "section table")]
    SectionTable,
    /// The raw data of a single section
    #[strum(to_string = "section")]
    Section,
    /// The export directory and its arrays
    #[strum(to_string = "export table")]
    ExportTable,
    /// The import descriptors and their thunk tables
    #[strum(to_string = "import table")]
    ImportTable,
    /// The base relocation blocks
    #[strum(to_string = "relocation table")]
    RelocationTable,
}

fn index_suffix(index: &Option<usize>) -> String {
    match index {
        Some(index) => format!(" #{index}"),
        None => String::new(),
    }
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// Every variant is terminal for the `Context` being built: nothing is retried and no
/// partially-resolved context is ever handed out.
///
/// # Error Categories
///
/// - [`Error::FileError`] - The input could not be opened, seeked or read
/// - [`Error::Malformed`] - Bad magic or signature, unknown machine, inconsistent declared sizes
/// - [`Error::OutOfBounds`] - An offset/size pair would leave the header region or the image,
///   including unterminated and truncated tables
///
/// # Examples
///
/// ```rust,no_run
/// use readpe::{Context, Error};
///
/// match Context::from_file("sample.exe") {
///     Ok(context) => println!("{} sections", context.sections().len()),
///     Err(Error::Malformed { message, file, line }) => {
///         eprintln!("Malformed file: {} ({}:{})", message, file, line);
///     }
///     Err(Error::OutOfBounds { structure, index, message }) => {
///         eprintln!("Broken {} ({:?}): {}", structure, index, message);
///     }
///     Err(Error::FileError(io_err)) => eprintln!("I/O error: {}", io_err),
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// File I/O error.
    ///
    /// Wraps failures to open, seek or read the input, including inputs that end before a
    /// declared header or section does.
    #[error("{0}")]
    FileError(#[from] std::io::Error),

    /// The file is damaged and could not be parsed.
    ///
    /// Raised for signature mismatches, unsupported machine codes and declared sizes that
    /// contradict each other. The source location where the problem was detected is kept
    /// for debugging purposes.
    ///
    /// # Fields
    ///
    /// * `message` - Detailed description of what was malformed
    /// * `file` - Source file where the error was detected
    /// * `line` - Source line where the error was detected
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// An out of bound access would have occurred.
    ///
    /// A computed offset/size pair points outside the region it is allowed to live in: the
    /// header prefix for header structures, the full image for everything else.
    ///
    /// # Fields
    ///
    /// * `structure` - The structure being resolved
    /// * `index` - 0-based index of the offending section, descriptor, block or entry
    /// * `message` - Which field failed and why
    #[error("Out of bounds - {structure}{}: {message}", index_suffix(.index))]
    OutOfBounds {
        /// The structure in which the violation was found
        structure: Structure,
        /// Index of the offending element, if the structure is a collection
        index: Option<usize>,
        /// Description of the failed check
        message: String,
    },
}
