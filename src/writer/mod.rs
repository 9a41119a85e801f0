//! Output writer abstraction layer
//!
//! Writers turn a [`Chart`] (spec + fetched rows) into a concrete output
//! format.
//!
//! # Example
//!
//! ```rust,ignore
//! use safedrive::writer::{Writer, VegaLiteWriter};
//!
//! let writer = VegaLiteWriter::new();
//! let json = writer.write(&chart)?;
//! println!("{}", json);
//! ```

use crate::{Chart, Result};

#[cfg(feature = "vegalite")]
pub mod vegalite;

#[cfg(feature = "vegalite")]
pub use vegalite::VegaLiteWriter;

/// Trait for chart output writers
pub trait Writer {
    /// Generate output for a rendered chart
    ///
    /// # Errors
    ///
    /// Returns `SafedriveError::WriterError` if the chart's data does not
    /// carry the columns its spec encodes, or output generation fails.
    fn write(&self, chart: &Chart) -> Result<String>;

    /// Check a chart can be written without generating output
    fn validate(&self, chart: &Chart) -> Result<()>;
}
