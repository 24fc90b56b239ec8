//! Deltacol: a columnar binary codec for sparse sequences of typed scalars.
//!
//! The crate provides:
//! - The column codec itself (`column`): encoder, decoder, instruction format
//! - An optional CLI for inspecting encoded columns (`cli` feature)
//!
//! # Quick Start
//!
//! ```
//! use deltacol::column::{Column, ColumnBuilder, Scalar};
//!
//! let mut buf = Vec::new();
//! let mut builder = ColumnBuilder::new(&mut buf, "temperature");
//! builder.append(0, &Scalar::double(72.0)).unwrap();
//! builder.append(1, &Scalar::double(72.0)).unwrap();
//! builder.append(4, &Scalar::double(72.5)).unwrap();
//! let column = builder.into_column().unwrap();
//!
//! let values: Vec<_> = column.iter().collect::<Result<_, _>>().unwrap();
//! assert_eq!(values.len(), 3);
//! assert_eq!(values[2], (4, Scalar::double(72.5)));
//! assert_eq!(column.at(2).unwrap(), None);
//! ```

pub mod column;

#[cfg(feature = "cli")]
pub mod cli;
