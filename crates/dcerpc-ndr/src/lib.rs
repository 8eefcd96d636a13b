//! NDR (Network Data Representation) coder engine
//!
//! This crate marshals DCE RPC stub data for the RPC layer that runs over
//! SMB2 named pipes. A type describes its layout once by implementing
//! [`NdrCoder`]; the same routine encodes and decodes, driven by a [`Pdu`].
//!
//! # NDR Wire Format
//!
//! - Primitives align to their natural size (1, 2, 4, or 8 bytes)
//! - Counts and referent ids are 4 bytes under NDR and 8 bytes under NDR64
//! - Embedded pointers are a referent id inline; the pointee follows the
//!   fixed part of the enclosing structure
//! - Strings are conformant varying arrays with a null terminator
//!
//! ```
//! use dcerpc_ndr::{decode, encode, NdrCoder, Pdu, Result, Utf16String, WireConfig};
//!
//! #[derive(Debug, Default, PartialEq)]
//! struct ShareInfo1 {
//!     netname: Option<Utf16String>,
//!     share_type: u32,
//!     remark: Option<Utf16String>,
//! }
//!
//! impl NdrCoder for ShareInfo1 {
//!     fn code<'v>(&'v mut self, pdu: &mut Pdu<'_, 'v>) -> Result<()> {
//!         pdu.unique(&mut self.netname)?;
//!         pdu.uint32(&mut self.share_type)?;
//!         pdu.unique(&mut self.remark)
//!     }
//! }
//!
//! let mut info = ShareInfo1 {
//!     netname: Some("IPC$".into()),
//!     share_type: 0x8000_0003,
//!     remark: Some("Remote IPC".into()),
//! };
//! let mut buf = vec![0u8; 65536];
//! let len = encode(&mut info, &mut buf, WireConfig::ndr32())?;
//! assert_eq!(len, 70);
//!
//! let (decoded, _) = decode::<ShareInfo1>(&buf[..len], WireConfig::ndr32())?;
//! assert_eq!(decoded, info);
//! # Ok::<(), dcerpc_ndr::NdrError>(())
//! ```

mod arrays;
mod config;
mod cursor;
mod error;
mod handles;
mod pdu;
mod pointers;
mod primitives;
mod strings;

pub use arrays::{ConformantArray, VaryingHeader};
pub use config::{ByteOrder, Representation, TransferSyntax, WireConfig, DEFAULT_MAX_DEPTH};
pub use cursor::ByteCursor;
pub use error::{NdrError, Result};
pub use handles::{ContextHandle, Uuid};
pub use pdu::{decode, encode, Direction, NdrCoder, Pdu};
pub use pointers::{FullPtr, FIRST_REFERENT, UNIQUE_REFERENT};
pub use strings::Utf16String;
