#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

pub use trafgen_common::constants;
pub use trafgen_sim as sim;
pub use trafgen_source::*;
pub use trafgen_wire::{unit, writer, AddressFamily, ByteWriter, MacAddr};
