use crate::error::Result;
use crate::event::FiEvent;
use crate::options::DecoderOptions;

use super::Decoder;

// ============================================================================
// High-Level API
// ============================================================================

/// Decodiert einen Fast Infoset Stream zu einer Event-Sequenz.
pub fn decode(data: &[u8]) -> Result<Vec<FiEvent>> {
    decode_with_options(data, &DecoderOptions::default())
}

/// Decodiert einen Fast Infoset Stream mit externen Vokabularen und Algorithmen.
///
/// Die Sequenz endet mit `EndDocument`. Octets nach dem Dokument werden
/// nicht gelesen.
pub fn decode_with_options(data: &[u8], options: &DecoderOptions) -> Result<Vec<FiEvent>> {
    let decoder = Decoder::new(data, options.clone());
    decoder.collect()
}
