//! Decoding of `d`-tagged frame payloads.

use data_url::DataUrl;

use crate::errors::FrameError;

/// Decode a `data:` URI into raw image bytes.
///
/// Both `;base64` and percent-encoded bodies are accepted. The media type
/// is not checked; viewers are always told the part is `image/jpeg`.
pub fn decode_data_uri(uri: &str) -> Result<Vec<u8>, FrameError> {
    let url = DataUrl::process(uri).map_err(|e| FrameError::Malformed(format!("{e:?}")))?;
    let (bytes, _fragment) = url.decode_to_vec().map_err(|_| FrameError::InvalidBase64)?;
    Ok(bytes)
}
