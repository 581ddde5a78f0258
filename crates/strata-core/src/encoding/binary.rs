use crate::error::EncodingError;

const ESCAPE: u8 = 0x00;
const ESCAPED_ZERO: u8 = 0x01;
const TERMINATOR: [u8; 2] = [0x00, 0x00];

/// Append `data` to `out` in a self-delimiting, order-preserving form.
///
/// Zero bytes become `00 01` and the run ends with `00 00`, which sorts
/// below any continuation. That keeps string and binary keys prefix-free.
pub fn encode_bytes(data: &[u8], out: &mut Vec<u8>) {
    out.reserve(data.len() + TERMINATOR.len());
    for (i, part) in data.split(|&b| b == ESCAPE).enumerate() {
        if i > 0 {
            out.extend_from_slice(&[ESCAPE, ESCAPED_ZERO]);
        }
        out.extend_from_slice(part);
    }
    out.extend_from_slice(&TERMINATOR);
}

/// Read one escaped run from the front of `data`.
///
/// Returns the unescaped bytes and how many input bytes were consumed,
/// terminator included.
pub fn decode_bytes(data: &[u8]) -> Result<(Vec<u8>, usize), EncodingError> {
    let mut out = Vec::with_capacity(data.len());
    let mut rest = data;
    loop {
        let Some(at) = rest.iter().position(|&b| b == ESCAPE) else {
            return Err(EncodingError::MalformedKey);
        };
        out.extend_from_slice(&rest[..at]);
        match rest.get(at + 1) {
            Some(&ESCAPE) => return Ok((out, data.len() - rest.len() + at + 2)),
            Some(&ESCAPED_ZERO) => {
                out.push(0x00);
                rest = &rest[at + 2..];
            }
            _ => return Err(EncodingError::MalformedKey),
        }
    }
}
