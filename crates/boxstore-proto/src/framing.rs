//! Message framing for the transport layer.
//!
//! Every message on the wire is a 4-byte big-endian length prefix followed by
//! an rkyv-serialized [`Request`] or [`Response`].

use crate::message::{Request, Response};
use crate::Error;

/// Maximum payload size accepted by the framing layer (4 MB).
pub const MAX_MESSAGE_SIZE: usize = 4 * 1024 * 1024;

/// Size of the length prefix in bytes.
pub const LENGTH_PREFIX_SIZE: usize = 4;

/// Largest complete frame: a maximal payload plus its length prefix.
pub const MAX_FRAME_SIZE: usize = MAX_MESSAGE_SIZE + LENGTH_PREFIX_SIZE;

/// Frame size a socket must accept to carry payloads of up to `max_payload`
/// bytes.
pub fn frame_limit(max_payload: usize) -> usize {
    max_payload.saturating_add(LENGTH_PREFIX_SIZE)
}

/// Encode a payload with a length prefix.
pub fn encode_frame(payload: &[u8]) -> Result<Vec<u8>, Error> {
    if payload.len() > MAX_MESSAGE_SIZE {
        return Err(Error::InvalidMessage(format!(
            "payload size {} exceeds maximum {}",
            payload.len(),
            MAX_MESSAGE_SIZE
        )));
    }

    let len = payload.len() as u32;
    let mut frame = Vec::with_capacity(LENGTH_PREFIX_SIZE + payload.len());
    frame.extend_from_slice(&len.to_be_bytes());
    frame.extend_from_slice(payload);
    Ok(frame)
}

/// Extract the payload from a complete frame.
///
/// Trailing bytes past the declared length are ignored.
pub fn extract_payload(frame: &[u8]) -> Result<&[u8], Error> {
    if frame.len() < LENGTH_PREFIX_SIZE {
        return Err(Error::InvalidMessage(format!(
            "frame too short for length prefix: {} < {}",
            frame.len(),
            LENGTH_PREFIX_SIZE
        )));
    }

    let mut header = [0u8; LENGTH_PREFIX_SIZE];
    header.copy_from_slice(&frame[..LENGTH_PREFIX_SIZE]);
    let len = u32::from_be_bytes(header) as usize;
    if len > MAX_MESSAGE_SIZE {
        return Err(Error::InvalidMessage(format!(
            "frame length {} exceeds maximum {}",
            len, MAX_MESSAGE_SIZE
        )));
    }

    if frame.len() < LENGTH_PREFIX_SIZE + len {
        return Err(Error::InvalidMessage(format!(
            "frame incomplete: have {}, need {}",
            frame.len(),
            LENGTH_PREFIX_SIZE + len
        )));
    }

    Ok(&frame[LENGTH_PREFIX_SIZE..LENGTH_PREFIX_SIZE + len])
}

/// Serialize and frame a request.
pub fn encode_request(request: &Request) -> Result<Vec<u8>, Error> {
    let payload = rkyv::to_bytes::<rkyv::rancor::Error>(request)
        .map_err(|e| Error::Serialization(format!("failed to serialize request: {}", e)))?;
    encode_frame(&payload)
}

/// Serialize and frame a response.
pub fn encode_response(response: &Response) -> Result<Vec<u8>, Error> {
    let payload = rkyv::to_bytes::<rkyv::rancor::Error>(response)
        .map_err(|e| Error::Serialization(format!("failed to serialize response: {}", e)))?;
    encode_frame(&payload)
}

/// Unframe and deserialize a request.
pub fn decode_request(frame: &[u8]) -> Result<Request, Error> {
    let aligned = aligned_payload(frame)?;
    rkyv::from_bytes::<Request, rkyv::rancor::Error>(&aligned)
        .map_err(|e| Error::Deserialization(format!("failed to deserialize request: {}", e)))
}

/// Unframe and deserialize a response.
pub fn decode_response(frame: &[u8]) -> Result<Response, Error> {
    let aligned = aligned_payload(frame)?;
    rkyv::from_bytes::<Response, rkyv::rancor::Error>(&aligned)
        .map_err(|e| Error::Deserialization(format!("failed to deserialize response: {}", e)))
}

// rkyv needs an aligned buffer; nng message bodies carry no alignment guarantee.
fn aligned_payload(frame: &[u8]) -> Result<rkyv::util::AlignedVec<16>, Error> {
    let payload = extract_payload(frame)?;
    let mut aligned: rkyv::util::AlignedVec<16> = rkyv::util::AlignedVec::new();
    aligned.extend_from_slice(payload);
    Ok(aligned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BoxRecord, Status};

    #[test]
    fn test_encode_frame_prefix() {
        let frame = encode_frame(b"hello").unwrap();
        assert_eq!(&frame[..4], &[0, 0, 0, 5]);
        assert_eq!(&frame[4..], b"hello");

        let empty = encode_frame(&[]).unwrap();
        assert_eq!(empty, vec![0, 0, 0, 0]);
    }

    #[test]
    fn test_encode_frame_too_large() {
        let payload = vec![0u8; MAX_MESSAGE_SIZE + 1];
        assert!(encode_frame(&payload).is_err());
    }

    #[test]
    fn test_largest_payload_fits_frame_limit() {
        let payload = vec![7u8; MAX_MESSAGE_SIZE];
        let frame = encode_frame(&payload).unwrap();

        assert_eq!(frame.len(), MAX_FRAME_SIZE);
        assert_eq!(frame.len(), frame_limit(MAX_MESSAGE_SIZE));
        assert_eq!(extract_payload(&frame).unwrap(), payload.as_slice());
    }

    #[test]
    fn test_extract_payload_ignores_trailing_bytes() {
        let frame = [0, 0, 0, 2, 1, 2, 3, 4, 5];
        assert_eq!(extract_payload(&frame).unwrap(), &[1, 2]);
    }

    #[test]
    fn test_extract_payload_rejects_short_frames() {
        assert!(extract_payload(&[0, 0, 0]).is_err());
        assert!(extract_payload(&[0, 0, 0, 5, 1, 2]).is_err());

        let oversized = ((MAX_MESSAGE_SIZE as u32) + 1).to_be_bytes();
        assert!(extract_payload(&oversized).is_err());
    }

    #[test]
    fn test_request_frame_decodes() {
        let record = BoxRecord::new(7, "Crate").with_price(12).with_category("tools");
        let request = Request::create_box(3, record);

        let frame = encode_request(&request).unwrap();
        let decoded = decode_request(&frame).unwrap();
        assert_eq!(decoded, request);
    }

    #[test]
    fn test_response_frame_decodes() {
        let response = Response::records(
            9,
            vec![BoxRecord::new(1, "a"), BoxRecord::new(2, "b")],
        );

        let frame = encode_response(&response).unwrap();
        let decoded = decode_response(&frame).unwrap();
        assert_eq!(decoded.id, 9);
        assert_eq!(decoded.status, Status::Ok);
        assert_eq!(decoded, response);
    }

    #[test]
    fn test_decode_garbage_fails() {
        assert!(decode_request(b"invalid data").is_err());
        let frame = encode_frame(&[0xde, 0xad, 0xbe, 0xef]).unwrap();
        assert!(decode_response(&frame).is_err());
    }
}
