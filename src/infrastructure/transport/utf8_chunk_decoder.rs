/// Decodes a byte stream into text chunk by chunk. A multi-byte character
/// split across two network chunks is held back until it is complete;
/// invalid sequences become U+FFFD.
#[derive(Debug, Default)]
pub struct Utf8ChunkDecoder {
    carry: Vec<u8>,
}

impl Utf8ChunkDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn decode(&mut self, bytes: &[u8]) -> String {
        self.carry.extend_from_slice(bytes);
        let mut out = String::new();

        loop {
            match std::str::from_utf8(&self.carry) {
                Ok(text) => {
                    out.push_str(text);
                    self.carry.clear();
                    return out;
                }
                Err(e) => {
                    let valid = e.valid_up_to();
                    out.push_str(std::str::from_utf8(&self.carry[..valid]).unwrap_or_default());
                    match e.error_len() {
                        None => {
                            self.carry.drain(..valid);
                            return out;
                        }
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            self.carry.drain(..valid + len);
                        }
                    }
                }
            }
        }
    }

    /// Whatever is still held once the body ends.
    pub fn finish(&mut self) -> String {
        let rest = String::from_utf8_lossy(&self.carry).into_owned();
        self.carry.clear();
        rest
    }
}
