mod scaffold_chat_transport;
mod streaming_chat_client;
mod utf8_chunk_decoder;

pub use scaffold_chat_transport::ScaffoldChatTransport;
pub use streaming_chat_client::StreamingChatClient;
pub use utf8_chunk_decoder::Utf8ChunkDecoder;
