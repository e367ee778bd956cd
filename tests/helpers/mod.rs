#![allow(dead_code)]

mod fakes;
mod test_postgres;

pub use fakes::{FakeStore, ScriptedTransport, chat_session, ndjson, signed_in};
pub use mock_server::start_mock_server;
pub use test_postgres::TestPostgres;
