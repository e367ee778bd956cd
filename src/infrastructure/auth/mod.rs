mod static_session_provider;

pub use static_session_provider::StaticSessionProvider;
