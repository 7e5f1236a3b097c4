//! Contract message marker.

use serde::de::DeserializeOwned;
use serde::Serialize;

/// A contract message carried over the bus as JSON.
///
/// The message-type name feeds the endpoint naming convention, so it must be
/// stable across services that share the contract. The default is the short
/// type name (`ItemCreated` for `contracts::ItemCreated`).
pub trait Message: Serialize + DeserializeOwned + Send + Sync + 'static {
    fn message_type() -> &'static str {
        let full = std::any::type_name::<Self>();
        full.rsplit("::").next().unwrap_or(full)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Serialize, Deserialize)]
    struct OrderSubmitted {
        total: u64,
    }

    impl Message for OrderSubmitted {}

    #[test]
    fn message_type_is_the_short_type_name() {
        assert_eq!(OrderSubmitted::message_type(), "OrderSubmitted");
    }
}
