//! Endpoint naming convention.
//!
//! Queue and subscription names are `{service-name}-{message-type-name}` in
//! lower kebab case, non-pluralized. The names are deterministic across
//! restarts so that old and new instances of the same service share one
//! endpoint and its backlog during rolling upgrades.

/// Compute the endpoint name a consumer of `message_type` listens on.
///
/// `endpoint_name("catalog", "ItemCreated")` is `"catalog-item-created"`.
pub fn endpoint_name(service_name: &str, message_type: &str) -> String {
    format!("{}-{}", kebab_case(service_name), kebab_case(message_type))
}

/// Lower-kebab-case conversion used for endpoint and topic names.
///
/// Word boundaries are upper-case letters preceded by a lower-case letter or
/// digit, the last letter of an acronym run, and explicit `_`/space/`-`
/// separators.
pub fn kebab_case(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len() + 4);

    for (i, &c) in chars.iter().enumerate() {
        if c == '_' || c == ' ' || c == '-' {
            if !out.is_empty() && !out.ends_with('-') {
                out.push('-');
            }
            continue;
        }

        if c.is_ascii_uppercase() {
            let after_lower_or_digit =
                i > 0 && (chars[i - 1].is_ascii_lowercase() || chars[i - 1].is_ascii_digit());
            let acronym_end = i > 0
                && chars[i - 1].is_ascii_uppercase()
                && chars.get(i + 1).is_some_and(|next| next.is_ascii_lowercase());
            if (after_lower_or_digit || acronym_end) && !out.is_empty() && !out.ends_with('-') {
                out.push('-');
            }
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pascal_case_message_type() {
        assert_eq!(kebab_case("ItemCreated"), "item-created");
    }

    #[test]
    fn already_lower_case_is_unchanged() {
        assert_eq!(kebab_case("catalog"), "catalog");
    }

    #[test]
    fn acronym_runs_split_before_the_next_word() {
        assert_eq!(kebab_case("HTTPServerStarted"), "http-server-started");
    }

    #[test]
    fn underscores_and_spaces_become_dashes() {
        assert_eq!(kebab_case("order_submitted"), "order-submitted");
        assert_eq!(kebab_case("Order Submitted"), "order-submitted");
    }

    #[test]
    fn digits_end_a_word() {
        assert_eq!(kebab_case("Ipv4Resolved"), "ipv4-resolved");
    }

    #[test]
    fn endpoint_names_are_deterministic_and_non_pluralized() {
        assert_eq!(endpoint_name("catalog", "ItemCreated"), "catalog-item-created");
        assert_eq!(endpoint_name("catalog", "ItemCreated"), "catalog-item-created");
        assert_eq!(endpoint_name("Inventory", "PriceAdjusted"), "inventory-price-adjusted");
    }
}
