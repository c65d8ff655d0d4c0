/// Separator between a command name and its reply-correlation suffix
pub const RESPONSE_INFIX: &str = "_RESPONSE_";

/// Derive the reply channel for a correlated request.
///
/// Request ids are unique for the life of the issuing process, so the
/// derived name is unique among live calls.
pub fn response_channel(command: &str, request_id: u64) -> String {
    format!("{}{}{}", command, RESPONSE_INFIX, request_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_channel_format() {
        assert_eq!(response_channel("ping", 1), "ping_RESPONSE_1");
        assert_eq!(response_channel("load-url", 4097), "load-url_RESPONSE_4097");
    }

    #[test]
    fn test_distinct_ids_derive_distinct_channels() {
        assert_ne!(response_channel("cmd", 1), response_channel("cmd", 2));
    }
}
