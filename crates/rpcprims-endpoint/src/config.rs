/// What the registry does when an endpoint name is registered twice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DuplicatePolicy {
    /// Refuse the second registration with `EndpointError::DuplicateEndpoint`.
    #[default]
    Reject,
    /// Last registration wins. The replacement is logged and the previous
    /// endpoint is handed back to the caller.
    Replace,
}

/// Controls endpoint registry behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RegistryConfig {
    pub duplicate_policy: DuplicatePolicy,
}
