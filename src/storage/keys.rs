//! Namespaced slot key builders.
//! Keep this module focused and small; complex logic belongs in higher layers.

/// Build keys for one portal namespace, e.g. `civic_connect_users`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Keys {
    namespace: String,
}

impl Keys {
    pub fn new(namespace: impl Into<String>) -> Self { Self { namespace: namespace.into() } }

    pub fn namespace(&self) -> &str { &self.namespace }

    #[inline]
    fn slot(&self, name: &str) -> String { format!("{}_{}", self.namespace, name) }

    // Credential store slots ------------------------------------------------
    pub fn users(&self) -> String { self.slot("users") }
    pub fn credentials(&self) -> String { self.slot("credentials") }
    /// Session slot: the single authenticated account.
    pub fn session(&self) -> String { self.slot("user") }
    pub fn seq(&self) -> String { self.slot("seq") }

    // Portal collections ----------------------------------------------------
    pub fn issues(&self) -> String { self.slot("issues") }
    pub fn updates(&self) -> String { self.slot("updates") }
    pub fn crowdfunds(&self) -> String { self.slot("crowdfunds") }
}

impl Default for Keys {
    fn default() -> Self { Self::new("civic_connect") }
}
