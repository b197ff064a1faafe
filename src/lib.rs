//! civic-connect: account and credential management for a civic engagement
//! portal, persisted as namespaced JSON slots in a key/value snapshot store,
//! plus the portal collections (issues, updates, crowdfunding) built on it.

pub mod error;
pub mod config;
pub mod storage;
pub mod identity;
pub mod portal;
pub mod cli;

// Test-only printing helper: expands to eprintln! during tests and is absent otherwise.
// Usage in tests: tprintln!("debug: {}", value);
#[cfg(any(test, debug_assertions))]
#[macro_export]
macro_rules! tprintln {
    ($($arg:tt)*) => ( eprintln!($($arg)*) );
}

// In non-test builds, provide a no-op tprintln! so calls compile without effect.
#[cfg(not(any(test, debug_assertions)))]
#[macro_export]
macro_rules! tprintln {
    ($($arg:tt)*) => ({
        // Preserve formatting checks in release without producing code
        if false { let _ = format!($($arg)*); }
    });
}
