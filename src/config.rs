// Application configuration.
// Logging can only be toggled in development builds.

#[cfg(debug_assertions)]
pub const LOGGING_ENABLED: bool = true; // debug builds log by default

#[cfg(not(debug_assertions))]
pub const LOGGING_ENABLED: bool = false; // release builds stay quiet

// Extra switches for development builds
#[cfg(debug_assertions)]
pub mod dev {
    // Flip to false to silence logging while developing.
    // Only honored in debug builds.
    pub const ENABLE_LOGGING: bool = true;
}

#[cfg(not(debug_assertions))]
pub mod dev {
    // Locked down in release builds.
    pub const ENABLE_LOGGING: bool = false;
}
