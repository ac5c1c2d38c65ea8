//! Profiling utilities based on the `puffin` crate.
//!
//! With the `profiling` feature disabled, [`profile_function!`] and
//! [`profile_scope!`] expand to nothing so call sites never need `cfg`.

#[cfg(feature = "profiling")]
pub use puffin::{GlobalProfiler, profile_function, profile_scope};

#[cfg(feature = "profiling")]
mod enabled {
    use std::sync::OnceLock;

    /// Profiling backend options.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum ProfilingBackend {
        /// Send profiling data to puffin_viewer via HTTP.
        PuffinHttp,
    }

    /// Global profiling server instance.
    static PROFILING_SERVER: OnceLock<puffin_http::Server> = OnceLock::new();

    /// Initialize profiling with the specified backend.
    ///
    /// # Example
    /// ```no_run
    /// use tessera_core::profiling::{init_profiling, ProfilingBackend};
    ///
    /// init_profiling(ProfilingBackend::PuffinHttp);
    /// ```
    pub fn init_profiling(backend: ProfilingBackend) {
        match backend {
            ProfilingBackend::PuffinHttp => {
                puffin::set_scopes_on(true);

                match puffin_http::Server::new("0.0.0.0:8585") {
                    Ok(server) => {
                        tracing::info!("Puffin profiler server started on http://0.0.0.0:8585");
                        if PROFILING_SERVER.set(server).is_err() {
                            tracing::warn!("Puffin profiler server was already running");
                        }
                    }
                    Err(e) => {
                        tracing::error!("Failed to start puffin server: {}", e);
                    }
                }
            }
        }
    }

    /// Mark the start of a new frame for profiling.
    ///
    /// `PoolManager::begin_frame` calls this once per frame.
    #[inline]
    pub fn new_frame() {
        puffin::GlobalProfiler::lock().new_frame();
    }
}

#[cfg(feature = "profiling")]
pub use enabled::*;

#[cfg(not(feature = "profiling"))]
mod disabled {
    #[doc(hidden)]
    #[macro_export]
    macro_rules! __tessera_noop_profile_function {
        () => {};
        ($data:expr) => {};
    }

    #[doc(hidden)]
    #[macro_export]
    macro_rules! __tessera_noop_profile_scope {
        ($name:expr) => {};
        ($name:expr, $data:expr) => {};
    }

    /// No-op frame marker.
    #[inline]
    pub fn new_frame() {}
}

#[cfg(not(feature = "profiling"))]
pub use crate::__tessera_noop_profile_function as profile_function;
#[cfg(not(feature = "profiling"))]
pub use crate::__tessera_noop_profile_scope as profile_scope;
#[cfg(not(feature = "profiling"))]
pub use disabled::new_frame;
