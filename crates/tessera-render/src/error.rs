use std::fmt;

use crate::pool::DrawPoolType;
use crate::raster::RasterError;

/// Errors raised by draw pools and the pool manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    /// A framed pool could not allocate its offscreen target. The pool is
    /// disabled; the other pools keep drawing.
    FramebufferAllocation {
        pool: DrawPoolType,
        source: RasterError,
    },

    /// An emission was made with no pool selected.
    NoActivePool,

    /// A pool id outside the known pool types.
    UnknownPoolType(u8),

    /// The pool has no offscreen target (plain pool, or allocation failed).
    NoFramebuffer(DrawPoolType),

    /// Any other rasterizer failure.
    Raster(RasterError),
}

impl fmt::Display for PoolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PoolError::FramebufferAllocation { pool, source } => {
                write!(f, "Failed to allocate framebuffer for pool '{}': {}", pool, source)
            }
            PoolError::NoActivePool => write!(f, "No draw pool is selected"),
            PoolError::UnknownPoolType(id) => write!(f, "Unknown draw pool type id {}", id),
            PoolError::NoFramebuffer(pool) => {
                write!(f, "Draw pool '{}' has no framebuffer", pool)
            }
            PoolError::Raster(err) => write!(f, "Rasterizer error: {}", err),
        }
    }
}

impl std::error::Error for PoolError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PoolError::FramebufferAllocation { source, .. } => Some(source),
            PoolError::Raster(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RasterError> for PoolError {
    fn from(err: RasterError) -> Self {
        PoolError::Raster(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;
    use tessera_core::geometry::Size;

    #[test]
    fn test_allocation_error_exposes_source() {
        let err = PoolError::FramebufferAllocation {
            pool: DrawPoolType::Map,
            source: RasterError::OutOfMemory {
                requested: Size::new(8, 8),
            },
        };
        assert!(err.source().is_some());
        assert!(err.to_string().starts_with("Failed to allocate framebuffer for pool 'map'"));
    }

    #[test]
    fn test_no_active_pool_display() {
        assert_eq!(PoolError::NoActivePool.to_string(), "No draw pool is selected");
    }
}
