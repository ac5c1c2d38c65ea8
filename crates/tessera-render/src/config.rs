use std::time::Duration;

use tessera_core::geometry::Size;

use crate::pool::DrawPoolType;

/// Per-pool construction settings.
#[derive(Debug, Clone, PartialEq)]
pub struct PoolSettings {
    /// Render into an offscreen framebuffer and composite it, instead of
    /// submitting calls straight to the surface.
    pub framed: bool,
    /// Force a rebuild at least this often even without a repaint request.
    pub refresh_delay: Option<Duration>,
    /// Group every call with an equal paint state, not only consecutive ones.
    pub always_group: bool,
    /// Rebuild every frame. Content is expected to be fully re-emitted.
    pub auto_update: bool,
    /// Linear filtering when compositing the framebuffer.
    pub smooth: bool,
    /// Framebuffer size at `init`.
    pub initial_size: Size<u32>,
}

impl PoolSettings {
    /// A pool drawn straight to the surface and rebuilt every frame.
    pub fn plain() -> Self {
        Self {
            framed: false,
            refresh_delay: None,
            always_group: false,
            auto_update: true,
            smooth: true,
            initial_size: Size::new(1, 1),
        }
    }

    /// A cached pool rendered through an offscreen target.
    pub fn framed(initial_size: Size<u32>) -> Self {
        Self {
            framed: true,
            auto_update: false,
            initial_size,
            ..Self::plain()
        }
    }

    pub fn with_refresh_delay(mut self, delay: Duration) -> Self {
        self.refresh_delay = Some(delay);
        self
    }

    pub fn with_always_group(mut self, always_group: bool) -> Self {
        self.always_group = always_group;
        self
    }

    pub fn with_smooth(mut self, smooth: bool) -> Self {
        self.smooth = smooth;
        self
    }

    pub fn with_auto_update(mut self, auto_update: bool) -> Self {
        self.auto_update = auto_update;
        self
    }
}

/// Settings for every pool the manager owns.
#[derive(Debug, Clone, PartialEq)]
pub struct PoolConfig {
    pools: [PoolSettings; DrawPoolType::COUNT],
}

impl PoolConfig {
    /// Default refresh delay of the foreground pool.
    pub const FOREGROUND_REFRESH: Duration = Duration::from_millis(50);

    /// Default framebuffer size for framed pools before the first resize.
    pub const DEFAULT_TARGET_SIZE: Size<u32> = Size {
        width: 1024,
        height: 768,
    };

    pub fn get(&self, pool: DrawPoolType) -> &PoolSettings {
        &self.pools[pool.index()]
    }

    pub fn get_mut(&mut self, pool: DrawPoolType) -> &mut PoolSettings {
        &mut self.pools[pool.index()]
    }

    /// Replace the settings of one pool.
    pub fn with(mut self, pool: DrawPoolType, settings: PoolSettings) -> Self {
        self.pools[pool.index()] = settings;
        self
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        let framed = PoolSettings::framed(Self::DEFAULT_TARGET_SIZE);
        Self {
            pools: [
                // Map
                framed.clone(),
                // CreatureInformation
                PoolSettings::plain(),
                // Light
                framed.clone(),
                // Text
                PoolSettings::plain(),
                // Foreground
                framed.with_refresh_delay(Self::FOREGROUND_REFRESH),
            ],
        }
    }
}
