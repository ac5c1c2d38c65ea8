//! Composition modes and blend equations carried by paint state.

/// How a draw call's output is combined with what is already in the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CompositionMode {
    /// Standard alpha blending.
    ///
    /// Formula: `src.rgb * src.a + dst.rgb * (1 - src.a)`
    #[default]
    Normal,

    /// Darken the destination by the source color.
    ///
    /// Use for: shadows, color tinting.
    Multiply,

    /// Brighten the destination.
    ///
    /// Use for: glow effects, missiles.
    Add,

    /// No blending - source completely replaces destination.
    Replace,

    /// Draw behind what is already in the target.
    DestBlending,

    /// Multiply the destination by the source color only.
    ///
    /// Use for: compositing the light map over the scene.
    Light,
}

/// The operation applied between the weighted source and destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BlendEquation {
    #[default]
    Add,
    Max,
    Min,
    Subtract,
    ReverseSubtract,
}

impl BlendEquation {
    pub fn to_blend_operation(self) -> wgpu::BlendOperation {
        match self {
            BlendEquation::Add => wgpu::BlendOperation::Add,
            BlendEquation::Max => wgpu::BlendOperation::Max,
            BlendEquation::Min => wgpu::BlendOperation::Min,
            BlendEquation::Subtract => wgpu::BlendOperation::Subtract,
            BlendEquation::ReverseSubtract => wgpu::BlendOperation::ReverseSubtract,
        }
    }

    /// `Min` and `Max` ignore the blend factors; wgpu requires them to be `One`.
    fn ignores_factors(self) -> bool {
        matches!(self, BlendEquation::Max | BlendEquation::Min)
    }
}

impl CompositionMode {
    fn factors(self) -> (wgpu::BlendFactor, wgpu::BlendFactor) {
        use wgpu::BlendFactor as F;
        match self {
            CompositionMode::Normal => (F::SrcAlpha, F::OneMinusSrcAlpha),
            CompositionMode::Multiply => (F::Dst, F::OneMinusSrcAlpha),
            CompositionMode::Add => (F::OneMinusSrc, F::OneMinusSrc),
            CompositionMode::Replace => (F::One, F::Zero),
            CompositionMode::DestBlending => (F::OneMinusDstAlpha, F::DstAlpha),
            CompositionMode::Light => (F::Zero, F::Src),
        }
    }

    /// Convert to a wgpu `BlendState` using `equation` for both components.
    pub fn to_blend_state(self, equation: BlendEquation) -> wgpu::BlendState {
        let operation = equation.to_blend_operation();
        if equation.ignores_factors() {
            let component = wgpu::BlendComponent {
                src_factor: wgpu::BlendFactor::One,
                dst_factor: wgpu::BlendFactor::One,
                operation,
            };
            return wgpu::BlendState {
                color: component,
                alpha: component,
            };
        }

        let (src_factor, dst_factor) = self.factors();
        let alpha = match self {
            // Keep destination alpha accumulating like the color channels would
            // under premultiplied blending.
            CompositionMode::Normal => wgpu::BlendComponent {
                src_factor: wgpu::BlendFactor::One,
                dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
                operation,
            },
            _ => wgpu::BlendComponent {
                src_factor,
                dst_factor,
                operation,
            },
        };

        wgpu::BlendState {
            color: wgpu::BlendComponent {
                src_factor,
                dst_factor,
                operation,
            },
            alpha,
        }
    }

    /// Create a color target state with this composition mode.
    pub fn to_color_target_state(
        self,
        equation: BlendEquation,
        format: wgpu::TextureFormat,
    ) -> wgpu::ColorTargetState {
        wgpu::ColorTargetState {
            format,
            blend: Some(self.to_blend_state(equation)),
            write_mask: wgpu::ColorWrites::ALL,
        }
    }
}
