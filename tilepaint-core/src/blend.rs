#[derive(
    strum::AsRefStr,
    PartialEq,
    Eq,
    strum::EnumIter,
    Copy,
    Clone,
    Hash,
    Debug,
    Default,
    serde::Serialize,
    serde::Deserialize,
)]
#[repr(u8)]
pub enum BlendMode {
    #[default]
    Normal,
    Add,
    Multiply,
    Screen,
    Overlay,
    Darken,
    Lighten,
}
impl BlendMode {
    /// Blend a single premultiplied source pixel over a premultiplied destination.
    ///
    /// Separable modes follow the W3C compositing formula:
    /// `co = cs*(1-ab) + cb*(1-as) + as*ab*B(cb/ab, cs/as)`, `ao = as + ab*(1-as)`.
    #[must_use]
    pub fn apply(self, src: [f32; 4], dst: [f32; 4]) -> [f32; 4] {
        let [.., sa] = src;
        let [.., da] = dst;
        if sa <= 0.0 {
            return dst;
        }
        if self == Self::Add {
            // Additive is the one mode that isn't bounded by source-over alpha.
            return [
                (src[0] + dst[0]).min(1.0),
                (src[1] + dst[1]).min(1.0),
                (src[2] + dst[2]).min(1.0),
                (sa + da).min(1.0),
            ];
        }
        let out_a = sa + da * (1.0 - sa);
        let mut out = [0.0; 4];
        for c in 0..3 {
            let cs = src[c];
            let cb = dst[c];
            let mixed = if da <= 0.0 {
                0.0
            } else {
                sa * da * self.separable(cb / da, cs / sa)
            };
            out[c] = cs * (1.0 - da) + cb * (1.0 - sa) + mixed;
        }
        out[3] = out_a;
        out
    }
    /// The separable blend function B(cb, cs) over straight colors.
    fn separable(self, cb: f32, cs: f32) -> f32 {
        match self {
            Self::Normal | Self::Add => cs,
            Self::Multiply => cb * cs,
            Self::Screen => cb + cs - cb * cs,
            Self::Overlay => {
                if cb <= 0.5 {
                    2.0 * cb * cs
                } else {
                    // Screen against the doubled backdrop.
                    let cb = 2.0 * cb - 1.0;
                    cb + cs - cb * cs
                }
            }
            Self::Darken => cb.min(cs),
            Self::Lighten => cb.max(cs),
        }
    }
}

/// Blend mode for a member, including a mode, opacity modulate, and alpha clip
#[derive(Copy, Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Blend {
    pub mode: BlendMode,
    pub opacity: f32,
    /// If alpha clip enabled, the member only draws where the member below it has alpha.
    pub alpha_clip: bool,
}
impl Default for Blend {
    fn default() -> Self {
        Self {
            mode: BlendMode::default(),
            opacity: 1.0,
            alpha_clip: false,
        }
    }
}
