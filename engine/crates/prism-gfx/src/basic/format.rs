/// 后端无关的像素 / 元素格式
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum GfxFormat {
    #[default]
    Unknown,
    R8Unorm,
    Rg8Unorm,
    Rgba8Unorm,
    Rgba8Srgb,
    Bgra8Unorm,
    Bgra8Srgb,
    R16Float,
    Rgba16Float,
    R32Float,
    Rg32Float,
    Rgba32Float,
    R32Uint,
    R16Uint,
    D32Float,
    D24UnormS8Uint,
}

impl GfxFormat {
    /// 每个像素（或元素）占用的字节数，`Unknown` 表示无类型的字节流
    pub const fn bytes_per_pixel(&self) -> u32 {
        match self {
            GfxFormat::Unknown => 1,
            GfxFormat::R8Unorm => 1,
            GfxFormat::Rg8Unorm | GfxFormat::R16Float | GfxFormat::R16Uint => 2,
            GfxFormat::Rgba8Unorm
            | GfxFormat::Rgba8Srgb
            | GfxFormat::Bgra8Unorm
            | GfxFormat::Bgra8Srgb
            | GfxFormat::R32Float
            | GfxFormat::R32Uint
            | GfxFormat::D32Float
            | GfxFormat::D24UnormS8Uint => 4,
            GfxFormat::Rgba16Float | GfxFormat::Rg32Float => 8,
            GfxFormat::Rgba32Float => 16,
        }
    }

    #[inline]
    pub const fn is_depth(&self) -> bool {
        matches!(self, GfxFormat::D32Float | GfxFormat::D24UnormS8Uint)
    }

    #[inline]
    pub const fn has_stencil(&self) -> bool {
        matches!(self, GfxFormat::D24UnormS8Uint)
    }
}
