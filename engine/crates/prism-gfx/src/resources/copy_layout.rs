//! 纹理上传使用的拷贝布局
//!
//! 每个 mip level 的行字节数、按后端对齐后的行跨度，以及累计的对齐后总大小。
//! 任何纹理上传路径都必须严格按照这里的结果组织 staging 数据。

use crate::basic::format::GfxFormat;

/// 后端的拷贝对齐常量，不允许调用者自定义
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GfxCopyAlignment {
    /// 每一行的起始地址对齐
    pub row_pitch: u64,
    /// 每个 subresource（mip / layer）的起始地址对齐
    pub placement: u64,
}

impl GfxCopyAlignment {
    /// D3D12_TEXTURE_DATA_PITCH_ALIGNMENT / D3D12_TEXTURE_DATA_PLACEMENT_ALIGNMENT
    pub const D3D12: Self = Self {
        row_pitch: 256,
        placement: 512,
    };
    pub const VULKAN: Self = Self {
        row_pitch: 4,
        placement: 16,
    };
}

#[inline]
pub const fn align_up(value: u64, alignment: u64) -> u64 {
    if alignment <= 1 {
        value
    } else {
        value.div_ceil(alignment) * alignment
    }
}

/// 完整 mip chain 的层数：`floor(log2(max(w, h))) + 1`
#[inline]
pub fn full_mip_count(width: u32, height: u32) -> u32 {
    let largest = width.max(height).max(1);
    u32::BITS - largest.leading_zeros()
}

/// 第 `level` 层 mip 的边长，每层减半并向下取整，最小为 1
#[inline]
pub fn mip_dimension(base: u32, level: u32) -> u32 {
    base.checked_shr(level).unwrap_or(0).max(1)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GfxMipCopyInfo {
    pub level: u32,
    pub width: u32,
    pub height: u32,
    /// 紧密排列时一行的字节数
    pub row_bytes: u64,
    /// 按后端对齐后的行跨度
    pub row_pitch: u64,
    /// 该 mip 在 staging buffer 中的起始偏移
    pub offset: u64,
    /// 对齐后该 mip 占用的字节数
    pub aligned_size: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GfxTextureCopyLayout {
    mips: Vec<GfxMipCopyInfo>,
    total_size: u64,
}

// new & init
impl GfxTextureCopyLayout {
    pub fn new(format: GfxFormat, width: u32, height: u32, mip_levels: u32, alignment: GfxCopyAlignment) -> Self {
        assert!(mip_levels >= 1, "texture must have at least one mip level");

        let bytes_per_pixel = format.bytes_per_pixel() as u64;
        let mut mips = Vec::with_capacity(mip_levels as usize);
        let mut offset = 0;
        for level in 0..mip_levels {
            let mip_width = mip_dimension(width, level);
            let mip_height = mip_dimension(height, level);
            let row_bytes = mip_width as u64 * bytes_per_pixel;
            let row_pitch = align_up(row_bytes, alignment.row_pitch);
            let aligned_size = align_up(row_pitch * mip_height as u64, alignment.placement);

            mips.push(GfxMipCopyInfo {
                level,
                width: mip_width,
                height: mip_height,
                row_bytes,
                row_pitch,
                offset,
                aligned_size,
            });
            offset += aligned_size;
        }

        Self {
            mips,
            total_size: offset,
        }
    }
}
// getters
impl GfxTextureCopyLayout {
    #[inline]
    pub fn mips(&self) -> &[GfxMipCopyInfo] {
        &self.mips
    }
    #[inline]
    pub fn mip_count(&self) -> u32 {
        self.mips.len() as u32
    }
    /// staging buffer 需要的总字节数
    #[inline]
    pub fn total_size(&self) -> u64 {
        self.total_size
    }
}
// tools
impl GfxTextureCopyLayout {
    /// 把紧密排列的 mip 数据按行跨度写入 staging 内存
    ///
    /// `src` 的长度必须是 `row_bytes * height`，`dst` 是整个 staging buffer。
    pub fn write_mip(&self, level: u32, src: &[u8], dst: &mut [u8]) {
        let mip = &self.mips[level as usize];
        let row_bytes = mip.row_bytes as usize;
        assert_eq!(
            src.len(),
            row_bytes * mip.height as usize,
            "mip {} expects {} bytes of tightly packed data",
            level,
            row_bytes * mip.height as usize
        );
        assert!(dst.len() as u64 >= self.total_size, "staging memory is smaller than the copy layout");

        for (row, src_row) in src.chunks_exact(row_bytes).enumerate() {
            let begin = (mip.offset + mip.row_pitch * row as u64) as usize;
            dst[begin..begin + row_bytes].copy_from_slice(src_row);
        }
    }
}
